//! Circular geofence around the school reference point.
//!
//! Distances are geodesic on the WGS84 ellipsoid rather than a flat
//! approximation; at the latitudes schools actually sit at, equirectangular
//! error can exceed the whole radius tolerance.

use geo::{GeodesicDistance, Point};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum GeofenceError {
    #[error("invalid coordinates ({latitude}, {longitude})")]
    InvalidCoordinates { latitude: f64, longitude: f64 },
}

/// Result of a containment check: the verdict plus the measured distance,
/// which is recorded for audit and shown to the user.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeofenceCheck {
    pub within: bool,
    pub distance_meters: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct Geofence {
    center: Point<f64>,
    radius_meters: f64,
}

impl Geofence {
    pub fn new(latitude: f64, longitude: f64, radius_meters: f64) -> Result<Self, GeofenceError> {
        validate(latitude, longitude)?;
        Ok(Self {
            center: Point::new(longitude, latitude),
            radius_meters,
        })
    }

    pub fn radius_meters(&self) -> f64 {
        self.radius_meters
    }

    /// Checks whether a reported position lies inside the fence.
    ///
    /// The boundary is inclusive: a point at exactly the radius is within.
    pub fn check(&self, latitude: f64, longitude: f64) -> Result<GeofenceCheck, GeofenceError> {
        validate(latitude, longitude)?;
        let point = Point::new(longitude, latitude);
        let distance_meters = self.center.geodesic_distance(&point);
        Ok(GeofenceCheck {
            within: distance_meters <= self.radius_meters,
            distance_meters,
        })
    }
}

fn validate(latitude: f64, longitude: f64) -> Result<(), GeofenceError> {
    let ok = latitude.is_finite()
        && longitude.is_finite()
        && (-90.0..=90.0).contains(&latitude)
        && (-180.0..=180.0).contains(&longitude);
    if ok {
        Ok(())
    } else {
        Err(GeofenceError::InvalidCoordinates {
            latitude,
            longitude,
        })
    }
}
