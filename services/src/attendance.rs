//! The attendance state machine: admission checks followed by a storage
//! transition. This is the only mutation path for session rows.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use sea_orm::{DatabaseConnection, DbErr};
use thiserror::Error;
use tracing::info;

use db::models::attendance_session::{Model as Session, SessionStoreError};
use db::models::teacher::Model as Teacher;

use crate::calendar::CalendarGate;
use crate::geofence::{Geofence, GeofenceError};
use crate::schedule::WorkSchedule;

/// Everything the manager needs, resolved once at startup and passed in
/// explicitly. No component below this point reads ambient configuration.
#[derive(Debug, Clone)]
pub struct AttendanceSettings {
    pub school_latitude: f64,
    pub school_longitude: f64,
    pub radius_meters: f64,
    pub timezone: Tz,
    /// Working days, 1 = Monday .. 7 = Sunday.
    pub work_days: Vec<u8>,
    pub work_start: chrono::NaiveTime,
    pub work_end: chrono::NaiveTime,
    pub grace_period_minutes: u32,
}

/// User-facing outcome taxonomy for check-in/check-out requests.
///
/// Validation errors and state conflicts are expected outcomes the transport
/// renders as guidance; only `Storage` is a fault of the system itself.
#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("attendance is only recorded on working days")]
    OutsideWindow,
    #[error("{distance_meters:.1} m from school, outside the {radius_meters:.0} m radius")]
    OutOfRange {
        distance_meters: f64,
        radius_meters: f64,
    },
    #[error("invalid coordinates ({latitude}, {longitude})")]
    InvalidCoordinates { latitude: f64, longitude: f64 },
    #[error("already checked in today")]
    AlreadyOpen,
    #[error("today's session is already closed")]
    AlreadyClosed,
    #[error("no open session to check out of; check in first")]
    NoOpenSession,
    #[error("storage unavailable")]
    Storage(#[source] DbErr),
}

impl AttendanceError {
    /// Stable machine code the transport keys translated messages on.
    pub fn code(&self) -> &'static str {
        match self {
            Self::OutsideWindow => "outside_window",
            Self::OutOfRange { .. } => "out_of_range",
            Self::InvalidCoordinates { .. } => "invalid_coordinates",
            Self::AlreadyOpen => "already_open",
            Self::AlreadyClosed => "already_closed",
            Self::NoOpenSession => "no_open_session",
            Self::Storage(_) => "storage_unavailable",
        }
    }

    /// Conflicts and validation failures are the state machine speaking;
    /// storage faults are the only errors worth alerting on.
    pub fn is_fault(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

impl From<GeofenceError> for AttendanceError {
    fn from(err: GeofenceError) -> Self {
        let GeofenceError::InvalidCoordinates {
            latitude,
            longitude,
        } = err;
        Self::InvalidCoordinates {
            latitude,
            longitude,
        }
    }
}

impl From<SessionStoreError> for AttendanceError {
    fn from(err: SessionStoreError) -> Self {
        match err {
            SessionStoreError::AlreadyOpen => Self::AlreadyOpen,
            SessionStoreError::AlreadyClosed => Self::AlreadyClosed,
            SessionStoreError::NoOpenSession => Self::NoOpenSession,
            SessionStoreError::Db(e) => Self::Storage(e),
        }
    }
}

/// Accepted transition plus the measured distance, for the confirmation
/// message.
#[derive(Debug, Clone)]
pub struct TransitionReceipt {
    pub session: Session,
    pub distance_meters: f64,
}

pub struct AttendanceManager {
    db: DatabaseConnection,
    geofence: Geofence,
    gate: CalendarGate,
    schedule: WorkSchedule,
}

impl AttendanceManager {
    pub fn new(
        db: DatabaseConnection,
        settings: AttendanceSettings,
    ) -> Result<Self, GeofenceError> {
        let geofence = Geofence::new(
            settings.school_latitude,
            settings.school_longitude,
            settings.radius_meters,
        )?;
        let gate = CalendarGate::new(settings.timezone, &settings.work_days);
        let schedule = WorkSchedule::new(
            settings.work_start,
            settings.work_end,
            settings.grace_period_minutes,
        );
        Ok(Self {
            db,
            geofence,
            gate,
            schedule,
        })
    }

    /// Records a check-in: calendar gate, then geofence, then the store's
    /// open transition. Conflicts from the store pass through unchanged, so
    /// a retried request observes `AlreadyOpen` instead of succeeding twice.
    pub async fn check_in(
        &self,
        user_id: i64,
        latitude: f64,
        longitude: f64,
        now: DateTime<Utc>,
    ) -> Result<TransitionReceipt, AttendanceError> {
        if !self.gate.is_eligible(now) {
            info!(user_id, "check-in rejected: outside working days");
            return Err(AttendanceError::OutsideWindow);
        }

        let check = self.geofence.check(latitude, longitude)?;
        if !check.within {
            info!(
                user_id,
                distance_meters = check.distance_meters,
                "check-in rejected: outside geofence"
            );
            return Err(AttendanceError::OutOfRange {
                distance_meters: check.distance_meters,
                radius_meters: self.geofence.radius_meters(),
            });
        }

        let date = self.gate.local_date(now);
        let (arrival, late_minutes) = self.schedule.classify_check_in(self.gate.local_datetime(now));
        let session =
            Session::open(&self.db, user_id, date, now, latitude, longitude, arrival, late_minutes)
                .await?;
        Ok(TransitionReceipt {
            session,
            distance_meters: check.distance_meters,
        })
    }

    /// Records a check-out through the same gates, then the store's close
    /// transition. A missing check-in surfaces as `NoOpenSession`, distinct
    /// from every validation failure.
    pub async fn check_out(
        &self,
        user_id: i64,
        latitude: f64,
        longitude: f64,
        now: DateTime<Utc>,
    ) -> Result<TransitionReceipt, AttendanceError> {
        if !self.gate.is_eligible(now) {
            info!(user_id, "check-out rejected: outside working days");
            return Err(AttendanceError::OutsideWindow);
        }

        let check = self.geofence.check(latitude, longitude)?;
        if !check.within {
            info!(
                user_id,
                distance_meters = check.distance_meters,
                "check-out rejected: outside geofence"
            );
            return Err(AttendanceError::OutOfRange {
                distance_meters: check.distance_meters,
                radius_meters: self.geofence.radius_meters(),
            });
        }

        let date = self.gate.local_date(now);
        let session = Session::close(&self.db, user_id, date, now, latitude, longitude).await?;
        Ok(TransitionReceipt {
            session,
            distance_meters: check.distance_meters,
        })
    }

    /// Today's committed session for the user, if any. Always read from
    /// storage; the other live instance may have written it.
    pub async fn today_status(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, AttendanceError> {
        Session::find_for_day(&self.db, user_id, self.gate.local_date(now))
            .await
            .map_err(AttendanceError::Storage)
    }

    pub async fn recent_history(
        &self,
        user_id: i64,
        limit: u64,
    ) -> Result<Vec<Session>, AttendanceError> {
        Session::recent(&self.db, user_id, limit)
            .await
            .map_err(AttendanceError::Storage)
    }

    pub async fn history(
        &self,
        user_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Session>, AttendanceError> {
        Session::history(&self.db, user_id, from, to)
            .await
            .map_err(AttendanceError::Storage)
    }

    /// One day's sessions joined with the registry, in check-in order.
    pub async fn daily_report(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<(Session, Option<Teacher>)>, AttendanceError> {
        Session::daily_report(&self.db, date)
            .await
            .map_err(AttendanceError::Storage)
    }

    /// Committed sessions across all users for reporting.
    pub async fn export_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Session>, AttendanceError> {
        Session::export_range(&self.db, from, to)
            .await
            .map_err(AttendanceError::Storage)
    }

    /// The calendar day `now` falls on for this school.
    pub fn local_date(&self, now: DateTime<Utc>) -> NaiveDate {
        self.gate.local_date(now)
    }
}
