//! Shared per-process state: the database handle, the attendance manager and
//! the instance coordinator, built once at startup from the loaded config.

use std::collections::HashSet;
use std::sync::Arc;

use chrono_tz::Tz;
use common::AppConfig;
use sea_orm::DatabaseConnection;
use services::{AttendanceManager, AttendanceSettings, GeofenceError, InstanceCoordinator};

#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    manager: Arc<AttendanceManager>,
    coordinator: Arc<InstanceCoordinator>,
    admin_ids: Arc<HashSet<i64>>,
    default_language: Arc<str>,
}

impl AppState {
    /// Assembles the state from an already-connected database and explicit
    /// settings. This is the constructor tests use.
    pub fn from_parts(
        db: DatabaseConnection,
        settings: AttendanceSettings,
        admin_ids: impl IntoIterator<Item = i64>,
        default_language: &str,
    ) -> Result<Self, GeofenceError> {
        let manager = Arc::new(AttendanceManager::new(db.clone(), settings)?);
        let coordinator = Arc::new(InstanceCoordinator::new(db.clone()));
        Ok(Self {
            db,
            manager,
            coordinator,
            admin_ids: Arc::new(admin_ids.into_iter().collect()),
            default_language: Arc::from(default_language),
        })
    }

    /// Assembles the state from the process configuration.
    ///
    /// # Panics
    /// Panics on malformed configuration (unknown time zone, invalid school
    /// coordinates); these are unrecoverable at startup.
    pub fn from_config(db: DatabaseConnection, config: &AppConfig) -> Self {
        let timezone: Tz = config
            .timezone
            .parse()
            .unwrap_or_else(|_| panic!("TIMEZONE '{}' is not a known IANA zone", config.timezone));

        let settings = AttendanceSettings {
            school_latitude: config.school_latitude,
            school_longitude: config.school_longitude,
            radius_meters: config.radius_meters,
            timezone,
            work_days: config.work_days.clone(),
            work_start: config.work_start,
            work_end: config.work_end,
            grace_period_minutes: config.grace_period_minutes,
        };

        Self::from_parts(
            db,
            settings,
            config.admin_user_ids.iter().copied(),
            &config.default_language,
        )
        .expect("SCHOOL_LATITUDE/SCHOOL_LONGITUDE are not valid coordinates")
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn manager(&self) -> &AttendanceManager {
        &self.manager
    }

    pub fn coordinator(&self) -> &InstanceCoordinator {
        &self.coordinator
    }

    /// Shared handle for the shutdown path, which outlives the router.
    pub fn coordinator_handle(&self) -> Arc<InstanceCoordinator> {
        Arc::clone(&self.coordinator)
    }

    /// Transport-layer authorization: whether this user id may call the
    /// reporting endpoints. The core never sees this decision.
    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_ids.contains(&user_id)
    }

    pub fn default_language(&self) -> &str {
        &self.default_language
    }
}
