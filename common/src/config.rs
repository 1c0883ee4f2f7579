//! Global application configuration manager.
//!
//! `AppConfig` is a lazily initialized, globally accessible singleton containing
//! runtime configuration values loaded from environment variables. Core components
//! never read it ambiently: the binary snapshots it once at startup and passes the
//! values into constructors.

use chrono::NaiveTime;
use std::env;
use std::sync::{OnceLock, RwLock};

/// Represents the complete application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: String,
    pub project_name: String,
    pub log_level: String,
    pub log_file: String,
    pub log_to_stdout: bool,
    pub database_path: String,
    pub host: String,
    pub port: u16,
    /// Latitude of the school reference point.
    pub school_latitude: f64,
    /// Longitude of the school reference point.
    pub school_longitude: f64,
    /// Geofence radius around the school, in meters.
    pub radius_meters: f64,
    /// IANA time zone the school operates in. Day boundaries and the
    /// weekday gate are computed in this zone, never in the host's.
    pub timezone: String,
    /// Working days, 1 = Monday .. 7 = Sunday.
    pub work_days: Vec<u8>,
    pub work_start: NaiveTime,
    pub work_end: NaiveTime,
    /// Minutes past work start before a check-in counts as late.
    pub grace_period_minutes: u32,
    /// User ids allowed to use the reporting endpoints.
    pub admin_user_ids: Vec<i64>,
    /// Default language code for newly registered teachers.
    pub default_language: String,
}

/// Lazily-initialized, thread-safe singleton instance of `AppConfig`.
static CONFIG_INSTANCE: OnceLock<RwLock<AppConfig>> = OnceLock::new();

impl AppConfig {
    /// Loads the configuration from `.env` and environment variables.
    ///
    /// Panics if required variables are missing or improperly formatted;
    /// configuration errors are unrecoverable at startup.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            env: env::var("APP_ENV").unwrap_or_else(|_| "development".into()),
            project_name: env::var("PROJECT_NAME").unwrap_or_else(|_| "davomat".into()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "api=info".into()),
            log_file: env::var("LOG_FILE").unwrap_or_else(|_| "api.log".into()),
            log_to_stdout: env::var("LOG_TO_STDOUT").unwrap_or_else(|_| "false".into()) == "true",
            database_path: env::var("DATABASE_PATH").expect("DATABASE_PATH is required"),
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()
                .expect("PORT must be a number"),
            school_latitude: env::var("SCHOOL_LATITUDE")
                .unwrap_or_else(|_| "41.2995".into())
                .parse()
                .expect("SCHOOL_LATITUDE must be a number"),
            school_longitude: env::var("SCHOOL_LONGITUDE")
                .unwrap_or_else(|_| "69.2401".into())
                .parse()
                .expect("SCHOOL_LONGITUDE must be a number"),
            radius_meters: env::var("RADIUS_METERS")
                .unwrap_or_else(|_| "50".into())
                .parse()
                .expect("RADIUS_METERS must be a number"),
            timezone: env::var("TIMEZONE").unwrap_or_else(|_| "Asia/Tashkent".into()),
            work_days: parse_id_list(&env::var("WORK_DAYS").unwrap_or_else(|_| "1,2,3,4,5".into()))
                .into_iter()
                .map(|d| d as u8)
                .collect(),
            work_start: parse_work_time(
                &env::var("WORK_START_TIME").unwrap_or_else(|_| "08:00".into()),
                "WORK_START_TIME",
            ),
            work_end: parse_work_time(
                &env::var("WORK_END_TIME").unwrap_or_else(|_| "17:00".into()),
                "WORK_END_TIME",
            ),
            grace_period_minutes: env::var("GRACE_PERIOD_MINUTES")
                .unwrap_or_else(|_| "15".into())
                .parse()
                .expect("GRACE_PERIOD_MINUTES must be a number"),
            admin_user_ids: parse_id_list(&env::var("ADMIN_USER_IDS").unwrap_or_default()),
            default_language: env::var("DEFAULT_LANGUAGE").unwrap_or_else(|_| "uz".into()),
        }
    }

    /// Returns a shared reference to the global configuration.
    ///
    /// # Panics
    /// Panics if the lock cannot be acquired.
    pub fn global() -> std::sync::RwLockReadGuard<'static, AppConfig> {
        CONFIG_INSTANCE
            .get_or_init(|| RwLock::new(AppConfig::from_env()))
            .read()
            .expect("Failed to acquire AppConfig read lock")
    }

    /// Resets the configuration by reloading from environment variables.
    ///
    /// Useful in tests to clear overrides.
    pub fn reset() {
        if let Some(lock) = CONFIG_INSTANCE.get() {
            let mut guard = lock.write().unwrap();
            *guard = AppConfig::from_env();
        }
    }

    fn set_field<F>(setter: F)
    where
        F: FnOnce(&mut AppConfig),
    {
        let lock = CONFIG_INSTANCE.get_or_init(|| RwLock::new(AppConfig::from_env()));
        let mut guard = lock
            .write()
            .expect("Failed to acquire AppConfig write lock");
        setter(&mut guard);
    }

    pub fn set_database_path(path: impl Into<String>) {
        Self::set_field(|c| c.database_path = path.into());
    }

    pub fn set_radius_meters(radius: f64) {
        Self::set_field(|c| c.radius_meters = radius);
    }

    pub fn set_admin_user_ids(ids: Vec<i64>) {
        Self::set_field(|c| c.admin_user_ids = ids);
    }

    pub fn set_log_to_stdout(enabled: bool) {
        Self::set_field(|c| c.log_to_stdout = enabled);
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_user_ids.contains(&user_id)
    }
}

/// Parses a comma-separated id list, skipping empty segments.
fn parse_id_list(raw: &str) -> Vec<i64> {
    raw.split(',')
        .filter_map(|part| {
            let part = part.trim();
            if part.is_empty() {
                None
            } else {
                Some(part.parse().expect("id lists must contain integers"))
            }
        })
        .collect()
}

fn parse_work_time(raw: &str, var: &str) -> NaiveTime {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .unwrap_or_else(|_| panic!("{var} must be in HH:MM format, got '{raw}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_id_lists_with_gaps() {
        assert_eq!(parse_id_list("1, 2,,3 "), vec![1, 2, 3]);
        assert!(parse_id_list("").is_empty());
    }

    #[test]
    fn parses_work_times() {
        let t = parse_work_time("08:30", "WORK_START_TIME");
        assert_eq!(t, NaiveTime::from_hms_opt(8, 30, 0).unwrap());
    }

    #[test]
    #[should_panic(expected = "HH:MM")]
    fn rejects_malformed_work_time() {
        parse_work_time("8h30", "WORK_START_TIME");
    }
}
