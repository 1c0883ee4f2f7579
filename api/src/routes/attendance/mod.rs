pub mod get;
pub mod post;

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use chrono::SecondsFormat;
use serde::Serialize;

use db::models::attendance_session::Model as Session;
use services::AttendanceError;

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/check-in", post(post::check_in))
        .route("/check-out", post(post::check_out))
        .route("/status", get(get::status))
        .route("/history", get(get::history))
}

/// Transport-facing view of a session row. Timestamps are RFC 3339 strings;
/// the chat glue formats them into the user's locale.
#[derive(Debug, Serialize, Default)]
pub struct SessionResponse {
    pub id: i64,
    pub user_id: i64,
    pub date: String,
    pub check_in_at: String,
    pub check_in_lat: f64,
    pub check_in_lon: f64,
    pub check_out_at: Option<String>,
    pub check_out_lat: Option<f64>,
    pub check_out_lon: Option<f64>,
    pub status: String,
    pub arrival: String,
    pub late_minutes: i32,
    pub total_hours: Option<f64>,
}

impl From<Session> for SessionResponse {
    fn from(s: Session) -> Self {
        Self {
            id: s.id,
            user_id: s.user_id,
            date: s.date.to_string(),
            check_in_at: s.check_in_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            check_in_lat: s.check_in_lat,
            check_in_lon: s.check_in_lon,
            check_out_at: s
                .check_out_at
                .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true)),
            check_out_lat: s.check_out_lat,
            check_out_lon: s.check_out_lon,
            status: s.status.to_string(),
            arrival: s.arrival.to_string(),
            late_minutes: s.late_minutes,
            total_hours: s.total_hours,
        }
    }
}

/// Accepted transition plus the measured distance for the confirmation
/// message.
#[derive(Debug, Serialize, Default)]
pub struct TransitionResponse {
    #[serde(flatten)]
    pub session: SessionResponse,
    pub distance_meters: f64,
}

/// Validation failures are 422, state conflicts 409, storage faults 503.
pub(crate) fn error_status(err: &AttendanceError) -> StatusCode {
    match err {
        AttendanceError::OutsideWindow
        | AttendanceError::OutOfRange { .. }
        | AttendanceError::InvalidCoordinates { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        AttendanceError::AlreadyOpen
        | AttendanceError::AlreadyClosed
        | AttendanceError::NoOpenSession => StatusCode::CONFLICT,
        AttendanceError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
