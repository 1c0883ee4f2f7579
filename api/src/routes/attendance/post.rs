use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::error;

use crate::response::ApiResponse;
use crate::state::AppState;

use super::{error_status, TransitionResponse};

/// One geolocated attendance event as delivered by the chat transport.
/// `timestamp` is the event time from the transport; when absent the server
/// clock is captured here, at the boundary, never deeper in.
#[derive(Debug, Deserialize)]
pub struct AttendanceEventReq {
    pub user_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: Option<DateTime<Utc>>,
}

/// POST /api/attendance/check-in
pub async fn check_in(
    State(state): State<AppState>,
    Json(body): Json<AttendanceEventReq>,
) -> (StatusCode, Json<ApiResponse<TransitionResponse>>) {
    let now = body.timestamp.unwrap_or_else(Utc::now);

    match state
        .manager()
        .check_in(body.user_id, body.latitude, body.longitude, now)
        .await
    {
        Ok(receipt) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(
                TransitionResponse {
                    session: receipt.session.into(),
                    distance_meters: receipt.distance_meters,
                },
                "Check-in recorded",
            )),
        ),
        Err(err) => {
            if err.is_fault() {
                error!(user_id = body.user_id, error = %err, "check-in failed on storage");
            }
            (
                error_status(&err),
                Json(ApiResponse::error_with_code(err.code(), err.to_string())),
            )
        }
    }
}

/// POST /api/attendance/check-out
pub async fn check_out(
    State(state): State<AppState>,
    Json(body): Json<AttendanceEventReq>,
) -> (StatusCode, Json<ApiResponse<TransitionResponse>>) {
    let now = body.timestamp.unwrap_or_else(Utc::now);

    match state
        .manager()
        .check_out(body.user_id, body.latitude, body.longitude, now)
        .await
    {
        Ok(receipt) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                TransitionResponse {
                    session: receipt.session.into(),
                    distance_meters: receipt.distance_meters,
                },
                "Check-out recorded",
            )),
        ),
        Err(err) => {
            if err.is_fault() {
                error!(user_id = body.user_id, error = %err, "check-out failed on storage");
            }
            (
                error_status(&err),
                Json(ApiResponse::error_with_code(err.code(), err.to_string())),
            )
        }
    }
}
