use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use crate::response::ApiResponse;
use crate::state::AppState;

use super::{error_status, SessionResponse};

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub user_id: i64,
    /// Evaluation instant; defaults to the server clock at the boundary.
    pub at: Option<DateTime<Utc>>,
}

/// GET /api/attendance/status
///
/// Today's committed session for the user, or `null` when the day has not
/// started. Always served from storage so both live instances agree.
pub async fn status(
    State(state): State<AppState>,
    Query(q): Query<StatusQuery>,
) -> (StatusCode, Json<ApiResponse<Option<SessionResponse>>>) {
    let now = q.at.unwrap_or_else(Utc::now);
    match state.manager().today_status(q.user_id, now).await {
        Ok(session) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                session.map(SessionResponse::from),
                "Status fetched",
            )),
        ),
        Err(err) => (
            error_status(&err),
            Json(ApiResponse::error_with_code(err.code(), err.to_string())),
        ),
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub user_id: i64,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: Option<u64>,
}

/// GET /api/attendance/history
///
/// With `from`/`to`: that range, ascending by date. Otherwise the most
/// recent sessions (default 7, the transport's history view), newest first.
pub async fn history(
    State(state): State<AppState>,
    Query(q): Query<HistoryQuery>,
) -> (StatusCode, Json<ApiResponse<Vec<SessionResponse>>>) {
    let result = match (q.from, q.to) {
        (Some(from), Some(to)) => state.manager().history(q.user_id, from, to).await,
        _ => {
            state
                .manager()
                .recent_history(q.user_id, q.limit.unwrap_or(7).clamp(1, 100))
                .await
        }
    };

    match result {
        Ok(sessions) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                sessions.into_iter().map(SessionResponse::from).collect(),
                "History fetched",
            )),
        ),
        Err(err) => (
            error_status(&err),
            Json(ApiResponse::error_with_code(err.code(), err.to_string())),
        ),
    }
}
