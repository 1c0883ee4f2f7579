//! Teacher registry routes: registration upsert and language preference.
//! Identity is the chat platform's; these handlers trust the `user_id` the
//! transport delivers and take no further authorization decisions.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use db::models::teacher::Model as Teacher;

use crate::response::ApiResponse;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/{user_id}/language", put(set_language))
}

#[derive(Debug, Deserialize)]
pub struct RegisterReq {
    pub user_id: i64,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Serialize, Default)]
pub struct TeacherResponse {
    pub user_id: i64,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
    pub language: String,
    pub is_admin: bool,
    pub is_active: bool,
}

impl From<Teacher> for TeacherResponse {
    fn from(t: Teacher) -> Self {
        Self {
            user_id: t.user_id,
            username: t.username,
            first_name: t.first_name,
            last_name: t.last_name,
            language: t.language,
            is_admin: t.is_admin,
            is_active: t.is_active,
        }
    }
}

/// POST /api/teachers/register
///
/// Idempotent upsert driven by the transport's `/start` flow.
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterReq>,
) -> (StatusCode, Json<ApiResponse<TeacherResponse>>) {
    let language = body
        .language
        .as_deref()
        .unwrap_or_else(|| state.default_language());
    let is_admin = state.is_admin(body.user_id);

    match Teacher::create_or_update(
        state.db(),
        body.user_id,
        body.username.as_deref(),
        &body.first_name,
        body.last_name.as_deref(),
        body.phone_number.as_deref(),
        language,
        is_admin,
    )
    .await
    {
        Ok(teacher) => (
            StatusCode::OK,
            Json(ApiResponse::success(teacher.into(), "Teacher registered")),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse::error_with_code(
                "storage_unavailable",
                format!("Failed to register teacher: {e}"),
            )),
        ),
    }
}

#[derive(Debug, Deserialize)]
pub struct LanguageReq {
    pub language: String,
}

/// PUT /api/teachers/{user_id}/language
pub async fn set_language(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(body): Json<LanguageReq>,
) -> (StatusCode, Json<ApiResponse<()>>) {
    match Teacher::set_language(state.db(), user_id, &body.language).await {
        Ok(true) => (
            StatusCode::OK,
            Json(ApiResponse::success((), "Language updated")),
        ),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error("Teacher not registered")),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse::error_with_code(
                "storage_unavailable",
                format!("Failed to update language: {e}"),
            )),
        ),
    }
}
