//! Reporting routes. Authorization is the transport's: the requesting
//! `admin_id` is checked against the configured admin set before the core is
//! asked for anything. Export and report usage is appended to the audit log.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use db::models::admin_log::Model as AdminLog;

use crate::response::ApiResponse;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/report", get(daily_report))
        .route("/export.csv", get(export_csv))
        .route("/logs", get(recent_logs))
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub admin_id: i64,
    /// Report day; defaults to today in the school's zone.
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Default)]
pub struct ReportRow {
    pub user_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub check_in_at: String,
    pub check_out_at: Option<String>,
    pub status: String,
    pub arrival: String,
    pub late_minutes: i32,
    pub total_hours: Option<f64>,
}

/// GET /api/admin/report
pub async fn daily_report(
    State(state): State<AppState>,
    Query(q): Query<ReportQuery>,
) -> (StatusCode, Json<ApiResponse<Vec<ReportRow>>>) {
    if !state.is_admin(q.admin_id) {
        warn!(user_id = q.admin_id, "non-admin attempted to fetch a report");
        return (
            StatusCode::FORBIDDEN,
            Json(ApiResponse::error("Admin access required")),
        );
    }

    let date = q
        .date
        .unwrap_or_else(|| state.manager().local_date(Utc::now()));

    match state.manager().daily_report(date).await {
        Ok(rows) => {
            let _ = AdminLog::record(
                state.db(),
                q.admin_id,
                "viewed_daily_report",
                None,
                Some(&date.to_string()),
            )
            .await;

            let rows = rows
                .into_iter()
                .map(|(session, teacher)| ReportRow {
                    user_id: session.user_id,
                    username: teacher.as_ref().and_then(|t| t.username.clone()),
                    first_name: teacher.as_ref().map(|t| t.first_name.clone()),
                    last_name: teacher.as_ref().and_then(|t| t.last_name.clone()),
                    check_in_at: rfc3339(session.check_in_at),
                    check_out_at: session.check_out_at.map(rfc3339),
                    status: session.status.to_string(),
                    arrival: session.arrival.to_string(),
                    late_minutes: session.late_minutes,
                    total_hours: session.total_hours,
                })
                .collect();
            (
                StatusCode::OK,
                Json(ApiResponse::success(rows, "Report generated")),
            )
        }
        Err(err) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse::error_with_code(err.code(), err.to_string())),
        ),
    }
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub admin_id: i64,
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// GET /api/admin/export.csv
///
/// All committed sessions in the range, ascending by (date, user_id), as a
/// `text/csv` attachment. Dirty state can never appear here: the store only
/// returns committed rows.
pub async fn export_csv(
    State(state): State<AppState>,
    Query(q): Query<ExportQuery>,
) -> (StatusCode, (HeaderMap, String)) {
    let mut headers = HeaderMap::new();

    if !state.is_admin(q.admin_id) {
        warn!(user_id = q.admin_id, "non-admin attempted a CSV export");
        headers.insert(
            axum::http::header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        return (StatusCode::FORBIDDEN, (headers, "forbidden".to_string()));
    }

    let sessions = match state.manager().export_range(q.from, q.to).await {
        Ok(v) => v,
        Err(_) => {
            headers.insert(
                axum::http::header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            );
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                (headers, "error".to_string()),
            );
        }
    };

    let mut csv = String::from(
        "user_id,date,check_in_at,check_in_lat,check_in_lon,check_out_at,check_out_lat,check_out_lon,status,arrival,late_minutes,total_hours\n",
    );

    fn esc(s: &str) -> String {
        if s.contains(',') || s.contains('"') || s.contains('\n') {
            format!("\"{}\"", s.replace('"', "\"\""))
        } else {
            s.to_string()
        }
    }

    for s in &sessions {
        let row = format!(
            "{},{},{},{},{},{},{},{},{},{},{},{}\n",
            s.user_id,
            s.date,
            esc(&rfc3339(s.check_in_at)),
            s.check_in_lat,
            s.check_in_lon,
            esc(&s.check_out_at.map(rfc3339).unwrap_or_default()),
            s.check_out_lat.map(|v| v.to_string()).unwrap_or_default(),
            s.check_out_lon.map(|v| v.to_string()).unwrap_or_default(),
            s.status,
            s.arrival,
            s.late_minutes,
            s.total_hours.map(|v| format!("{v:.2}")).unwrap_or_default(),
        );
        csv.push_str(&row);
    }

    let filename = format!("attendance_{}_{}.csv", q.from, q.to);
    let _ = AdminLog::record(
        state.db(),
        q.admin_id,
        "exported_csv",
        None,
        Some(&filename),
    )
    .await;

    headers.insert(
        axum::http::header::CONTENT_TYPE,
        HeaderValue::from_static("text/csv; charset=utf-8"),
    );
    if let Ok(value) = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\"")) {
        headers.insert(axum::http::header::CONTENT_DISPOSITION, value);
    }

    (StatusCode::OK, (headers, csv))
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub admin_id: i64,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize, Default)]
pub struct AdminLogRow {
    pub id: i64,
    pub admin_user_id: i64,
    pub action: String,
    pub target_user_id: Option<i64>,
    pub details: Option<String>,
    pub created_at: String,
}

/// GET /api/admin/logs
pub async fn recent_logs(
    State(state): State<AppState>,
    Query(q): Query<LogsQuery>,
) -> (StatusCode, Json<ApiResponse<Vec<AdminLogRow>>>) {
    if !state.is_admin(q.admin_id) {
        return (
            StatusCode::FORBIDDEN,
            Json(ApiResponse::error("Admin access required")),
        );
    }

    match AdminLog::recent(state.db(), q.limit.unwrap_or(50).clamp(1, 200)).await {
        Ok(rows) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                rows.into_iter()
                    .map(|l| AdminLogRow {
                        id: l.id,
                        admin_user_id: l.admin_user_id,
                        action: l.action,
                        target_user_id: l.target_user_id,
                        details: l.details,
                        created_at: rfc3339(l.created_at),
                    })
                    .collect(),
                "Logs fetched",
            )),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse::error_with_code(
                "storage_unavailable",
                e.to_string(),
            )),
        ),
    }
}

fn rfc3339(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}
