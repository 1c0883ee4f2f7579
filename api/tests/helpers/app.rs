use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use api::state::AppState;
use db::test_utils::setup_test_db;
use services::AttendanceSettings;

pub const SCHOOL_LAT: f64 = 41.2995;
pub const SCHOOL_LON: f64 = 69.2401;
pub const ADMIN_ID: i64 = 900;

/// Monday 2025-09-08 08:00 in Asia/Tashkent, as the transport would deliver it.
pub const MONDAY_MORNING: &str = "2025-09-08T03:00:00Z";
/// Same Monday 16:00 local.
pub const MONDAY_AFTERNOON: &str = "2025-09-08T11:00:00Z";
/// Saturday 2025-09-13 10:00 local.
pub const SATURDAY_MORNING: &str = "2025-09-13T05:00:00Z";

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
}

pub async fn make_test_app() -> TestApp {
    let db = setup_test_db().await;
    let settings = AttendanceSettings {
        school_latitude: SCHOOL_LAT,
        school_longitude: SCHOOL_LON,
        radius_meters: 50.0,
        timezone: "Asia/Tashkent".parse().unwrap(),
        work_days: vec![1, 2, 3, 4, 5],
        work_start: chrono::NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
        work_end: chrono::NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
        grace_period_minutes: 15,
    };
    let state = AppState::from_parts(db, settings, [ADMIN_ID], "uz").expect("valid test settings");

    TestApp {
        app: api::app(state.clone()),
        state,
    }
}

pub async fn send_json(app: &Router, method: &str, uri: &str, body: Value) -> Response {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.clone().oneshot(req).await.unwrap()
}

pub async fn send_get(app: &Router, uri: &str) -> Response {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.clone().oneshot(req).await.unwrap()
}

pub async fn json_body(res: Response) -> Value {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn text_body(res: Response) -> String {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Registers a teacher through the public route, as the `/start` flow does.
pub async fn register_teacher(app: &Router, user_id: i64, first_name: &str) {
    let res = send_json(
        app,
        "POST",
        "/api/teachers/register",
        json!({
            "user_id": user_id,
            "username": format!("user{user_id}"),
            "first_name": first_name,
        }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
}

/// Posts a check-in event with an explicit transport timestamp.
pub async fn check_in_at(
    app: &Router,
    user_id: i64,
    lat: f64,
    lon: f64,
    timestamp: &str,
) -> Response {
    send_json(
        app,
        "POST",
        "/api/attendance/check-in",
        json!({
            "user_id": user_id,
            "latitude": lat,
            "longitude": lon,
            "timestamp": timestamp,
        }),
    )
    .await
}

pub async fn check_out_at(
    app: &Router,
    user_id: i64,
    lat: f64,
    lon: f64,
    timestamp: &str,
) -> Response {
    send_json(
        app,
        "POST",
        "/api/attendance/check-out",
        json!({
            "user_id": user_id,
            "latitude": lat,
            "longitude": lon,
            "timestamp": timestamp,
        }),
    )
    .await
}
