//! Liveness probe for the deployment's balancer.
//!
//! The body is incidental; routing decisions key on the status code alone.
//! Not-ready never blocks writes that still arrive — correctness is the
//! storage layer's job, this only steers traffic during rollover.

use axum::{extract::State, http::StatusCode};

use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> (StatusCode, &'static str) {
    if state.coordinator().ready().await {
        (StatusCode::OK, "OK")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE")
    }
}
