pub mod response;
pub mod routes;
pub mod state;

use axum::Router;
use state::AppState;

/// Builds the full application router: the JSON API under `/api` plus the
/// `/health` probe the deployment's balancer polls.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", axum::routing::get(routes::health::health))
        .nest("/api", routes::routes())
        .with_state(state)
}
