pub mod admin;
pub mod attendance;
pub mod health;
pub mod teachers;

use axum::Router;

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/attendance", attendance::routes())
        .nest("/teachers", teachers::routes())
        .nest("/admin", admin::routes())
}
