//! Operational endpoints: health and resilience introspection.

pub mod handlers;

use axum::{routing::get, Router};

use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/admin/resilience", get(get_resilience))
        .with_state(state)
}
