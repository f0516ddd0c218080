//! HTTP route definitions and handlers.
//!
//! The index page, the health check and the metrics endpoint at the
//! configured path.

mod health_routes;
mod index_routes;
mod metrics_routes;

use crate::state::AppState;
use axum::Router;

/// Creates the application router with all configured routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(index_routes::routes())
        .merge(health_routes::routes())
        .merge(metrics_routes::routes(&state.config.metrics_path))
        .with_state(state)
}
