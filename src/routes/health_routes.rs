//! Liveness endpoint.
//!
//! Never touches the provider, so it stays cheap while upstream is slow.

use axum::{Json, Router, extract::State, routing::get};
use serde_json::{Value, json};

use crate::state::AppState;

/// Registers health check routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "entities": state.collector.entities().len(),
        "transport": state.config.transport.type_name(),
    }))
}
