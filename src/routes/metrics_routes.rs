//! Metrics exposition endpoint.

use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use tracing::error;

use crate::metrics::exposition;
use crate::state::AppState;
use crate::utils::http_helpers::HTTPError;

const TEXT_FORMAT: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Creates the metrics route at the configured path.
pub fn routes(path: &str) -> Router<AppState> {
    Router::new().route(path, get(metrics_handler))
}

/// Runs a fresh collection and renders it, followed by the exporter's own metrics.
///
/// Only a fail-fast collector can fail here; a skipping one answers with
/// whatever samples it managed to produce.
async fn metrics_handler(State(state): State<AppState>) -> Result<impl IntoResponse, HTTPError> {
    let samples = state.collector.collect().await.map_err(|e| {
        error!(
            event_name = "routes.metrics.scrape_failed",
            event_domain = "routes",
            error = %e,
            "scrape aborted"
        );
        HTTPError::new(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
    })?;

    let mut families = exposition::families(state.collector.describe(), &samples);
    families.extend(state.collector.metrics().gather());
    let body = exposition::render(&families)
        .map_err(|e| HTTPError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok((StatusCode::OK, [(header::CONTENT_TYPE, TEXT_FORMAT)], body))
}
