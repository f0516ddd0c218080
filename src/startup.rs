//! Application startup and server initialization.
//!
//! Builds the collector from the validated configuration and serves the
//! routes, or runs a one-off collection for diagnostics.

use std::error::Error;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::collector::{Collector, FailurePolicy};
use crate::config::ConfigV1;
use crate::metrics::{Metrics, descriptors, exposition};
use crate::routes;
use crate::state::AppState;
use crate::transports::create_transport;

/// Builds the collector described by the configuration.
///
/// # Errors
///
/// Returns an error if a descriptor is rejected by Prometheus or the
/// transport cannot be created.
pub fn build_collector(config: &ConfigV1) -> Result<Collector, Box<dyn Error>> {
    let schema = config.label_schema();
    exposition::validate(descriptors::all(), &schema)?;
    let transport = create_transport(&config.transport, config.fetch_timeout())?;
    Ok(Collector::new(
        config.entities.clone(),
        Arc::from(transport),
        schema,
        config.collector_settings(),
        Metrics::new(),
    ))
}

pub fn build_state(config: Arc<ConfigV1>) -> Result<AppState, Box<dyn Error>> {
    let collector = Arc::new(build_collector(&config)?);
    Ok(AppState { config, collector })
}

/// Initializes and runs the exporter.
///
/// # Errors
///
/// Returns an error if the collector cannot be built, the server fails to
/// bind to the configured address or stops with a runtime error.
pub async fn run(config: Arc<ConfigV1>) -> Result<(), Box<dyn Error>> {
    let state = build_state(config.clone())?;
    let app = routes::create_router(state);

    info!(
        "Starting server on {}, metrics at {}",
        config.bind_address, config.metrics_path
    );
    let listener = TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Runs a single fail-fast collection and returns the number of samples.
pub async fn check(config: &ConfigV1) -> Result<usize, Box<dyn Error>> {
    let collector = build_collector(config)?.with_failure_policy(FailurePolicy::FailFast);
    let samples = collector.collect().await?;
    Ok(samples.len())
}
