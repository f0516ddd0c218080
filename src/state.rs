//! Shared application state.
//!
//! Contains the state that is shared across all request handlers:
//! the configuration and the collector serving scrapes.

use crate::collector::Collector;
use crate::config::ConfigV1;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request; both members are immutable after startup.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration loaded at startup.
    pub config: Arc<ConfigV1>,
    /// Collector translating provider metrics on every scrape.
    pub collector: Arc<Collector>,
}
