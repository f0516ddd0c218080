use super::{
    command_transport::{CommandTransport, CommandTransportConfig},
    http_transport::{HttpTransport, HttpTransportConfig},
};
use crate::errors::TransportError;
use crate::models::DateBucket;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration of the backend used to reach the metrics provider.
#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone)]
#[serde(tag = "type")]
pub enum TransportConfig {
    #[serde(rename = "command")]
    Command(CommandTransportConfig),
    #[serde(rename = "http")]
    Http(HttpTransportConfig),
}

impl TransportConfig {
    pub fn type_name(&self) -> &'static str {
        match self {
            TransportConfig::Command(_) => "command",
            TransportConfig::Http(_) => "http",
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig::Http(HttpTransportConfig::default())
    }
}

/// Inclusive range of buckets a fetch is interested in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: DateBucket,
    pub end: DateBucket,
}

impl DateWindow {
    pub fn single(day: DateBucket) -> Self {
        DateWindow {
            start: day,
            end: day,
        }
    }
}

/// One `(entity, metric)` pair to fetch.
#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    pub entity: &'a str,
    pub metric_name: &'a str,
    /// Set when only part of the history will be used; backends may ignore it.
    pub window: Option<DateWindow>,
}

/// A transport turns an `(entity, metric)` pair into the provider's raw response.
///
/// Calls are single-shot; retrying is left to the next scrape.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    fn get_type(&self) -> &str;
    async fn fetch(&self, request: &FetchRequest<'_>) -> Result<Vec<u8>, TransportError>;
}

/// Create a transport from a given config.
pub fn create_transport(
    config: &TransportConfig,
    timeout: Duration,
) -> Result<Box<dyn Transport>, TransportError> {
    match config {
        TransportConfig::Command(cfg) => Ok(Box::new(CommandTransport::new(cfg))),
        TransportConfig::Http(cfg) => Ok(Box::new(HttpTransport::new(cfg, timeout)?)),
    }
}
