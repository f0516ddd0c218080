//! Error taxonomy for the exporter.
//!
//! Transport and format errors are recoverable per `(entity, metric)` pair,
//! consistency errors only ever drop a single series, and configuration or
//! registry errors are fatal at startup.

use std::time::Duration;

use thiserror::Error;

/// The fetch step failed before any bytes could be parsed.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("request to {uri} failed: {source}")]
    Request {
        uri: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected status code {status}: {body}")]
    Status { status: u16, body: String },

    #[error("no credential configured for the {0} transport")]
    MissingCredential(String),
}

/// Raw bytes did not decode into a metric response.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("malformed metric response: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("response contained no metrics")]
    Empty,

    #[error("response is for metric '{found}', expected '{expected}'")]
    UnexpectedMetric { expected: String, found: String },

    #[error("response is for entity '{found}', expected '{expected}'")]
    UnexpectedEntity { expected: String, found: String },
}

/// A decoded series whose values do not line up with the bucket list.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("series '{series}' has {values} values for {buckets} buckets")]
pub struct ConsistencyError {
    pub series: String,
    pub values: usize,
    pub buckets: usize,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unknown metric '{0}'")]
    UnknownMetric(String),
}

/// Startup misconfiguration. The exporter refuses to serve when any of these occur.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("no entities configured")]
    NoEntities,

    #[error("entity identifiers must not be empty")]
    EmptyEntity,

    #[error("the http transport requires a token")]
    MissingToken,

    #[error("the command transport requires a program")]
    MissingProgram,

    #[error("{0} must be greater than zero")]
    NotPositive(&'static str),

    #[error("metrics path '{0}' must start with '/' and not clash with another route")]
    MetricsPath(String),

    #[error("invalid logging.level '{0}'. Valid values: trace, debug, info, warn, error")]
    LogLevel(String),

    #[error("invalid descriptor for '{metric_name}': {source}")]
    Descriptor {
        metric_name: String,
        #[source]
        source: prometheus::Error,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Why a single `(entity, metric)` pair produced no samples.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),
}

/// A failed pair, as reported by a fail-fast collection.
#[derive(Error, Debug)]
#[error("collecting {metric_name} for {entity} failed: {source}")]
pub struct CollectError {
    pub entity: String,
    pub metric_name: String,
    #[source]
    pub source: FetchError,
}
