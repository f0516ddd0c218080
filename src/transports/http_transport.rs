use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::errors::TransportError;
use crate::models::DateBucket;
use crate::transports::{FetchRequest, Transport};

pub const DEFAULT_METRICS_URI: &str = "https://dashboard.snapcraft.io/dev/api/snaps/metrics";

fn default_uri() -> String {
    DEFAULT_METRICS_URI.to_string()
}

/// The config needed to query the store's metrics API.
#[derive(Deserialize, Serialize, Debug, JsonSchema, Clone)]
pub struct HttpTransportConfig {
    #[serde(default = "default_uri")]
    pub uri: String,
    /// Credential sent in the `Authorization` header. Also read from `SNAP_STORE_MACAROON`.
    #[serde(default)]
    pub token: Option<String>,
    /// Optional scheme placed before the token, e.g. "Macaroon".
    #[serde(default)]
    pub auth_scheme: Option<String>,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        HttpTransportConfig {
            uri: default_uri(),
            token: None,
            auth_scheme: None,
        }
    }
}

#[derive(Serialize, Debug)]
struct MetricFilter<'a> {
    snap_id: &'a str,
    metric_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    start: Option<DateBucket>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end: Option<DateBucket>,
}

#[derive(Serialize, Debug)]
struct MetricFilters<'a> {
    filters: Vec<MetricFilter<'a>>,
}

/// POSTs a filter for every fetched pair to the metrics endpoint.
pub struct HttpTransport {
    config: HttpTransportConfig,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &HttpTransportConfig, timeout: Duration) -> Result<Self, TransportError> {
        info!("Creating http transport for '{}'", config.uri);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| TransportError::Request {
                uri: config.uri.clone(),
                source,
            })?;
        Ok(Self {
            config: config.clone(),
            client,
        })
    }

    fn authorization(&self) -> Result<String, TransportError> {
        let token = self
            .config
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| TransportError::MissingCredential("http".to_string()))?;
        Ok(match &self.config.auth_scheme {
            Some(scheme) => format!("{} {}", scheme, token),
            None => token.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    fn get_type(&self) -> &str {
        "http"
    }

    async fn fetch(&self, request: &FetchRequest<'_>) -> Result<Vec<u8>, TransportError> {
        let authorization = self.authorization()?;
        let body = MetricFilters {
            filters: vec![MetricFilter {
                snap_id: request.entity,
                metric_name: request.metric_name,
                start: request.window.map(|w| w.start),
                end: request.window.map(|w| w.end),
            }],
        };

        debug!(
            "Requesting {} for {} from {}",
            request.metric_name, request.entity, self.config.uri
        );
        let request_error = |source: reqwest::Error| TransportError::Request {
            uri: self.config.uri.clone(),
            source,
        };
        let response = self
            .client
            .post(&self.config.uri)
            .header("Authorization", authorization)
            .json(&body)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(request_error)?;
        if status != reqwest::StatusCode::OK {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).trim().to_string(),
            });
        }
        Ok(bytes.to_vec())
    }
}
