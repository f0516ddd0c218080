use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use schemars::{JsonSchema, schema_for};
use serde::{Deserialize, Serialize};

use super::logging::LoggingConfig;
use crate::collector::{CollectorSettings, EntityLabelConfig, FailurePolicy, StalenessFilter};
use crate::errors::ConfigError;
use crate::metrics::{LabelSchema, descriptors, exposition};
use crate::transports::TransportConfig;

const DEFAULT_CONFIG_PATH: &str = "./config.yaml";
const CONFIG_PATH_VAR: &str = "SNAPTRON_CONFIG";
const ENV_PREFIX: &str = "SNAPTRON_";
/// Paths already served by the index and health routes.
const RESERVED_PATHS: [&str; 2] = ["/", "/health"];

/// A top-level enum for versioned configurations.
#[derive(Deserialize, Serialize, JsonSchema)]
#[serde(tag = "version")]
pub enum Config {
    #[serde(rename = "1.0.0")]
    ConfigV1(ConfigV1),
}

fn default_bind_address() -> String {
    "0.0.0.0:9888".to_string()
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

/// Main config for v1.0.0.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct ConfigV1 {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_metrics_path")]
    pub metrics_path: String,
    /// Snap identifiers to export metrics for.
    #[serde(default)]
    pub entities: Vec<String>,
    #[serde(default)]
    pub entity_label: EntityLabelConfig,
    #[serde(default)]
    pub collector: CollectorConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_timeout_in_ms() -> u64 {
    10_000
}

fn default_max_concurrency() -> usize {
    4
}

#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct CollectorConfig {
    /// Deadline for a single fetch from the provider.
    #[serde(default = "default_timeout_in_ms")]
    pub timeout_in_ms: u64,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    #[serde(default)]
    pub staleness: StalenessFilter,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        CollectorConfig {
            timeout_in_ms: default_timeout_in_ms(),
            max_concurrency: default_max_concurrency(),
            failure_policy: FailurePolicy::default(),
            staleness: StalenessFilter::default(),
        }
    }
}

impl ConfigV1 {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.collector.timeout_in_ms)
    }

    pub fn collector_settings(&self) -> CollectorSettings {
        CollectorSettings {
            fetch_timeout: self.fetch_timeout(),
            max_concurrency: self.collector.max_concurrency,
            failure_policy: self.collector.failure_policy,
            staleness: self.collector.staleness,
        }
    }

    pub fn label_schema(&self) -> LabelSchema {
        self.entity_label.schema(self.entities.len())
    }

    /// Rejects configurations the exporter cannot serve with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.entities.is_empty() {
            return Err(ConfigError::NoEntities);
        }
        if self.entities.iter().any(|e| e.trim().is_empty()) {
            return Err(ConfigError::EmptyEntity);
        }
        match &self.transport {
            TransportConfig::Http(http) => {
                if http.token.as_deref().map_or(true, str::is_empty) {
                    return Err(ConfigError::MissingToken);
                }
            }
            TransportConfig::Command(command) => {
                if command.program.trim().is_empty() {
                    return Err(ConfigError::MissingProgram);
                }
            }
        }
        if self.collector.timeout_in_ms == 0 {
            return Err(ConfigError::NotPositive("collector.timeout_in_ms"));
        }
        if self.collector.max_concurrency == 0 {
            return Err(ConfigError::NotPositive("collector.max_concurrency"));
        }
        if !self.metrics_path.starts_with('/') || RESERVED_PATHS.contains(&self.metrics_path.as_str())
        {
            return Err(ConfigError::MetricsPath(self.metrics_path.clone()));
        }
        crate::utils::logger::level_filter(&self.logging.level)?;
        for metric_name in descriptors::metric_names() {
            descriptors::lookup(metric_name)?;
        }
        exposition::validate(descriptors::all(), &self.label_schema())?;
        Ok(())
    }
}

/// Maps the legacy `LISTEN_PORT`, `METRICS_PATH`, `SNAP_IDS` and
/// `SNAP_STORE_MACAROON` variables onto config keys.
///
/// `SNAP_IDS` is a comma separated list, `LISTEN_PORT` binds on all interfaces.
pub fn merge_legacy_env<F>(mut figment: Figment, var: F) -> Figment
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = var("LISTEN_PORT").filter(|p| !p.is_empty()) {
        figment = figment.merge(Serialized::default(
            "bind_address",
            format!("0.0.0.0:{}", port),
        ));
    }
    if let Some(path) = var("METRICS_PATH").filter(|p| !p.is_empty()) {
        figment = figment.merge(Serialized::default("metrics_path", path));
    }
    if let Some(ids) = var("SNAP_IDS").filter(|ids| !ids.is_empty()) {
        let entities: Vec<String> = ids
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect();
        figment = figment.merge(Serialized::default("entities", entities));
    }
    if let Some(token) = var("SNAP_STORE_MACAROON").filter(|t| !t.is_empty()) {
        figment = figment.merge(Serialized::default("transport.token", token));
    }
    figment
}

/// Builds the layered configuration: defaults, YAML file, legacy variables,
/// then `SNAPTRON_` prefixed variables (`__` separates nested keys).
pub fn figment(path: &str) -> Figment {
    let figment = Figment::new()
        .merge(Serialized::default("version", "1.0.0"))
        .merge(Serialized::default("transport.type", "http"))
        .merge(Yaml::file(path));
    merge_legacy_env(figment, |name| std::env::var(name).ok())
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Extracts and validates a configuration.
pub fn extract(figment: &Figment) -> Result<ConfigV1, ConfigError> {
    let config = match figment.extract::<Config>().map_err(Box::new)? {
        Config::ConfigV1(c) => c,
    };
    config.validate()?;
    Ok(config)
}

/// Load config from the YAML file named by `SNAPTRON_CONFIG`, or
/// "config.yaml" in the current directory, plus the environment.
pub fn load_config() -> Result<ConfigV1, ConfigError> {
    let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    extract(&figment(&path))
}

/// Print the JSON schema for the configuration to stdout.
pub fn print_schema() -> Result<(), serde_json::Error> {
    let schema = schema_for!(Config);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
