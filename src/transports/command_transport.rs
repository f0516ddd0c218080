use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::TransportError;
use crate::transports::{FetchRequest, Transport};

const ENTITY_PLACEHOLDER: &str = "{entity}";
const METRIC_PLACEHOLDER: &str = "{metric}";

fn default_program() -> String {
    "snapcraft".to_string()
}

fn default_args() -> Vec<String> {
    ["metrics", ENTITY_PLACEHOLDER, "--name", METRIC_PLACEHOLDER, "--format", "json"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Runs a local command and reads the metric from its standard output.
///
/// `{entity}` and `{metric}` in `args` are replaced for every fetch.
#[derive(Deserialize, Serialize, Debug, JsonSchema, Clone)]
pub struct CommandTransportConfig {
    #[serde(default = "default_program")]
    pub program: String,
    #[serde(default = "default_args")]
    pub args: Vec<String>,
}

impl Default for CommandTransportConfig {
    fn default() -> Self {
        CommandTransportConfig {
            program: default_program(),
            args: default_args(),
        }
    }
}

pub struct CommandTransport {
    config: CommandTransportConfig,
}

impl CommandTransport {
    pub fn new(config: &CommandTransportConfig) -> Self {
        info!(
            "Creating command transport using '{}' {:?}",
            config.program, config.args
        );
        Self {
            config: config.clone(),
        }
    }

    fn args_for(&self, entity: &str, metric_name: &str) -> Vec<String> {
        self.config
            .args
            .iter()
            .map(|arg| {
                arg.replace(ENTITY_PLACEHOLDER, entity)
                    .replace(METRIC_PLACEHOLDER, metric_name)
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl Transport for CommandTransport {
    fn get_type(&self) -> &str {
        "command"
    }

    async fn fetch(&self, request: &FetchRequest<'_>) -> Result<Vec<u8>, TransportError> {
        let args = self.args_for(request.entity, request.metric_name);
        debug!("Running {} {:?}", self.config.program, args);

        // The child is killed if the collector's timeout drops this future.
        let output = Command::new(&self.config.program)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| TransportError::Spawn {
                program: self.config.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(TransportError::CommandFailed {
                program: self.config.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

    fn request<'a>(entity: &'a str, metric_name: &'a str) -> FetchRequest<'a> {
        FetchRequest {
            entity,
            metric_name,
            window: None,
        }
    }

    fn transport(program: &str, args: &[&str]) -> CommandTransport {
        CommandTransport::new(&CommandTransportConfig {
            program: program.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
        })
    }

    #[test]
    fn test_default_args_follow_snapcraft_cli() {
        let t = CommandTransport::new(&CommandTransportConfig::default());
        assert_eq!(
            t.args_for("foo", "installed_base_by_channel"),
            vec![
                "metrics",
                "foo",
                "--name",
                "installed_base_by_channel",
                "--format",
                "json"
            ]
        );
    }

    #[tokio::test]
    async fn test_captures_stdout() {
        let t = transport("printf", &["%s", "{entity}:{metric}"]);
        let out = t.fetch(&request("foo", "daily_device_change")).await.unwrap();
        assert_eq!(out, b"foo:daily_device_change");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_transport_error() {
        let t = transport("sh", &["-c", "echo boom >&2; exit 3"]);
        match t.fetch(&request("foo", "daily_device_change")).await {
            Err(TransportError::CommandFailed { stderr, .. }) => assert_eq!(stderr, "boom"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_program_is_transport_error() {
        let t = transport("/nonexistent/snapcraft", &[]);
        assert!(matches!(
            t.fetch(&request("foo", "daily_device_change")).await,
            Err(TransportError::Spawn { .. })
        ));
    }

    #[tokio::test]
    async fn test_timed_out_fetch_kills_the_child() {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let marker = std::env::temp_dir().join(format!("snaptron-{}-{}", std::process::id(), nanos));
        let marker_path = marker.to_string_lossy().to_string();
        let t = transport("sh", &["-c", "sleep 1; touch {entity}"]);

        let started = Instant::now();
        let result = tokio::time::timeout(
            Duration::from_millis(100),
            t.fetch(&request(&marker_path, "daily_device_change")),
        )
        .await;
        assert!(result.is_err(), "fetch should have timed out");
        assert!(started.elapsed() < Duration::from_millis(900));

        // A surviving shell would create the marker after its sleep.
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!marker.exists(), "command outlived its fetch");
    }
}
