//! Provider metric responses and the parser that decodes them.

use serde::{Deserialize, Serialize};

use super::date::DateBucket;
use crate::errors::{ConsistencyError, FormatError};

/// One labelled sub-dimension of a metric, e.g. a single channel or country.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SeriesItem {
    pub name: String,
    pub values: Vec<i64>,
    #[serde(default)]
    pub currently_released: bool,
}

impl SeriesItem {
    /// Pairs every value with its bucket, or reports that the lengths disagree.
    pub fn aligned<'a>(
        &'a self,
        buckets: &'a [DateBucket],
    ) -> Result<impl Iterator<Item = (DateBucket, i64)> + 'a, ConsistencyError> {
        if self.values.len() != buckets.len() {
            return Err(ConsistencyError {
                series: self.name.clone(),
                values: self.values.len(),
                buckets: buckets.len(),
            });
        }
        Ok(buckets.iter().copied().zip(self.values.iter().copied()))
    }
}

/// A time-bucketed metric for one entity as returned by the provider.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MetricResponse {
    #[serde(rename = "snap_id", default)]
    pub entity_id: String,
    #[serde(default)]
    pub metric_name: String,
    pub buckets: Vec<DateBucket>,
    pub series: Vec<SeriesItem>,
    #[serde(default)]
    pub status: String,
}

/// The batch envelope used by the remote metrics API.
#[derive(Deserialize)]
struct MetricsEnvelope {
    metrics: Vec<MetricResponse>,
}

/// Decodes raw provider output into every metric it contains.
///
/// Both the bare metric object printed by the command line client and the
/// `{"metrics": [...]}` envelope of the remote API are accepted. Bucket and
/// value lengths are not reconciled here.
pub fn parse_metrics(raw: &[u8]) -> Result<Vec<MetricResponse>, FormatError> {
    // Not an untagged enum: a bad date must surface as its own serde error.
    let value: serde_json::Value = serde_json::from_slice(raw)?;
    if value.get("metrics").is_some() {
        let envelope: MetricsEnvelope = serde_json::from_value(value)?;
        Ok(envelope.metrics)
    } else {
        Ok(vec![serde_json::from_value(value)?])
    }
}

impl MetricResponse {
    /// Whether this response can be the answer for `(entity, metric_name)`.
    /// Unset identifiers match anything.
    fn answers(&self, entity: &str, metric_name: &str) -> bool {
        (self.metric_name.is_empty() || self.metric_name == metric_name)
            && (self.entity_id.is_empty() || self.entity_id == entity)
    }
}

/// Decodes the response for a single requested `(entity, metric)` pair.
///
/// A response that names a different metric or entity is rejected; missing
/// identifiers are filled in from the request.
pub fn parse_metric(
    raw: &[u8],
    entity: &str,
    metric_name: &str,
) -> Result<MetricResponse, FormatError> {
    let mut metrics = parse_metrics(raw)?;
    match metrics.iter().position(|m| m.answers(entity, metric_name)) {
        Some(index) => {
            let mut metric = metrics.swap_remove(index);
            if metric.metric_name.is_empty() {
                metric.metric_name = metric_name.to_string();
            }
            if metric.entity_id.is_empty() {
                metric.entity_id = entity.to_string();
            }
            Ok(metric)
        }
        None => match metrics.into_iter().next() {
            Some(other) if !other.metric_name.is_empty() && other.metric_name != metric_name => {
                Err(FormatError::UnexpectedMetric {
                    expected: metric_name.to_string(),
                    found: other.metric_name,
                })
            }
            Some(other) => Err(FormatError::UnexpectedEntity {
                expected: entity.to_string(),
                found: other.entity_id,
            }),
            None => Err(FormatError::Empty),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHANNELS: &str = r#"{
        "snap_id": "foo",
        "metric_name": "installed_base_by_channel",
        "status": "OK",
        "buckets": ["2024-01-01", "2024-01-02"],
        "series": [
            {"name": "stable", "values": [10, 12], "currently_released": true},
            {"name": "edge", "values": [1, 2]}
        ]
    }"#;

    #[test]
    fn test_parses_bare_metric() {
        let metric = parse_metric(CHANNELS.as_bytes(), "foo", "installed_base_by_channel").unwrap();
        assert_eq!(metric.entity_id, "foo");
        assert_eq!(metric.status, "OK");
        assert_eq!(metric.buckets.len(), 2);
        assert_eq!(metric.buckets[1].to_string(), "2024-01-02");
        assert_eq!(metric.series[0].values, vec![10, 12]);
        assert!(metric.series[0].currently_released);
        assert!(!metric.series[1].currently_released);
    }

    #[test]
    fn test_parses_envelope() {
        let raw = format!(r#"{{"metrics": [{}]}}"#, CHANNELS);
        let metrics = parse_metrics(raw.as_bytes()).unwrap();
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].metric_name, "installed_base_by_channel");
    }

    #[test]
    fn test_optional_fields_default() {
        let raw = r#"{"buckets": ["2024-01-01"], "series": [{"name": "US", "values": [3]}]}"#;
        let metric = parse_metric(raw.as_bytes(), "bar", "installed_base_by_country").unwrap();
        assert_eq!(metric.metric_name, "installed_base_by_country");
        assert_eq!(metric.status, "");
        assert_eq!(metric.entity_id, "bar");
    }

    #[test]
    fn test_bad_date_is_format_error() {
        let raw = r#"{"buckets": ["01/01/2024"], "series": []}"#;
        let err = parse_metrics(raw.as_bytes()).unwrap_err();
        assert!(matches!(err, FormatError::Malformed(_)));
        assert!(err.to_string().contains("YYYY-MM-DD"), "got: {}", err);
    }

    #[test]
    fn test_non_numeric_value_is_format_error() {
        let raw = r#"{"buckets": ["2024-01-01"], "series": [{"name": "US", "values": ["many"]}]}"#;
        assert!(matches!(
            parse_metrics(raw.as_bytes()),
            Err(FormatError::Malformed(_))
        ));
    }

    #[test]
    fn test_garbage_is_format_error() {
        assert!(parse_metrics(b"not json").is_err());
        assert!(parse_metrics(br#"{"series": []}"#).is_err());
    }

    #[test]
    fn test_length_mismatch_is_not_a_parse_error() {
        let raw = r#"{"buckets": ["2024-01-01", "2024-01-02"], "series": [{"name": "x", "values": [1]}]}"#;
        let metric = parse_metric(raw.as_bytes(), "foo", "daily_device_change").unwrap();
        let err = metric.series[0].aligned(&metric.buckets).err().unwrap();
        assert_eq!(err.values, 1);
        assert_eq!(err.buckets, 2);
    }

    #[test]
    fn test_unexpected_metric_is_rejected() {
        let err = parse_metric(CHANNELS.as_bytes(), "foo", "installed_base_by_version").unwrap_err();
        assert!(matches!(err, FormatError::UnexpectedMetric { .. }));
    }

    #[test]
    fn test_empty_envelope() {
        let err = parse_metric(br#"{"metrics": []}"#, "foo", "daily_device_change").unwrap_err();
        assert!(matches!(err, FormatError::Empty));
    }

    #[test]
    fn test_other_entity_is_rejected() {
        let err =
            parse_metric(CHANNELS.as_bytes(), "bar", "installed_base_by_channel").unwrap_err();
        match err {
            FormatError::UnexpectedEntity { expected, found } => {
                assert_eq!(expected, "bar");
                assert_eq!(found, "foo");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_envelope_picks_the_requested_entity() {
        let raw = r#"{"metrics": [
            {"snap_id": "foo", "metric_name": "daily_device_change", "buckets": [], "series": []},
            {"snap_id": "bar", "metric_name": "daily_device_change", "buckets": ["2024-01-01"],
             "series": [{"name": "new", "values": [4]}]}
        ]}"#;
        let metric = parse_metric(raw.as_bytes(), "bar", "daily_device_change").unwrap();
        assert_eq!(metric.entity_id, "bar");
        assert_eq!(metric.series[0].values, vec![4]);
    }
}
