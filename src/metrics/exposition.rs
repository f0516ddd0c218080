//! Rendering of translated samples in the Prometheus text format.

use std::collections::HashMap;

use prometheus::proto::{Gauge, LabelPair, Metric, MetricFamily, MetricType};
use prometheus::core::Desc;
use prometheus::{Encoder, TextEncoder};

use super::descriptors::{LabelSchema, MetricDescriptor};
use crate::errors::ConfigError;
use crate::models::Sample;

/// Builds a `Desc` for every descriptor, failing on any name or label
/// Prometheus would reject. Run once at startup.
pub fn validate(
    descriptors: &[MetricDescriptor],
    schema: &LabelSchema,
) -> Result<Vec<Desc>, ConfigError> {
    descriptors
        .iter()
        .map(|descriptor| {
            let labels = schema
                .label_names(descriptor)
                .into_iter()
                .map(str::to_string)
                .collect();
            Desc::new(
                descriptor.exported_id.to_string(),
                descriptor.help_text.to_string(),
                labels,
                HashMap::new(),
            )
            .map_err(|source| ConfigError::Descriptor {
                metric_name: descriptor.metric_name.to_string(),
                source,
            })
        })
        .collect()
}

fn to_metric(sample: &Sample) -> Metric {
    let mut metric = Metric::default();
    for (name, value) in &sample.labels {
        let mut pair = LabelPair::default();
        pair.set_name(name.clone());
        pair.set_value(value.clone());
        metric.mut_label().push(pair);
    }
    let mut gauge = Gauge::default();
    gauge.set_value(sample.value);
    metric.set_gauge(gauge);
    metric.set_timestamp_ms(sample.timestamp.timestamp_millis());
    metric
}

/// Groups samples into one gauge family per descriptor, in descriptor order.
///
/// Descriptors without samples are left out; the text format has no way to
/// express an empty family.
pub fn families(descriptors: &[MetricDescriptor], samples: &[Sample]) -> Vec<MetricFamily> {
    descriptors
        .iter()
        .filter_map(|descriptor| {
            let mut family = MetricFamily::default();
            family.set_name(descriptor.exported_id.to_string());
            family.set_help(descriptor.help_text.to_string());
            family.set_field_type(MetricType::GAUGE);
            samples
                .iter()
                .filter(|sample| sample.descriptor == descriptor)
                .for_each(|sample| family.mut_metric().push(to_metric(sample)));
            (!family.get_metric().is_empty()).then_some(family)
        })
        .collect()
}

/// Encodes metric families in the Prometheus text format.
pub fn render(families: &[MetricFamily]) -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
