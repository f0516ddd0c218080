//! Metric descriptors, exposition and self-instrumentation.
//!
//! `descriptors` holds the fixed table of snap metrics, `exposition` turns
//! samples into the Prometheus text format and `recorder` tracks how the
//! exporter itself is doing.

pub mod descriptors;
pub mod exposition;
mod recorder;

pub use descriptors::{LabelSchema, MetricDescriptor, lookup};
pub use recorder::{Metrics, MetricsRecorder};
