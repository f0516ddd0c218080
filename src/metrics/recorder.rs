//! Self-instrumentation of the exporter using Prometheus.

use prometheus::{
    CounterVec, Histogram, HistogramVec, Opts, Registry, register_counter_vec_with_registry,
    register_histogram_vec_with_registry, register_histogram_with_registry,
};
use prometheus::proto::MetricFamily;
use std::sync::Arc;

/// Trait for recording how scrapes of the upstream provider went.
pub trait MetricsRecorder: Clone + Send + Sync + 'static {
    /// Records one fetch of an `(entity, metric)` pair with its outcome.
    fn record_fetch(&self, metric_name: &str, result: &str);

    /// Records how long a fetch took, including parsing.
    fn record_fetch_duration(&self, metric_name: &str, duration_secs: f64);

    /// Records a series dropped because its values did not match the buckets.
    fn record_dropped_series(&self, metric_name: &str);

    /// Records the duration of a whole collection.
    fn record_scrape_duration(&self, duration_secs: f64);
}

/// Prometheus metrics about the exporter itself.
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,

    fetch_total: CounterVec,
    fetch_duration_seconds: HistogramVec,
    dropped_series_total: CounterVec,
    scrape_duration_seconds: Histogram,
}

impl Metrics {
    /// Creates a new metrics instance with a private Prometheus registry.
    pub fn new() -> Self {
        let registry = Arc::new(Registry::new());

        let fetch_total = register_counter_vec_with_registry!(
            Opts::new(
                "snaptron_fetch_total",
                "Total number of metric fetches from the provider"
            ),
            &["metric_name", "result"],
            registry.clone()
        )
        .expect("Failed to register snaptron_fetch_total");

        let fetch_duration_seconds = register_histogram_vec_with_registry!(
            "snaptron_fetch_duration_seconds",
            "Provider fetch duration in seconds",
            &["metric_name"],
            vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0],
            registry.clone()
        )
        .expect("Failed to register snaptron_fetch_duration_seconds");

        let dropped_series_total = register_counter_vec_with_registry!(
            Opts::new(
                "snaptron_dropped_series_total",
                "Series dropped because values and buckets had different lengths"
            ),
            &["metric_name"],
            registry.clone()
        )
        .expect("Failed to register snaptron_dropped_series_total");

        let scrape_duration_seconds = register_histogram_with_registry!(
            "snaptron_scrape_duration_seconds",
            "Duration of a full collection in seconds",
            vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0],
            registry.clone()
        )
        .expect("Failed to register snaptron_scrape_duration_seconds");

        Metrics {
            registry,
            fetch_total,
            fetch_duration_seconds,
            dropped_series_total,
            scrape_duration_seconds,
        }
    }

    /// Snapshot of the exporter's own metric families.
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRecorder for Metrics {
    fn record_fetch(&self, metric_name: &str, result: &str) {
        self.fetch_total
            .with_label_values(&[metric_name, result])
            .inc();
    }

    fn record_fetch_duration(&self, metric_name: &str, duration_secs: f64) {
        self.fetch_duration_seconds
            .with_label_values(&[metric_name])
            .observe(duration_secs);
    }

    fn record_dropped_series(&self, metric_name: &str) {
        self.dropped_series_total
            .with_label_values(&[metric_name])
            .inc();
    }

    fn record_scrape_duration(&self, duration_secs: f64) {
        self.scrape_duration_seconds.observe(duration_secs);
    }
}
