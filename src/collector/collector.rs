use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{NaiveDate, Utc};
use futures::stream::{self, StreamExt};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::policy::{FailurePolicy, StalenessFilter};
use crate::errors::{CollectError, FetchError};
use crate::metrics::{LabelSchema, MetricDescriptor, Metrics, MetricsRecorder, descriptors};
use crate::models::{DateBucket, MetricResponse, Sample, parse_metric};
use crate::transports::{DateWindow, FetchRequest, Transport};

/// Tunables of a collection that do not change after startup.
#[derive(Debug, Clone)]
pub struct CollectorSettings {
    /// Deadline for a single fetch, including the transport call.
    pub fetch_timeout: Duration,
    /// Number of `(entity, metric)` pairs fetched at the same time.
    pub max_concurrency: usize,
    pub failure_policy: FailurePolicy,
    pub staleness: StalenessFilter,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        CollectorSettings {
            fetch_timeout: Duration::from_secs(10),
            max_concurrency: 4,
            failure_policy: FailurePolicy::default(),
            staleness: StalenessFilter::default(),
        }
    }
}

/// Translates provider metrics into samples, from scratch on every scrape.
///
/// Holds only immutable configuration, so one instance can serve concurrent
/// scrapes without locking.
pub struct Collector {
    entities: Vec<String>,
    transport: Arc<dyn Transport>,
    schema: LabelSchema,
    settings: CollectorSettings,
    metrics: Metrics,
}

impl Collector {
    pub fn new(
        entities: Vec<String>,
        transport: Arc<dyn Transport>,
        schema: LabelSchema,
        settings: CollectorSettings,
        metrics: Metrics,
    ) -> Self {
        info!(
            "Creating collector for {} entities over the {} transport",
            entities.len(),
            transport.get_type()
        );
        Collector {
            entities,
            transport,
            schema,
            settings,
            metrics,
        }
    }

    /// Same collector with a different failure policy, e.g. fail-fast for a startup check.
    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.settings.failure_policy = failure_policy;
        self
    }

    /// Every metric this collector can emit, whether or not data is available.
    pub fn describe(&self) -> &'static [MetricDescriptor] {
        descriptors::all()
    }

    pub fn entities(&self) -> &[String] {
        &self.entities
    }

    pub fn schema(&self) -> &LabelSchema {
        &self.schema
    }

    pub fn settings(&self) -> &CollectorSettings {
        &self.settings
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Fetches, parses and translates every tracked metric, as of today (UTC).
    pub async fn collect(&self) -> Result<Vec<Sample>, CollectError> {
        self.collect_on(Utc::now().date_naive()).await
    }

    /// Like [`Collector::collect`] with an explicit scrape date, which only
    /// matters for the staleness filter.
    pub async fn collect_on(&self, today: NaiveDate) -> Result<Vec<Sample>, CollectError> {
        let started = Instant::now();
        let reference = self.settings.staleness.reference_date(today);

        let result = self.collect_pairs(reference).await;

        let elapsed = started.elapsed().as_secs_f64();
        self.metrics.record_scrape_duration(elapsed);
        match &result {
            Ok((samples, failed)) => info!(
                event_name = "collector.scrape.completed",
                event_domain = "collector",
                samples = samples.len(),
                failed_pairs = failed,
                duration_seconds = elapsed,
                "collection finished"
            ),
            Err(e) => warn!(
                event_name = "collector.scrape.aborted",
                event_domain = "collector",
                entity = %e.entity,
                metric_name = %e.metric_name,
                duration_seconds = elapsed,
                "collection aborted"
            ),
        }
        result.map(|(samples, _)| samples)
    }

    /// Fetches every pair and returns the samples with the number of skipped pairs.
    async fn collect_pairs(
        &self,
        reference: Option<DateBucket>,
    ) -> Result<(Vec<Sample>, usize), CollectError> {
        let pairs: Vec<(String, &'static MetricDescriptor)> = self
            .entities
            .iter()
            .flat_map(|entity| {
                descriptors::all()
                    .iter()
                    .map(move |descriptor| (entity.clone(), descriptor))
            })
            .collect();
        let window = reference.map(DateWindow::single);

        let mut fetches = stream::iter(pairs)
            .map(|(entity, descriptor)| async move {
                let result = self.fetch(&entity, descriptor, window).await;
                (entity, descriptor, result)
            })
            .buffer_unordered(self.settings.max_concurrency.max(1))
            .boxed();

        let mut samples = Vec::new();
        let mut failed = 0usize;
        while let Some((entity, descriptor, result)) = fetches.next().await {
            match result {
                Ok(response) => {
                    samples.extend(self.translate(&entity, descriptor, &response, reference));
                }
                Err(source) => match self.settings.failure_policy {
                    FailurePolicy::Skip => {
                        failed += 1;
                        warn!(
                            event_name = "collector.fetch.skipped",
                            event_domain = "collector",
                            entity = %entity,
                            metric_name = descriptor.metric_name,
                            error = %source,
                            "skipping metric for this scrape"
                        );
                    }
                    FailurePolicy::FailFast => {
                        return Err(CollectError {
                            entity,
                            metric_name: descriptor.metric_name.to_string(),
                            source,
                        });
                    }
                },
            }
        }
        Ok((samples, failed))
    }

    /// One transport call plus parsing, bounded by the fetch timeout.
    async fn fetch(
        &self,
        entity: &str,
        descriptor: &MetricDescriptor,
        window: Option<DateWindow>,
    ) -> Result<MetricResponse, FetchError> {
        let started = Instant::now();
        let request = FetchRequest {
            entity,
            metric_name: descriptor.metric_name,
            window,
        };
        let call = self.transport.fetch(&request);
        let result = match timeout(self.settings.fetch_timeout, call).await {
            Ok(Ok(raw)) => {
                parse_metric(&raw, entity, descriptor.metric_name).map_err(FetchError::from)
            }
            Ok(Err(e)) => Err(FetchError::from(e)),
            Err(_) => Err(FetchError::Timeout(self.settings.fetch_timeout)),
        };

        let outcome = match &result {
            Ok(_) => "ok",
            Err(FetchError::Transport(_)) => "transport_error",
            Err(FetchError::Format(_)) => "format_error",
            Err(FetchError::Timeout(_)) => "timeout",
        };
        self.metrics.record_fetch(descriptor.metric_name, outcome);
        self.metrics
            .record_fetch_duration(descriptor.metric_name, started.elapsed().as_secs_f64());
        result
    }

    /// Turns a parsed response into samples, dropping inconsistent series.
    fn translate(
        &self,
        entity: &str,
        descriptor: &'static MetricDescriptor,
        response: &MetricResponse,
        reference: Option<DateBucket>,
    ) -> Vec<Sample> {
        let mut samples = Vec::new();
        let mut seen = HashSet::new();
        for series in &response.series {
            if !seen.insert(series.name.as_str()) {
                self.metrics.record_dropped_series(descriptor.metric_name);
                warn!(
                    event_name = "collector.series.duplicate",
                    event_domain = "collector",
                    entity,
                    metric_name = descriptor.metric_name,
                    series = %series.name,
                    "dropping repeated series name"
                );
                continue;
            }
            let points = match series.aligned(&response.buckets) {
                Ok(points) => points,
                Err(e) => {
                    self.metrics.record_dropped_series(descriptor.metric_name);
                    warn!(
                        event_name = "collector.series.dropped",
                        event_domain = "collector",
                        entity,
                        metric_name = descriptor.metric_name,
                        error = %e,
                        "dropping inconsistent series"
                    );
                    continue;
                }
            };

            let mut labels = BTreeMap::new();
            labels.insert(descriptor.dimension_label.to_string(), series.name.clone());
            if let Some(entity_label) = &self.schema.entity_label {
                labels.insert(entity_label.clone(), entity.to_string());
            }

            samples.extend(
                points
                    .filter(|(bucket, _)| reference.map_or(true, |r| r == *bucket))
                    .map(|(bucket, value)| Sample {
                        descriptor,
                        labels: labels.clone(),
                        value: value as f64,
                        timestamp: bucket,
                    }),
            );
        }
        debug!(
            "Translated {} samples for {} / {}",
            samples.len(),
            entity,
            descriptor.metric_name
        );
        samples
    }
}
