use std::collections::BTreeMap;

use super::date::DateBucket;
use crate::metrics::MetricDescriptor;

/// A single labelled, timestamped observation produced during one scrape.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub descriptor: &'static MetricDescriptor,
    /// Label name -> label value, kept sorted for exposition.
    pub labels: BTreeMap<String, String>,
    pub value: f64,
    pub timestamp: DateBucket,
}

impl Sample {
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels.get(name).map(String::as_str)
    }
}
