//! Per-deployment policies applied by the collector.

use chrono::{Days, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::metrics::LabelSchema;
use crate::models::DateBucket;

/// What a failed `(entity, metric)` pair does to the rest of the scrape.
#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Log the failure and keep collecting the other pairs.
    #[default]
    Skip,
    /// Abort the scrape on the first failure. Meant for startup checks.
    FailFast,
}

fn default_lag_days() -> u32 {
    1
}

/// Which buckets of the returned history are turned into samples.
#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum StalenessFilter {
    /// Emit every bucket the provider returns.
    #[default]
    All,
    /// Emit only the bucket `lag_days` before the scrape date.
    LatestOnly {
        #[serde(default = "default_lag_days")]
        lag_days: u32,
    },
}

impl StalenessFilter {
    /// The only bucket to emit for a scrape happening on `today`, if any.
    pub fn reference_date(&self, today: NaiveDate) -> Option<DateBucket> {
        match self {
            StalenessFilter::All => None,
            StalenessFilter::LatestOnly { lag_days } => today
                .checked_sub_days(Days::new(u64::from(*lag_days)))
                .map(DateBucket::new),
        }
    }
}

#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EntityLabelMode {
    /// Add the entity label only when more than one entity is tracked.
    #[default]
    Auto,
    Always,
    Never,
}

fn default_entity_label_name() -> String {
    "entity".to_string()
}

/// How the tracked entity shows up in the label set.
#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone, PartialEq, Eq)]
pub struct EntityLabelConfig {
    #[serde(default = "default_entity_label_name")]
    pub name: String,
    #[serde(default)]
    pub mode: EntityLabelMode,
}

impl Default for EntityLabelConfig {
    fn default() -> Self {
        EntityLabelConfig {
            name: default_entity_label_name(),
            mode: EntityLabelMode::default(),
        }
    }
}

impl EntityLabelConfig {
    pub fn schema(&self, entity_count: usize) -> LabelSchema {
        let include = match self.mode {
            EntityLabelMode::Always => true,
            EntityLabelMode::Never => false,
            EntityLabelMode::Auto => entity_count > 1,
        };
        LabelSchema::new(include.then(|| self.name.clone()))
    }
}
