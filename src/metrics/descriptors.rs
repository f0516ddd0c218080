//! The fixed table of snap metrics the exporter knows how to translate.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::errors::RegistryError;

/// Exposition metadata for one provider metric name.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct MetricDescriptor {
    /// Name used when requesting the metric from the provider.
    pub metric_name: &'static str,
    /// Prometheus metric name.
    pub exported_id: &'static str,
    pub help_text: &'static str,
    /// Label carrying the series name (channel, country, ...).
    pub dimension_label: &'static str,
}

macro_rules! descriptor {
    ($metric_name:literal, $exported_id:literal, $label:literal, $meaning:literal) => {
        MetricDescriptor {
            metric_name: $metric_name,
            exported_id: $exported_id,
            help_text: concat!(
                "Exported from https://snapcraft.io/docs/snapcraft-metrics. ",
                $metric_name,
                ": ",
                $meaning
            ),
            dimension_label: $label,
        }
    };
}

static DESCRIPTORS: [MetricDescriptor; 10] = [
    descriptor!(
        "daily_device_change",
        "snapcraft_device_change_daily",
        "change",
        "number of new, continued and lost devices with the snap installed compared to the previous day."
    ),
    descriptor!(
        "weekly_device_change",
        "snapcraft_device_change_weekly",
        "change",
        "number of new, continued and lost devices with the snap installed over a 7 day window compared to the previous one."
    ),
    descriptor!(
        "installed_base_by_channel",
        "snapcraft_install_base_by_channel_daily",
        "channel",
        "number of devices with the snap installed, per channel."
    ),
    descriptor!(
        "installed_base_by_country",
        "snapcraft_install_base_by_country_daily",
        "country",
        "number of devices with the snap installed, per country."
    ),
    descriptor!(
        "installed_base_by_operating_system",
        "snapcraft_install_base_by_system_daily",
        "system",
        "number of devices with the snap installed, per operating system."
    ),
    descriptor!(
        "installed_base_by_version",
        "snapcraft_install_base_by_version_daily",
        "version",
        "number of devices with the snap installed, per snap version."
    ),
    descriptor!(
        "weekly_installed_base_by_channel",
        "snapcraft_install_base_by_channel_weekly",
        "channel",
        "number of devices with the snap installed over a 7 day window, per channel."
    ),
    descriptor!(
        "weekly_installed_base_by_country",
        "snapcraft_install_base_by_country_weekly",
        "country",
        "number of devices with the snap installed over a 7 day window, per country."
    ),
    descriptor!(
        "weekly_installed_base_by_operating_system",
        "snapcraft_install_base_by_system_weekly",
        "system",
        "number of devices with the snap installed over a 7 day window, per operating system."
    ),
    descriptor!(
        "weekly_installed_base_by_version",
        "snapcraft_install_base_by_version_weekly",
        "version",
        "number of devices with the snap installed over a 7 day window, per snap version."
    ),
];

static BY_NAME: OnceLock<HashMap<&'static str, &'static MetricDescriptor>> = OnceLock::new();

fn by_name() -> &'static HashMap<&'static str, &'static MetricDescriptor> {
    BY_NAME.get_or_init(|| DESCRIPTORS.iter().map(|d| (d.metric_name, d)).collect())
}

/// Every known descriptor, in a stable order.
pub fn all() -> &'static [MetricDescriptor] {
    &DESCRIPTORS
}

/// Every provider metric name the exporter requests on a scrape.
pub fn metric_names() -> impl Iterator<Item = &'static str> {
    DESCRIPTORS.iter().map(|d| d.metric_name)
}

pub fn lookup(metric_name: &str) -> Result<&'static MetricDescriptor, RegistryError> {
    by_name()
        .get(metric_name)
        .copied()
        .ok_or_else(|| RegistryError::UnknownMetric(metric_name.to_string()))
}

/// The label names attached to every sample, decided once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSchema {
    /// Label carrying the entity identifier, if the deployment exposes one.
    pub entity_label: Option<String>,
}

impl LabelSchema {
    pub fn new(entity_label: Option<String>) -> Self {
        LabelSchema { entity_label }
    }

    pub fn label_names<'a>(&'a self, descriptor: &'a MetricDescriptor) -> Vec<&'a str> {
        let mut names = vec![descriptor.dimension_label];
        if let Some(entity_label) = &self.entity_label {
            names.push(entity_label.as_str());
        }
        names
    }
}
