pub mod date;
pub mod response;
pub mod sample;

pub use date::DateBucket;
pub use response::{MetricResponse, SeriesItem, parse_metric, parse_metrics};
pub use sample::Sample;
