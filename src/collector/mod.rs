pub mod collector;
pub mod policy;

// Re-export from collector.rs so we can do "use crate::collector::*;"
pub use collector::{Collector, CollectorSettings};
pub use policy::{EntityLabelConfig, EntityLabelMode, FailurePolicy, StalenessFilter};
