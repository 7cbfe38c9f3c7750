pub mod exporter;
pub mod sanitize;
pub mod set;

pub use exporter::TextfileExporter;
pub use sanitize::sanitize;
pub use set::{MetricPoint, MetricSet, NODE_LABEL};
