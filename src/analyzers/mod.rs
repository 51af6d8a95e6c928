//! Aggregations over scored responses.

pub mod confidence;
pub mod distribution;
pub mod segment;

pub use confidence::{ConfidenceGuard, Severity, Warning};
pub use distribution::DistributionAggregator;
pub use segment::{SegmentAggregator, SegmentKey};
