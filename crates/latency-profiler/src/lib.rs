//! Latency measurement for the tick-to-decision hot path.

pub mod histogram;

pub use histogram::{LatencyHistogram, LatencyReport, BUCKET_WIDTH_NS, NUM_BUCKETS};
