pub mod features;
pub mod pipeline;
pub mod stats;

pub use features::{extract, millis, FlowFeatures, FEATURE_COUNT, FEATURE_NAMES};
pub use pipeline::{score_flows, FlowRecord};
pub use stats::{summarize_durations, summarize_integers, DurationStats, IntStats};
