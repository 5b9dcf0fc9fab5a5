use chrono::Duration;

use crate::analysis::stats::{nanos, summarize_durations, summarize_integers, DurationStats, IntStats};
use crate::flow::Flow;

/// Column names of the feature vector, in vector order.
///
/// The model parameters are trained against this exact order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "Duration_ms",
    "PacketCount",
    "PktCount",
    "PktSum",
    "PktMean",
    "PktMin",
    "PktMax",
    "PktStd",
    "IATCount",
    "IATSum_ms",
    "IATMean_ms",
    "IATMin_ms",
    "IATMax_ms",
    "IATStd_ms",
];

pub const FEATURE_COUNT: usize = 14;

/// Behavioural summary of one flow
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowFeatures {
    pub duration: Duration,
    pub packet_count: usize,
    pub packet_stats: IntStats,
    pub iat_stats: DurationStats,
}

/// Summarize a finished flow
pub fn extract(flow: &Flow) -> FlowFeatures {
    FlowFeatures {
        duration: flow.last_seen.signed_duration_since(flow.first_seen),
        packet_count: flow.packet_count,
        packet_stats: summarize_integers(&flow.packet_sizes),
        iat_stats: summarize_durations(&flow.iats),
    }
}

impl FlowFeatures {
    /// Raw feature values in [`FEATURE_NAMES`] order, times in milliseconds
    pub fn to_vector(&self) -> [f64; FEATURE_COUNT] {
        let pkt = &self.packet_stats;
        let iat = &self.iat_stats;
        [
            millis(self.duration),
            self.packet_count as f64,
            pkt.count as f64,
            pkt.sum as f64,
            pkt.mean,
            pkt.min as f64,
            pkt.max as f64,
            pkt.std,
            iat.count as f64,
            millis(iat.sum),
            millis(iat.mean),
            millis(iat.min),
            millis(iat.max),
            millis(iat.std),
        ]
    }
}

/// Signed duration in fractional milliseconds
pub fn millis(d: Duration) -> f64 {
    nanos(d) as f64 / 1_000_000.0
}
