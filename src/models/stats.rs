use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Counters for one capture session
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CaptureStats {
    /// Frames read from the capture handle
    pub total_packets: usize,

    /// Bytes read from the capture handle
    pub total_bytes: usize,

    /// Frames handed to the flow table
    pub ingested_packets: usize,

    /// Failed reads from the capture handle
    pub errors: usize,

    /// Capture start time
    pub start_time: Option<DateTime<Utc>>,

    /// Capture end time
    pub end_time: Option<DateTime<Utc>>,
}

impl CaptureStats {
    /// Packets per second over the session, zero while the session is open
    pub fn packet_rate(&self) -> f64 {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => {
                let elapsed_secs = end.signed_duration_since(start).num_milliseconds() as f64 / 1000.0;
                if elapsed_secs > 0.0 {
                    self.total_packets as f64 / elapsed_secs
                } else {
                    0.0
                }
            }
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_packet_rate() {
        let mut stats = CaptureStats::default();
        assert_eq!(stats.packet_rate(), 0.0);

        stats.total_packets = 50;
        stats.start_time = Some(Utc.timestamp_opt(100, 0).unwrap());
        stats.end_time = Some(Utc.timestamp_opt(110, 0).unwrap());
        assert!((stats.packet_rate() - 5.0).abs() < 1e-9);
    }
}
