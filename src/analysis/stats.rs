//! Descriptive statistics over packet sizes and inter-arrival times.
//!
//! Both summaries use the population standard deviation (divisor `count`).
//! Empty input gives an all-zero summary.

use chrono::Duration;

/// Summary of a sequence of integer values
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IntStats {
    pub count: usize,
    pub sum: usize,
    pub mean: f64,
    pub min: usize,
    pub max: usize,
    pub std: f64,
}

/// Summary of a sequence of signed time intervals
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationStats {
    pub count: usize,
    pub sum: Duration,
    pub mean: Duration,
    pub min: Duration,
    pub max: Duration,
    pub std: Duration,
}

impl Default for DurationStats {
    fn default() -> Self {
        Self {
            count: 0,
            sum: Duration::zero(),
            mean: Duration::zero(),
            min: Duration::zero(),
            max: Duration::zero(),
            std: Duration::zero(),
        }
    }
}

pub fn summarize_integers(xs: &[usize]) -> IntStats {
    let (first, _) = match xs.split_first() {
        Some(split) => split,
        None => return IntStats::default(),
    };

    let mut stats = IntStats {
        count: xs.len(),
        min: *first,
        max: *first,
        ..IntStats::default()
    };

    for &x in xs {
        stats.sum += x;
        stats.min = stats.min.min(x);
        stats.max = stats.max.max(x);
    }
    stats.mean = stats.sum as f64 / stats.count as f64;

    let sum_squares: f64 = xs
        .iter()
        .map(|&x| {
            let diff = x as f64 - stats.mean;
            diff * diff
        })
        .sum();
    stats.std = (sum_squares / stats.count as f64).sqrt();

    stats
}

/// Like [`summarize_integers`] but over nanosecond intervals.
///
/// The mean is the total divided by the count in integer nanoseconds,
/// truncated toward zero, and the deviation is taken against that truncated
/// mean. The standard deviation is truncated to whole nanoseconds.
pub fn summarize_durations(ds: &[Duration]) -> DurationStats {
    let (first, _) = match ds.split_first() {
        Some(split) => split,
        None => return DurationStats::default(),
    };

    let mut stats = DurationStats {
        count: ds.len(),
        min: *first,
        max: *first,
        ..DurationStats::default()
    };

    let mut sum_nanos: i64 = 0;
    for &d in ds {
        sum_nanos = sum_nanos.saturating_add(nanos(d));
        stats.min = stats.min.min(d);
        stats.max = stats.max.max(d);
    }
    stats.sum = Duration::nanoseconds(sum_nanos);

    let mean_nanos = sum_nanos / stats.count as i64;
    stats.mean = Duration::nanoseconds(mean_nanos);

    let sum_squares: f64 = ds
        .iter()
        .map(|&d| {
            let diff = (nanos(d) - mean_nanos) as f64;
            diff * diff
        })
        .sum();
    let variance = sum_squares / stats.count as f64;
    stats.std = Duration::nanoseconds(variance.sqrt() as i64);

    stats
}

/// Whole nanoseconds in `d`, saturating past roughly 292 years
pub(crate) fn nanos(d: Duration) -> i64 {
    d.num_nanoseconds()
        .unwrap_or(if d < Duration::zero() { i64::MIN } else { i64::MAX })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_is_all_zero() {
        assert_eq!(summarize_integers(&[]), IntStats::default());
        let stats = summarize_durations(&[]);
        assert_eq!(stats.count, 0);
        assert_eq!(stats.sum, Duration::zero());
        assert_eq!(stats.mean, Duration::zero());
        assert_eq!(stats.min, Duration::zero());
        assert_eq!(stats.max, Duration::zero());
        assert_eq!(stats.std, Duration::zero());
    }

    #[test]
    fn test_summarize_integers() {
        let stats = summarize_integers(&[100, 150, 120]);
        assert_eq!(stats.count, 3);
        assert_eq!(stats.sum, 370);
        assert_eq!(stats.min, 100);
        assert_eq!(stats.max, 150);
        assert!((stats.mean - 123.333_333).abs() < 1e-4);
        // sqrt(((100-m)^2 + (150-m)^2 + (120-m)^2) / 3)
        assert!((stats.std - 20.548_046).abs() < 1e-4);
    }

    #[test]
    fn test_integer_mean_and_bounds() {
        let xs = [7, 3, 1500, 64, 64, 9000, 0];
        let stats = summarize_integers(&xs);
        assert!((stats.mean * stats.count as f64 - stats.sum as f64).abs() < 1e-9);
        assert!(xs.iter().all(|&x| stats.min <= x && x <= stats.max));
        assert_eq!(stats.min, 0);
        assert_eq!(stats.max, 9000);
    }

    #[test]
    fn test_single_value_has_zero_spread() {
        let stats = summarize_integers(&[42]);
        assert_eq!(stats.mean, 42.0);
        assert_eq!(stats.std, 0.0);
    }

    #[test]
    fn test_summarize_durations() {
        let stats = summarize_durations(&[Duration::milliseconds(10), Duration::milliseconds(15)]);
        assert_eq!(stats.count, 2);
        assert_eq!(stats.sum, Duration::milliseconds(25));
        assert_eq!(stats.mean, Duration::microseconds(12_500));
        assert_eq!(stats.min, Duration::milliseconds(10));
        assert_eq!(stats.max, Duration::milliseconds(15));
        assert_eq!(stats.std, Duration::microseconds(2_500));
    }

    #[test]
    fn test_duration_mean_truncates() {
        // 10ns / 3 = 3.33ns -> 3ns
        let ds = [Duration::nanoseconds(5), Duration::nanoseconds(1), Duration::nanoseconds(4)];
        let stats = summarize_durations(&ds);
        assert_eq!(stats.mean, Duration::nanoseconds(3));
        // deviations 2, -2, 1 -> (4 + 4 + 1) / 3 = 3 -> sqrt(3) = 1.73 -> 1ns
        assert_eq!(stats.std, Duration::nanoseconds(1));

        let negative = [Duration::nanoseconds(-5), Duration::nanoseconds(-2)];
        assert_eq!(summarize_durations(&negative).mean, Duration::nanoseconds(-3));
    }

    #[test]
    fn test_negative_intervals_are_kept() {
        let stats = summarize_durations(&[Duration::milliseconds(-30), Duration::milliseconds(10)]);
        assert_eq!(stats.min, Duration::milliseconds(-30));
        assert_eq!(stats.sum, Duration::milliseconds(-20));
        assert_eq!(stats.mean, Duration::milliseconds(-10));
        assert_eq!(stats.std, Duration::milliseconds(20));
    }
}
