//! General time utility functions

use chrono;

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

/// Period of a loop running at the given rate, or `None` if the rate isn't a positive number.
///
/// Units: seconds
pub fn rate_to_period_s(rate_hz: f64) -> Option<f64> {
    if rate_hz.is_finite() && rate_hz > 0.0 {
        Some(1.0 / rate_hz)
    } else {
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_duration_to_seconds() {
        assert_eq!(
            duration_to_seconds(chrono::Duration::milliseconds(1500)),
            Some(1.5)
        );
    }

    #[test]
    fn test_rate_to_period() {
        assert_eq!(rate_to_period_s(10.0), Some(0.1));
        assert_eq!(rate_to_period_s(0.0), None);
        assert_eq!(rate_to_period_s(-5.0), None);
        assert_eq!(rate_to_period_s(f64::NAN), None);
    }
}
