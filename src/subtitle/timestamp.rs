//! Clock rendering for subtitle timestamps (`HH:MM:SS,mmm`).

/// Absorbs binary representation error (`2.3 - 2.0 == 0.2999...`) before the
/// fractional second is truncated to whole milliseconds.
const MILLIS_EPSILON: f64 = 1e-6;

/// Render `seconds` as `HH:MM:SS,mmm`.
///
/// Negative (and NaN) inputs are floored to zero. Hours are not wrapped, and
/// the millisecond part is truncated rather than rounded.
pub fn format_timestamp(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let total_millis = (seconds * 1000.0 + MILLIS_EPSILON).floor() as u64;

    let millis = total_millis % 1000;
    let total_seconds = total_millis / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    format!("{hours:02}:{minutes:02}:{secs:02},{millis:03}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_input_is_floored_to_zero() {
        assert_eq!(format_timestamp(-5.0), "00:00:00,000");
        assert_eq!(format_timestamp(0.0), "00:00:00,000");
        assert_eq!(format_timestamp(f64::NAN), "00:00:00,000");
    }

    #[test]
    fn milliseconds_are_truncated() {
        assert_eq!(format_timestamp(1.0), "00:00:01,000");
        assert_eq!(format_timestamp(1.1), "00:00:01,100");
        assert_eq!(format_timestamp(1.9999), "00:00:01,999");
        assert_eq!(format_timestamp(2.3), "00:00:02,300");
    }

    #[test]
    fn tolerance_only_covers_representation_error() {
        // Within 1e-9 s of the next millisecond: counted as that millisecond
        assert_eq!(format_timestamp(1.9999999995), "00:00:02,000");
        // A real microsecond short still truncates
        assert_eq!(format_timestamp(1.999999), "00:00:01,999");
    }

    #[test]
    fn minutes_and_hours_roll_over() {
        assert_eq!(format_timestamp(59.5), "00:00:59,500");
        assert_eq!(format_timestamp(61.25), "00:01:01,250");
        assert_eq!(format_timestamp(3600.0), "01:00:00,000");
        assert_eq!(format_timestamp(3725.042), "01:02:05,042");
    }

    #[test]
    fn hours_are_unbounded() {
        assert_eq!(format_timestamp(100.0 * 3600.0 + 1.5), "100:00:01,500");
    }
}
