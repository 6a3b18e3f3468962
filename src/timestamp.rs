use crate::error::{CloudsubError, Result};

const MS_PER_HOUR: u64 = 3_600_000;
const MS_PER_MINUTE: u64 = 60_000;
const MS_PER_SECOND: u64 = 1_000;

/// Format time in seconds to SRT time format (HH:MM:SS,mmm)
///
/// The value is rounded to the nearest millisecond. Hours are padded to two
/// digits and grow past 99 when needed.
pub fn format_timestamp(seconds: f64) -> Result<String> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(CloudsubError::InvalidDuration(format!(
            "expected a non-negative number of seconds, got {}",
            seconds
        )));
    }

    let rounded = (seconds * 1000.0).round();
    if rounded >= u64::MAX as f64 {
        return Err(CloudsubError::InvalidDuration(format!(
            "{} seconds is too large for a subtitle timestamp",
            seconds
        )));
    }
    let total_milliseconds = rounded as u64;
    let hours = total_milliseconds / MS_PER_HOUR;
    let minutes = (total_milliseconds % MS_PER_HOUR) / MS_PER_MINUTE;
    let secs = (total_milliseconds % MS_PER_MINUTE) / MS_PER_SECOND;
    let millis = total_milliseconds % MS_PER_SECOND;

    Ok(format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis))
}

/// Parse an SRT timestamp (HH:MM:SS,mmm) back into seconds
pub fn parse_timestamp(timestamp: &str) -> Result<f64> {
    let invalid = || CloudsubError::InvalidTimestamp(timestamp.to_string());

    let (clock, millis) = timestamp.split_once(',').ok_or_else(invalid)?;
    let mut fields = clock.split(':');
    let (Some(hours), Some(minutes), Some(secs), None) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Err(invalid());
    };

    if hours.len() < 2 || minutes.len() != 2 || secs.len() != 2 || millis.len() != 3 {
        return Err(invalid());
    }

    let number = |field: &str| -> Result<u64> {
        if !field.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        field.parse::<u64>().map_err(|_| invalid())
    };

    let (hours, minutes, secs, millis) =
        (number(hours)?, number(minutes)?, number(secs)?, number(millis)?);
    if minutes >= 60 || secs >= 60 {
        return Err(invalid());
    }

    let total_milliseconds = hours
        .checked_mul(MS_PER_HOUR)
        .and_then(|ms| ms.checked_add(minutes * MS_PER_MINUTE + secs * MS_PER_SECOND + millis))
        .ok_or_else(invalid)?;
    Ok(total_milliseconds as f64 / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_srt_clock(text: &str) -> bool {
        let bytes = text.as_bytes();
        let n = bytes.len();
        n >= 12
            && bytes[n - 4] == b','
            && bytes[n - 7] == b':'
            && bytes[n - 10] == b':'
            && bytes
                .iter()
                .enumerate()
                .all(|(i, b)| i == n - 4 || i == n - 7 || i == n - 10 || b.is_ascii_digit())
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0).unwrap(), "00:00:00,000");
        assert_eq!(format_timestamp(1.5).unwrap(), "00:00:01,500");
        assert_eq!(format_timestamp(65.123).unwrap(), "00:01:05,123");
        assert_eq!(format_timestamp(3661.500).unwrap(), "01:01:01,500");
    }

    #[test]
    fn test_format_rounds_to_nearest_millisecond() {
        assert_eq!(format_timestamp(0.0004).unwrap(), "00:00:00,000");
        assert_eq!(format_timestamp(0.0006).unwrap(), "00:00:00,001");
        assert_eq!(format_timestamp(59.9996).unwrap(), "00:01:00,000");
    }

    #[test]
    fn test_format_hours_beyond_two_digits() {
        assert_eq!(format_timestamp(100.0 * 3600.0).unwrap(), "100:00:00,000");
        assert_eq!(format_timestamp(5.0 * 3600.0 + 7.25).unwrap(), "05:00:07,250");
    }

    #[test]
    fn test_format_rejects_negative_and_non_finite() {
        assert!(matches!(format_timestamp(-1.0), Err(CloudsubError::InvalidDuration(_))));
        assert!(matches!(format_timestamp(-0.001), Err(CloudsubError::InvalidDuration(_))));
        assert!(matches!(format_timestamp(f64::NAN), Err(CloudsubError::InvalidDuration(_))));
        assert!(matches!(format_timestamp(f64::INFINITY), Err(CloudsubError::InvalidDuration(_))));
    }

    #[test]
    fn test_format_rejects_values_beyond_millisecond_range() {
        assert!(matches!(format_timestamp(1e17), Err(CloudsubError::InvalidDuration(_))));
        assert!(matches!(format_timestamp(1.9e16), Err(CloudsubError::InvalidDuration(_))));
        // Large values below the limit still format exactly
        let formatted = format_timestamp(1e15).unwrap();
        assert_eq!(parse_timestamp(&formatted).unwrap(), 1e15);
    }

    #[test]
    fn test_parse_rejects_overflowing_hours() {
        for huge in ["99999999999999:00:00,000", "5124095576030:59:59,999", "18446744073709551615:00:00,000"] {
            assert!(
                matches!(parse_timestamp(huge), Err(CloudsubError::InvalidTimestamp(_))),
                "accepted {:?}",
                huge
            );
        }
        assert_eq!(parse_timestamp("5124095576:00:00,000").unwrap(), 5124095576.0 * 3600.0);
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("00:00:01,500").unwrap(), 1.5);
        assert_eq!(parse_timestamp("01:01:01,500").unwrap(), 3661.5);
        assert_eq!(parse_timestamp("123:00:00,001").unwrap(), 442_800.001);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["", "00:00:01.500", "00:01,500", "0:00:01,500", "00:60:00,000", "00:00:0a,000", "00:00:00,00", "00:00:00:00,000"] {
            assert!(
                matches!(parse_timestamp(bad), Err(CloudsubError::InvalidTimestamp(_))),
                "accepted {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_round_trip_within_a_millisecond() {
        let samples = [0.0, 0.001, 0.4994, 1.5, 2.0, 59.999, 61.2345, 3599.9994, 3600.0, 86_399.5, 360_000.75];
        for seconds in samples {
            let formatted = format_timestamp(seconds).unwrap();
            assert!(is_srt_clock(&formatted), "bad shape: {}", formatted);
            let parsed = parse_timestamp(&formatted).unwrap();
            assert!((parsed - seconds).abs() <= 0.0005 + 1e-9, "{} -> {} -> {}", seconds, formatted, parsed);
        }
    }
}
