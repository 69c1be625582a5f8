//! Video timestamp utilities
//!
//! Audit records position claims in the source video with "MM:SS" strings.
//! These helpers convert between that form and an offset in whole seconds,
//! used when repositioning playback from a verdict row.

use crate::{Error, Result};

/// Parse a "MM:SS" video timestamp into an offset in seconds.
///
/// Strict two-field form: minutes and seconds both required, seconds < 60.
/// Minutes may exceed 59 for long recordings (e.g. "75:00").
///
/// # Examples
/// - `"00:00"` → 0
/// - `"01:10"` → 70
pub fn parse_timestamp(timestamp: &str) -> Result<u32> {
    let invalid = || {
        Error::InvalidInput(format!(
            "Invalid timestamp '{}' (expected MM:SS)",
            timestamp
        ))
    };

    let (minutes, seconds) = timestamp.split_once(':').ok_or_else(invalid)?;
    if minutes.is_empty() || seconds.len() != 2 {
        return Err(invalid());
    }

    let minutes: u32 = minutes.parse().map_err(|_| invalid())?;
    let seconds: u32 = seconds.parse().map_err(|_| invalid())?;
    if seconds >= 60 {
        return Err(invalid());
    }

    Ok(minutes * 60 + seconds)
}

/// Format an offset in seconds as a "MM:SS" timestamp.
pub fn format_timestamp(total_seconds: u32) -> String {
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_zero() {
        assert_eq!(parse_timestamp("00:00").unwrap(), 0);
    }

    #[test]
    fn test_parse_one_minute_ten() {
        // The seek contract: "01:10" must derive 70 seconds
        assert_eq!(parse_timestamp("01:10").unwrap(), 70);
    }

    #[test]
    fn test_parse_long_recording() {
        assert_eq!(parse_timestamp("75:30").unwrap(), 4530);
    }

    #[test]
    fn test_parse_rejects_overflow_seconds() {
        assert!(parse_timestamp("01:60").is_err());
        assert!(parse_timestamp("01:99").is_err());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(parse_timestamp("").is_err());
        assert!(parse_timestamp("0110").is_err());
        assert!(parse_timestamp(":10").is_err());
        assert!(parse_timestamp("01:").is_err());
        assert!(parse_timestamp("01:1").is_err());
        assert!(parse_timestamp("aa:bb").is_err());
        assert!(parse_timestamp("01:10:00").is_err());
        assert!(parse_timestamp("-1:10").is_err());
    }

    #[test]
    fn test_format_round_trip() {
        assert_eq!(format_timestamp(0), "00:00");
        assert_eq!(format_timestamp(70), "01:10");
        assert_eq!(format_timestamp(4530), "75:30");
        assert_eq!(parse_timestamp(&format_timestamp(70)).unwrap(), 70);
    }
}
