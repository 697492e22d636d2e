//! Shared parsing and formatting helpers.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

/// Parses a `YYYY-MM-DD` calendar date.
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{value}', expected YYYY-MM-DD"))
}

/// Parses a timestamp: RFC 3339, or a bare date taken as midnight UTC.
pub fn parse_datetime(value: &str) -> Result<DateTime<Utc>> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Ok(timestamp.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }
    bail!("invalid timestamp '{value}', expected RFC 3339 or YYYY-MM-DD")
}

/// Formats fractional hours as `Xh Ym`, rounding to whole minutes.
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "hour totals are small and clamped non-negative before casting"
)]
pub fn format_hours(hours: f64) -> String {
    let total_minutes = (hours.max(0.0) * 60.0).round() as u64;
    format!("{}h {}m", total_minutes / 60, total_minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_bare_dates_as_midnight_utc() {
        let parsed = parse_datetime("2025-01-06").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 1, 6, 0, 0, 0).unwrap());
    }

    #[test]
    fn parses_rfc3339_timestamps() {
        let parsed = parse_datetime("2025-01-06T09:30:00Z").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 1, 6, 9, 30, 0).unwrap());
    }

    #[test]
    fn rejects_garbage_timestamps() {
        assert!(parse_datetime("yesterday").is_err());
        assert!(parse_date("06/01/2025").is_err());
    }

    #[test]
    fn formats_hours_as_h_m() {
        assert_eq!(format_hours(0.0), "0h 0m");
        assert_eq!(format_hours(1.5), "1h 30m");
        assert_eq!(format_hours(184.0), "184h 0m");
        assert_eq!(format_hours(33.75), "33h 45m");
        assert_eq!(format_hours(-2.0), "0h 0m");
    }
}
