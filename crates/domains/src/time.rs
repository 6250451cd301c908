//! Calendar helpers for the backend's timezone (Japan Standard Time, UTC+9).

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeDelta, Utc};

const JST_OFFSET_SECS: i32 = 9 * 3600;

/// Format of every timestamp the backend emits, in JST.
pub const BACKEND_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn jst() -> FixedOffset {
    FixedOffset::east_opt(JST_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// The JST calendar date of an instant.
pub fn jst_date(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&jst()).date_naive()
}

/// The instant a JST calendar day begins.
pub fn start_of_jst_day(date: NaiveDate) -> DateTime<Utc> {
    let local_midnight = date.and_time(NaiveTime::MIN);
    let utc = local_midnight - TimeDelta::seconds(i64::from(JST_OFFSET_SECS));
    DateTime::from_naive_utc_and_offset(utc, Utc)
}

/// Parses a backend timestamp such as `2024-01-01 12:34:56` (JST).
pub fn parse_backend_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let local = NaiveDateTime::parse_from_str(raw.trim(), BACKEND_DATETIME_FORMAT).ok()?;
    let utc = local - TimeDelta::seconds(i64::from(JST_OFFSET_SECS));
    Some(DateTime::from_naive_utc_and_offset(utc, Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn jst_midnight_is_fifteen_hundred_utc_the_day_before() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(
            start_of_jst_day(date),
            Utc.with_ymd_and_hms(2023, 12, 31, 15, 0, 0).unwrap()
        );
    }

    #[test]
    fn backend_timestamps_are_read_as_jst() {
        let parsed = parse_backend_datetime("2024-01-01 09:00:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert!(parse_backend_datetime("yesterday").is_none());
    }
}
