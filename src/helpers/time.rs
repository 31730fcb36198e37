use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serializer;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::time::Instant;

/// Source of wall-clock time in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;

    fn now_unix(&self) -> i64 {
        self.now_millis().div_euclid(1000)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        now_millis()
    }
}

/// Clock that only moves when told to. Used to drive token expiry in tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    pub fn new(millis: i64) -> Self {
        Self { millis: AtomicI64::new(millis) }
    }

    pub fn set_millis(&self, millis: i64) {
        self.millis.store(millis, Ordering::SeqCst);
    }

    pub fn advance_secs(&self, secs: i64) {
        self.millis.fetch_add(secs * 1000, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn get_instant() -> Instant {
    Instant::now()
}

/// `YYYY-MM-DD` of the UTC day containing `millis`.
pub fn utc_day(millis: i64) -> String {
    utc_from_millis(millis).format("%Y-%m-%d").to_string()
}

pub fn utc_from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}

/// Renders like `2024-05-01T08:30:00.000Z`.
pub fn to_iso_millis(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn serialize_iso_millis<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&to_iso_millis(value))
}

/// Accepts RFC 2822 (RSS `pubDate`) and RFC 3339 timestamps.
pub fn parse_feed_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|date_time| date_time.with_timezone(&Utc))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn manual_clock_moves_only_when_advanced() {
        let clock = ManualClock::new(1_700_000_000_999);
        assert_eq!(clock.now_unix(), 1_700_000_000);
        clock.advance_secs(10);
        assert_eq!(clock.now_unix(), 1_700_000_010);
    }

    #[test]
    fn feed_dates_in_both_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        assert_eq!(parse_feed_date("Fri, 01 Mar 2024 10:00:00 GMT"), Some(expected));
        assert_eq!(parse_feed_date("Fri, 01 Mar 2024 12:00:00 +0200"), Some(expected));
        assert_eq!(parse_feed_date("2024-03-01T10:00:00Z"), Some(expected));
        assert_eq!(parse_feed_date("yesterday"), None);
    }

    #[test]
    fn utc_day_follows_the_given_instant() {
        assert_eq!(utc_day(1_714_552_200_000), "2024-05-01");
        assert_eq!(utc_day(1_714_607_999_999), "2024-05-01");
        assert_eq!(utc_day(1_714_608_000_000), "2024-05-02");
    }

    #[test]
    fn iso_rendering_keeps_millis() {
        let value = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        assert_eq!(to_iso_millis(&value), "2024-03-01T10:00:00.000Z");
    }
}
