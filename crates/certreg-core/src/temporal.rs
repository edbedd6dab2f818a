//! # Temporal Types: UTC-Only Timestamps
//!
//! `Timestamp` is a UTC instant truncated to seconds, serialized as
//! `YYYY-MM-DDTHH:MM:SSZ`. Issuance and revocation times are recorded with
//! it so that every persisted record renders identically regardless of the
//! host timezone.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A UTC-only timestamp, truncated to seconds precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Current UTC time, truncated to seconds.
    pub fn now() -> Self {
        Self(truncate_to_seconds(Utc::now()))
    }

    /// From a `DateTime<Utc>`, truncating sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt))
    }

    /// Parse a strict RFC 3339 timestamp with `Z` suffix.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        if !s.ends_with('Z') {
            return Err(ValidationError::InvalidTimestamp(format!(
                "timestamp must use Z suffix (UTC only), got: {s:?}"
            )));
        }
        Self::parse_lenient(s)
    }

    /// Parse an RFC 3339 timestamp with any offset, converting to UTC.
    ///
    /// Offset-less ISO 8601 strings (`2024-01-10T09:30:00.123456`) are
    /// interpreted as UTC.
    pub fn parse_lenient(s: &str) -> Result<Self, ValidationError> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))));
        }
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| Self(truncate_to_seconds(naive.and_utc())))
            .map_err(|e| ValidationError::InvalidTimestamp(format!("{s:?}: {e}")))
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Calendar date (UTC) of this instant.
    pub fn date(&self) -> NaiveDate {
        self.0.date_naive()
    }

    /// ISO 8601 form with `Z` suffix.
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

impl TryFrom<String> for Timestamp {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse_lenient(&value)
    }
}

impl From<Timestamp> for String {
    fn from(ts: Timestamp) -> Self {
        ts.to_iso8601()
    }
}

fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_has_no_subseconds() {
        let ts = Timestamp::now();
        assert_eq!(ts.as_datetime().nanosecond(), 0);
    }

    #[test]
    fn strict_parse_requires_z() {
        assert!(Timestamp::parse("2024-01-10T09:30:00Z").is_ok());
        assert!(Timestamp::parse("2024-01-10T09:30:00+00:00").is_err());
    }

    #[test]
    fn lenient_parse_converts_offsets() {
        let ts = Timestamp::parse_lenient("2024-01-10T14:30:00+05:00").unwrap();
        assert_eq!(ts.to_iso8601(), "2024-01-10T09:30:00Z");
    }

    #[test]
    fn lenient_parse_accepts_naive_iso() {
        let ts = Timestamp::parse_lenient("2024-01-10T09:30:00.654321").unwrap();
        assert_eq!(ts.to_iso8601(), "2024-01-10T09:30:00Z");
    }

    #[test]
    fn lenient_parse_rejects_garbage() {
        assert!(matches!(
            Timestamp::parse_lenient("yesterday"),
            Err(ValidationError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn serde_uses_iso_string() {
        let ts = Timestamp::parse("2024-01-10T09:30:00Z").unwrap();
        let json = serde_json::to_string(&ts).unwrap();
        assert_eq!(json, "\"2024-01-10T09:30:00Z\"");
        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ts);
    }

    #[test]
    fn date_is_utc_calendar_day() {
        let ts = Timestamp::parse("2024-01-10T23:59:59Z").unwrap();
        assert_eq!(ts.date(), NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
    }
}
