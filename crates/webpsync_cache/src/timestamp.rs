//! Lock file timestamp parsing.
//!
//! Timestamps are written as RFC 3339 in UTC. On read, ISO-8601 date-times
//! without an offset are also accepted and taken to be UTC, since lock files
//! written by older tools carry no offset.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{de, Deserialize, Deserializer};

/// Parses an RFC 3339 timestamp, falling back to an offset-less ISO-8601
/// date-time interpreted as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => Ok(dt.with_timezone(&Utc)),
        Err(rfc_err) => NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| Utc.from_utc_datetime(&naive))
            .map_err(|_| rfc_err),
    }
}

/// `deserialize_with` adapter for [`parse_timestamp`].
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(de::Error::custom)
}
