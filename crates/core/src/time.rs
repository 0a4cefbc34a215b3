//! Timestamp (de)serialization for the persisted stores.
//!
//! Timestamps are written as RFC 3339. On read, naive ISO-8601 timestamps
//! without an offset (as written by older tooling) are accepted and taken to
//! be UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serializer};
use crate::Time;

/// Parse an RFC 3339 or offset-less ISO-8601 timestamp.
pub fn parse_timestamp(raw: &str) -> Result<Time, chrono::ParseError> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(t) => Ok(t.with_timezone(&Utc)),
        Err(_) => raw.parse::<NaiveDateTime>().map(|naive| naive.and_utc()),
    }
}

/// Latest timestamp that still has a four-digit year, and so survives a
/// write and re-read.
pub fn latest_storable() -> Time {
    NaiveDate::from_ymd_opt(9999, 12, 31)
        .and_then(|d| d.and_hms_opt(23, 59, 59))
        .map(|naive| naive.and_utc())
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn invalid<E: de::Error>(raw: &str, err: chrono::ParseError) -> E {
    E::custom(format!("invalid timestamp {raw:?}: {err}"))
}

/// Serde adapter for `Time` fields.
pub mod iso8601 {
    use super::*;

    /// Serialize as RFC 3339.
    pub fn serialize<S: Serializer>(time: &Time, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.to_rfc3339())
    }

    /// Deserialize from RFC 3339 or naive ISO-8601.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Time, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw).map_err(|e| invalid(&raw, e))
    }

    /// Serde adapter for `Option<Time>` fields (`null` when absent).
    pub mod option {
        use super::*;

        /// Serialize as RFC 3339 or `null`.
        pub fn serialize<S: Serializer>(
            time: &Option<Time>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match time {
                Some(t) => serializer.serialize_some(&t.to_rfc3339()),
                None => serializer.serialize_none(),
            }
        }

        /// Deserialize from RFC 3339, naive ISO-8601, or `null`.
        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Time>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) => parse_timestamp(&raw).map(Some).map_err(|e| invalid(&raw, e)),
                None => Ok(None),
            }
        }
    }
}
