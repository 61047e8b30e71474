//! Timestamp and identifier helpers.
//!
//! Stored timestamps are fixed-width UTC RFC 3339 strings so that lexical
//! ordering in SQL matches chronological ordering.

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

pub fn now_rfc3339() -> String {
    to_rfc3339(Utc::now())
}

pub fn to_rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Client-generated identifier for rows created on the device.
pub fn new_local_id() -> String {
    Uuid::new_v4().to_string()
}
