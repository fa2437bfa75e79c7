//! # Temporal Types: UTC-Only Logical Timestamps
//!
//! Defines `Timestamp`, a UTC-only timestamp truncated to seconds precision.
//!
//! The engine never reads the wall clock on its own: every mutating call
//! carries the logical "now" chosen by the host, and every deadline in the
//! lending domain (90-day dispute window, 365-day decay period, grace
//! period, liquidation threshold) is an ordinary comparison between two
//! `Timestamp` values.
//!
//! Non-UTC inputs are **rejected at construction** by [`Timestamp::parse()`].
//! Serialized form is `YYYY-MM-DDTHH:MM:SSZ`, which keeps canonical byte
//! sequences deterministic for signed payloads.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Seconds in one calendar day.
pub const SECONDS_PER_DAY: i64 = 86_400;

const MAX_SHIFT_SECS: i64 = i64::MAX / 1_000;

/// A UTC-only timestamp, truncated to seconds precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp from a `chrono::DateTime<Utc>`, truncating sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt))
    }

    /// Parse a timestamp from an RFC 3339 string.
    ///
    /// **Rejects non-UTC inputs.** Only the `Z` suffix is accepted; even
    /// `+00:00` is refused so that canonical bytes stay deterministic.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        if !s.ends_with('Z') {
            return Err(CoreError::Validation(format!(
                "timestamp must use Z suffix (UTC only), got: {s:?}"
            )));
        }
        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|e| CoreError::Validation(format!("invalid RFC 3339 timestamp {s:?}: {e}")))?;
        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    /// Create a timestamp from a Unix epoch timestamp (seconds).
    pub fn from_epoch_secs(secs: i64) -> Result<Self, CoreError> {
        let dt = DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| CoreError::Validation(format!("invalid Unix timestamp: {secs}")))?;
        Ok(Self(dt))
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Returns the Unix epoch timestamp in seconds.
    pub fn epoch_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// This instant shifted by `secs` seconds. Saturates at the
    /// representable range instead of failing.
    pub fn plus_secs(&self, secs: i64) -> Self {
        // chrono::Duration panics beyond ±i64::MAX milliseconds.
        let secs = secs.clamp(-MAX_SHIFT_SECS, MAX_SHIFT_SECS);
        let shifted = self
            .0
            .checked_add_signed(chrono::Duration::seconds(secs))
            .unwrap_or(if secs >= 0 {
                DateTime::<Utc>::MAX_UTC
            } else {
                DateTime::<Utc>::MIN_UTC
            });
        Self(truncate_to_seconds(shifted))
    }

    /// This instant shifted by whole days.
    pub fn plus_days(&self, days: u32) -> Self {
        self.plus_secs(i64::from(days) * SECONDS_PER_DAY)
    }

    /// Whole days elapsed from `earlier` to `self`, floored. Zero when
    /// `earlier` is not before `self`.
    pub fn whole_days_since(&self, earlier: &Timestamp) -> u64 {
        let delta = self.epoch_secs() - earlier.epoch_secs();
        if delta <= 0 {
            0
        } else {
            (delta / SECONDS_PER_DAY) as u64
        }
    }

    /// Index of the UTC calendar day containing this instant.
    pub fn utc_day(&self) -> i64 {
        self.epoch_secs().div_euclid(SECONDS_PER_DAY)
    }

    /// Render as ISO8601 with Z suffix (e.g., `2026-01-15T12:00:00Z`).
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}
