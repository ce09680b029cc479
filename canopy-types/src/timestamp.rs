//! Timestamps with a canonical, order-preserving string encoding.
//!
//! The encoding always uses UTC, a four digit year and exactly nine
//! fractional digits, so comparing two encoded strings byte by byte gives the
//! same answer as comparing the instants they denote. Only instants between
//! years 0001 and 9999 are representable; constructors reject the rest.

use crate::{Error, Result};
use chrono::{DateTime, Datelike, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// `strftime` pattern of the canonical encoding.
pub const CANONICAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.9fZ";

/// Earliest representable year.
pub const MIN_YEAR: i32 = 1;

/// Latest representable year. Later years need a fifth digit and would break
/// the encoding's ordering.
pub const MAX_YEAR: i32 = 9999;

/// A UTC instant as stored in node documents.
///
/// The default value is the zero time (`0001-01-01T00:00:00Z`), which is what
/// an unset date field decodes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The zero time, `0001-01-01T00:00:00Z`.
    #[must_use]
    pub fn zero() -> Self {
        let midnight = NaiveDate::from_ymd_opt(1, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or_default();
        Self(midnight.and_utc())
    }

    /// Creates a timestamp at the current time.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Wraps a chrono instant. Fails outside years 0001 to 9999.
    pub fn from_datetime(datetime: DateTime<Utc>) -> Result<Self> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&datetime.year()) {
            return Err(Error::InvalidTimestamp(format!(
                "{datetime} is outside years {MIN_YEAR:04} to {MAX_YEAR}"
            )));
        }
        Ok(Self(datetime))
    }

    #[must_use]
    pub const fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Returns true for the zero time.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::zero()
    }

    /// Encodes the timestamp in the canonical form.
    #[must_use]
    pub fn encode(&self) -> String {
        self.0.format(CANONICAL_FORMAT).to_string()
    }

    /// Parses any RFC 3339 timestamp, normalizing it to UTC.
    pub fn parse(s: &str) -> Result<Self> {
        let parsed = DateTime::parse_from_rfc3339(s)
            .map_err(|e| Error::InvalidTimestamp(format!("{s:?}: {e}")))?;
        Self::from_datetime(parsed.with_timezone(&Utc))
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::zero()
    }
}

impl TryFrom<DateTime<Utc>> for Timestamp {
    type Error = Error;

    fn try_from(datetime: DateTime<Utc>) -> Result<Self> {
        Self::from_datetime(datetime)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
