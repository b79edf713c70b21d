//! RFC 1123 timestamps as used by HTTP headers and some JSON payloads.
//!
//! The wire form is `Mon, 02 Jan 2006 15:04:05 GMT`. Only years 0 through
//! 9999 can be written in that form.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de, ser};
use thiserror::Error;

/// `strftime` pattern of the wire form.
pub const RFC1123: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Layout of everything before the zone token.
const RFC1123_LOCAL: &str = "%a, %d %b %Y %H:%M:%S";

/// Zone tokens that name UTC. Numeric offsets are not accepted.
const UTC_ZONES: [&str; 3] = ["GMT", "UTC", "UT"];

const MIN_YEAR: i32 = 0;
const MAX_YEAR: i32 = 9999;

/// Error parsing or formatting an RFC 1123 timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateError {
    /// The year cannot be written with four digits.
    #[error("year {0} is outside the range [0,9999]")]
    YearOutOfRange(i32),

    /// The text does not have the `Mon, 02 Jan 2006 15:04:05 GMT` layout.
    #[error("'{input}' is not an RFC 1123 timestamp: {reason}")]
    Malformed {
        /// The rejected text
        input: String,
        /// What is wrong with it
        reason: &'static str,
    },

    /// The layout matched but a field did not.
    #[error("failed to parse '{input}' as an RFC 1123 timestamp: {source}")]
    Parse {
        /// The rejected text
        input: String,
        /// Parser error
        #[source]
        source: chrono::ParseError,
    },
}

impl DateError {
    fn malformed(input: &str, reason: &'static str) -> Self {
        Self::Malformed {
            input: input.to_string(),
            reason,
        }
    }
}

/// Parses an RFC 1123 timestamp into UTC.
///
/// The year must have four digits and the zone must be `GMT`, `UTC` or `UT`.
///
/// # Errors
///
/// Returns [`DateError::Malformed`] when the layout or zone is wrong and
/// [`DateError::Parse`] when a field does not parse.
pub fn parse_time(input: &str) -> Result<DateTime<Utc>, DateError> {
    let text = input.trim();
    let (local, zone) = text
        .rsplit_once(' ')
        .ok_or_else(|| DateError::malformed(input, "missing zone"))?;
    if !UTC_ZONES.contains(&zone) {
        return Err(DateError::malformed(input, "zone must be GMT, UTC or UT"));
    }

    let fields: Vec<&str> = local.split(' ').collect();
    let [_, _, _, year, _] = fields.as_slice() else {
        return Err(DateError::malformed(input, "wrong number of fields"));
    };
    if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DateError::malformed(input, "year must have four digits"));
    }

    let parsed = NaiveDateTime::parse_from_str(local, RFC1123_LOCAL).map_err(|source| {
        DateError::Parse {
            input: input.to_string(),
            source,
        }
    })?;
    Ok(parsed.and_utc())
}

fn check_year(value: DateTime<Utc>) -> Result<(), DateError> {
    let year = value.year();
    if (MIN_YEAR..=MAX_YEAR).contains(&year) {
        Ok(())
    } else {
        Err(DateError::YearOutOfRange(year))
    }
}

/// A UTC instant that marshals as an RFC 1123 string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeRfc1123(DateTime<Utc>);

impl TimeRfc1123 {
    /// Wraps an instant. Instants outside years 0 through 9999 are kept but
    /// cannot be formatted.
    #[must_use]
    pub const fn new(value: DateTime<Utc>) -> Self {
        Self(value)
    }

    /// Returns the wrapped instant.
    #[must_use]
    pub const fn to_datetime(self) -> DateTime<Utc> {
        self.0
    }

    /// Returns `true` if the year can be written in the wire form.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        check_year(self.0).is_ok()
    }

    /// Formats the wire form.
    ///
    /// # Errors
    ///
    /// Returns [`DateError::YearOutOfRange`] for unrepresentable years.
    pub fn to_rfc1123(&self) -> Result<String, DateError> {
        check_year(self.0)?;
        Ok(self.0.format(RFC1123).to_string())
    }

    /// Encodes the wire form as bytes.
    ///
    /// # Errors
    ///
    /// Returns [`DateError::YearOutOfRange`] for unrepresentable years.
    pub fn to_bytes(&self) -> Result<Vec<u8>, DateError> {
        self.to_rfc1123().map(String::into_bytes)
    }
}

impl From<DateTime<Utc>> for TimeRfc1123 {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value)
    }
}

/// Decodes the bytes written by [`TimeRfc1123::to_bytes`].
impl TryFrom<&[u8]> for TimeRfc1123 {
    type Error = DateError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let text = std::str::from_utf8(bytes).map_err(|_| DateError::Malformed {
            input: String::from_utf8_lossy(bytes).into_owned(),
            reason: "not UTF-8",
        })?;
        text.parse()
    }
}

impl FromStr for TimeRfc1123 {
    type Err = DateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_time(s).map(Self)
    }
}

/// Writes the wire form, or nothing when the year is out of range.
impl fmt::Display for TimeRfc1123 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_rfc1123() {
            Ok(text) => f.write_str(&text),
            Err(_) => Ok(()),
        }
    }
}

impl Serialize for TimeRfc1123 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let text = self.to_rfc1123().map_err(ser::Error::custom)?;
        serializer.serialize_str(&text)
    }
}

impl<'de> Deserialize<'de> for TimeRfc1123 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}
