//! Validity window parsing.
//!
//! The catalog API is inconsistent about date formats: RFC 3339 instants,
//! naive date-times and bare dates all appear. Naive values are read as UTC.
//! A bare `valid_until` date covers the whole day.

use jiff::{
    Timestamp,
    civil::{Date, DateTime},
    tz::TimeZone,
};
use serde::{Deserialize, Deserializer, de::Error as _};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Boundary {
    Start,
    End,
}

fn parse(raw: &str, boundary: Boundary) -> Option<Timestamp> {
    let raw = raw.trim();

    if let Ok(timestamp) = raw.parse::<Timestamp>() {
        return Some(timestamp);
    }

    if raw.contains(['T', 't', ' ']) {
        let datetime = raw.replacen(' ', "T", 1).parse::<DateTime>().ok()?;

        return datetime.to_zoned(TimeZone::UTC).ok().map(|z| z.timestamp());
    }

    let date = raw.parse::<Date>().ok()?;
    let date = match boundary {
        Boundary::Start => date,
        Boundary::End => date.tomorrow().ok()?,
    };

    date.to_zoned(TimeZone::UTC).ok().map(|z| z.timestamp())
}

fn deserialize_with<'de, D>(deserializer: D, boundary: Boundary) -> Result<Option<Timestamp>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };

    if raw.trim().is_empty() {
        return Ok(None);
    }

    parse(&raw, boundary)
        .map(Some)
        .ok_or_else(|| D::Error::custom(format!("unrecognised date {raw:?}")))
}

/// Deserialize the start of a validity window.
pub(crate) fn deserialize_start<'de, D>(deserializer: D) -> Result<Option<Timestamp>, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_with(deserializer, Boundary::Start)
}

/// Deserialize the (exclusive) end of a validity window.
pub(crate) fn deserialize_end<'de, D>(deserializer: D) -> Result<Option<Timestamp>, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_with(deserializer, Boundary::End)
}
