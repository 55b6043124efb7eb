//! Timestamp encodings.
//!
//! On the wire every instant is UTC rendered as `YYYY-MM-DD HH:mm:ss+00:00`.
//! In the database instants are canonical RFC 3339 text with whole seconds,
//! so equal instants always produce equal keys.

use chrono::{DateTime, SecondsFormat, Utc};

pub const WIRE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%:z";

pub fn format_wire(dt: &DateTime<Utc>) -> String {
    dt.format(WIRE_FORMAT).to_string()
}

pub fn parse_wire(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_str(s.trim(), WIRE_FORMAT).map(|dt| dt.with_timezone(&Utc))
}

pub fn to_storage(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn from_storage(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}

/// `#[serde(with = "timestamp::wire")]`
pub mod wire {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_wire(dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_wire(&raw).map_err(|e| D::Error::custom(format!("invalid timestamp {:?}: {}", raw, e)))
    }
}

/// `#[serde(default, with = "timestamp::wire_option")]`
pub mod wire_option {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(dt: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error> {
        match dt {
            Some(dt) => serializer.serialize_str(&super::format_wire(dt)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) => super::parse_wire(&raw)
                .map(Some)
                .map_err(|e| D::Error::custom(format!("invalid timestamp {:?}: {}", raw, e))),
            None => Ok(None),
        }
    }
}
