//! Lenient timestamp decoding.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum WireTimestamp {
    Iso(DateTime<Utc>),
    UnixSeconds(i64),
}

/// Accepts an RFC 3339 string or integer Unix seconds; `null` maps to `None`.
pub fn deserialize_optional<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<WireTimestamp>::deserialize(deserializer)? {
        None => Ok(None),
        Some(WireTimestamp::Iso(at)) => Ok(Some(at)),
        Some(WireTimestamp::UnixSeconds(secs)) => Utc
            .timestamp_opt(secs, 0)
            .single()
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {secs}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "deserialize_optional")]
        at: Option<DateTime<Utc>>,
    }

    #[test]
    fn accepts_iso_and_unix_seconds() {
        let iso: Probe = serde_json::from_str(r#"{"at":"2030-01-02T03:04:05Z"}"#).unwrap();
        let unix: Probe = serde_json::from_str(r#"{"at":1893553445}"#).unwrap();
        assert_eq!(iso.at, unix.at);
    }

    #[test]
    fn null_and_missing_are_none() {
        let null: Probe = serde_json::from_str(r#"{"at":null}"#).unwrap();
        let missing: Probe = serde_json::from_str("{}").unwrap();
        assert!(null.at.is_none());
        assert!(missing.at.is_none());
    }
}
