//! JSON transcoding between internal field names and the wire convention.
//!
//! Internal field names are snake_case. Dates travel as RFC 3339 strings,
//! which is how `chrono` serializes them.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

use crate::error::{AuthError, Result};

/// Object key convention used on the wire.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum KeyConvention {
    /// Wire keys match the internal names; bodies pass through untouched.
    #[default]
    SnakeCase,
    CamelCase,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec {
    wire: KeyConvention,
}

impl JsonCodec {
    pub fn new(wire: KeyConvention) -> Self {
        Self { wire }
    }

    pub fn convention(&self) -> KeyConvention {
        self.wire
    }

    pub fn encode(&self, body: &Value) -> Result<Vec<u8>> {
        match self.wire {
            KeyConvention::SnakeCase => serde_json::to_vec(body),
            KeyConvention::CamelCase => {
                serde_json::to_vec(&rewrite_keys(body.clone(), &snake_to_camel))
            }
        }
        .map_err(AuthError::Encoding)
    }

    pub fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        match self.wire {
            KeyConvention::SnakeCase => serde_json::from_slice(bytes),
            KeyConvention::CamelCase => serde_json::from_slice::<Value>(bytes)
                .and_then(|value| serde_json::from_value(rewrite_keys(value, &camel_to_snake))),
        }
        .map_err(AuthError::Decoding)
    }
}

fn rewrite_keys(value: Value, convert: &dyn Fn(&str) -> String) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (convert(&key), rewrite_keys(value, convert)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| rewrite_keys(item, convert))
                .collect(),
        ),
        other => other,
    }
}

pub(crate) fn snake_to_camel(key: &str) -> String {
    let trimmed = key.trim_start_matches('_');
    let mut out = String::with_capacity(key.len());
    out.push_str(&key[..key.len() - trimmed.len()]);
    let mut upper_next = false;
    for ch in trimmed.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

// Acronym runs stay one word: `userID` -> `user_id`, `URLValue` -> `url_value`.
pub(crate) fn camel_to_snake(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let mut out = String::with_capacity(key.len() + 4);
    for (i, &ch) in chars.iter().enumerate() {
        if !ch.is_uppercase() {
            out.push(ch);
            continue;
        }
        let prev = i.checked_sub(1).map(|p| chars[p]);
        let next = chars.get(i + 1).copied();
        let boundary = match prev {
            Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
            Some(p) if p.is_uppercase() => next.is_some_and(char::is_lowercase),
            _ => false,
        };
        if boundary {
            out.push('_');
        }
        out.extend(ch.to_lowercase());
    }
    out
}
