//! Self-describing JSON value used for free-form metadata and for
//! inspecting arbitrary server error payloads.
//!
//! Only six shapes are representable: string, integer, float, boolean,
//! array and object. Anything else (`null`, non-finite floats, binary data)
//! is rejected with [`ValueError::UnsupportedType`] instead of being coerced.
//!
//! # Example
//! ```
//! use restauth::value::AnyJson;
//!
//! let value = AnyJson::from_slice(br#"{"plan":"pro","seats":3}"#)?;
//! assert_eq!(value.get("plan").and_then(AnyJson::as_str), Some("pro"));
//! assert_eq!(value.get("seats").and_then(AnyJson::as_i64), Some(3));
//! # Ok::<(), restauth::value::ValueError>(())
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{self as ser, SerializeMap, SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while decoding or encoding an [`AnyJson`].
#[derive(Debug, Error)]
pub enum ValueError {
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),
    #[error("Malformed JSON: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for ValueError {
    fn from(error: serde_json::Error) -> Self {
        match error.classify() {
            serde_json::error::Category::Data => Self::UnsupportedType(error.to_string()),
            _ => Self::Malformed(error.to_string()),
        }
    }
}

/// A recursive JSON value restricted to the six supported shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyJson {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Array(Vec<AnyJson>),
    Object(BTreeMap<String, AnyJson>),
}

impl AnyJson {
    /// Decode raw JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ValueError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Encode to JSON bytes.
    pub fn to_vec(&self) -> Result<Vec<u8>, ValueError> {
        self.validate()?;
        Ok(serde_json::to_vec(self)?)
    }

    /// Capture any serializable value as an [`AnyJson`].
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, ValueError> {
        let json = serde_json::to_value(value)?;
        Self::try_from(json)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric view; integers widen to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(n) => Some(*n),
            Self::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[AnyJson]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, AnyJson>> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Look up a key when this value is an object.
    pub fn get(&self, key: &str) -> Option<&AnyJson> {
        self.as_object().and_then(|map| map.get(key))
    }

    fn validate(&self) -> Result<(), ValueError> {
        match self {
            Self::Float(n) if !n.is_finite() => Err(ValueError::UnsupportedType(format!(
                "non-finite float {n}"
            ))),
            Self::Array(items) => items.iter().try_for_each(Self::validate),
            Self::Object(map) => map.values().try_for_each(Self::validate),
            _ => Ok(()),
        }
    }
}

impl TryFrom<serde_json::Value> for AnyJson {
    type Error = ValueError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        use serde_json::Value;

        match value {
            Value::String(s) => Ok(Self::String(s)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Self::Integer(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(Self::Float(f))
                } else {
                    Err(ValueError::UnsupportedType(format!("number {n}")))
                }
            }
            Value::Bool(b) => Ok(Self::Bool(b)),
            Value::Array(items) => items
                .into_iter()
                .map(Self::try_from)
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Array),
            Value::Object(map) => map
                .into_iter()
                .map(|(k, v)| Self::try_from(v).map(|v| (k, v)))
                .collect::<Result<BTreeMap<_, _>, _>>()
                .map(Self::Object),
            Value::Null => Err(ValueError::UnsupportedType("null".to_string())),
        }
    }
}

impl From<String> for AnyJson {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for AnyJson {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<i64> for AnyJson {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for AnyJson {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<f64> for AnyJson {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for AnyJson {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Vec<AnyJson>> for AnyJson {
    fn from(value: Vec<AnyJson>) -> Self {
        Self::Array(value)
    }
}

impl From<BTreeMap<String, AnyJson>> for AnyJson {
    fn from(value: BTreeMap<String, AnyJson>) -> Self {
        Self::Object(value)
    }
}

impl Serialize for AnyJson {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::String(s) => serializer.serialize_str(s),
            Self::Integer(n) => serializer.serialize_i64(*n),
            Self::Float(n) if !n.is_finite() => Err(ser::Error::custom(format!(
                "unsupported type: non-finite float {n}"
            ))),
            Self::Float(n) => serializer.serialize_f64(*n),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Object(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map {
                    out.serialize_entry(key, value)?;
                }
                out.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for AnyJson {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(AnyJsonVisitor)
    }
}

struct AnyJsonVisitor;

impl<'de> Visitor<'de> for AnyJsonVisitor {
    type Value = AnyJson;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string, number, boolean, array or object")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<AnyJson, E> {
        Ok(AnyJson::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<AnyJson, E> {
        Ok(AnyJson::String(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<AnyJson, E> {
        Ok(AnyJson::Integer(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<AnyJson, E> {
        Ok(match i64::try_from(v) {
            Ok(n) => AnyJson::Integer(n),
            Err(_) => AnyJson::Float(v as f64),
        })
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<AnyJson, E> {
        Ok(AnyJson::Float(v))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<AnyJson, E> {
        Ok(AnyJson::Bool(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<AnyJson, E> {
        Err(E::custom("unsupported type: null"))
    }

    fn visit_none<E: de::Error>(self) -> Result<AnyJson, E> {
        Err(E::custom("unsupported type: null"))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<AnyJson, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(AnyJson::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<AnyJson, A::Error> {
        let mut out = BTreeMap::new();
        while let Some((key, value)) = map.next_entry::<String, AnyJson>()? {
            out.insert(key, value);
        }
        Ok(AnyJson::Object(out))
    }
}
