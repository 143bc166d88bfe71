use std::fmt;

use serde::de::{self, Deserialize, Deserializer};
use serde::{Serialize, Serializer};
use serde_json::value::RawValue;

/// The only protocol version this layer speaks.
pub const VERSION: &str = "2.0";

/// The `"jsonrpc": "2.0"` member.
///
/// Zero-sized: it serializes the literal and refuses any other value when
/// decoding, so a decoded message always carries the right version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Version;

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(VERSION)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let found = String::deserialize(deserializer)?;
        if found == VERSION {
            Ok(Version)
        } else {
            Err(de::Error::invalid_value(
                de::Unexpected::Str(&found),
                &"\"2.0\"",
            ))
        }
    }
}

/// An undecoded JSON payload.
///
/// Holds `params`, `result` and error `data` as compact JSON text, with the
/// insignificant whitespace of the source removed. Call [`RawJson::decode`]
/// once the target type is known.
#[derive(Clone)]
pub struct RawJson(Box<RawValue>);

impl RawJson {
    /// Serialize a value into a raw payload.
    pub fn from_value<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Self> {
        serde_json::value::to_raw_value(value).map(Self)
    }

    /// Wrap a JSON text after checking that it is one valid JSON value.
    pub fn from_string(json: String) -> serde_json::Result<Self> {
        RawValue::from_string(json).and_then(Self::from_raw_value)
    }

    /// Take ownership of an already parsed raw value.
    pub fn from_raw_value(raw: Box<RawValue>) -> serde_json::Result<Self> {
        match compact(raw.get()) {
            Some(text) => RawValue::from_string(text).map(Self),
            None => Ok(Self(raw)),
        }
    }

    pub(crate) fn from_raw(raw: &RawValue) -> serde_json::Result<Self> {
        Self::from_raw_value(raw.to_owned())
    }

    /// Decode the payload into a concrete type.
    pub fn decode<'a, T: Deserialize<'a>>(&'a self) -> serde_json::Result<T> {
        serde_json::from_str(self.0.get())
    }

    /// The JSON text.
    pub fn get(&self) -> &str {
        self.0.get()
    }

    /// The JSON text as bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.get().as_bytes()
    }

    /// Length of the JSON text in bytes.
    pub fn len(&self) -> usize {
        self.0.get().len()
    }

    /// Returns true if the payload text is empty (never the case for valid JSON).
    pub fn is_empty(&self) -> bool {
        self.0.get().is_empty()
    }

    /// Returns true if the payload is the JSON literal `null`.
    pub fn is_null(&self) -> bool {
        self.0.get().trim() == "null"
    }

    /// Unwrap into the underlying raw value.
    pub fn into_inner(self) -> Box<RawValue> {
        self.0
    }
}

impl TryFrom<Box<RawValue>> for RawJson {
    type Error = serde_json::Error;

    fn try_from(raw: Box<RawValue>) -> serde_json::Result<Self> {
        Self::from_raw_value(raw)
    }
}

/// Strip whitespace outside of strings. `None` if there was none to strip.
///
/// `text` must already be valid JSON.
fn compact(text: &str) -> Option<String> {
    if !text.bytes().any(|b| matches!(b, b' ' | b'\t' | b'\n' | b'\r')) {
        return None;
    }

    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut stripped = false;
    for ch in text.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            out.push(ch);
            continue;
        }
        match ch {
            ' ' | '\t' | '\n' | '\r' => stripped = true,
            '"' => {
                in_string = true;
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    stripped.then_some(out)
}

impl PartialEq for RawJson {
    fn eq(&self, other: &Self) -> bool {
        self.get() == other.get()
    }
}

impl Eq for RawJson {}

impl fmt::Debug for RawJson {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RawJson").field(&self.get()).finish()
    }
}

impl fmt::Display for RawJson {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.get())
    }
}

impl Serialize for RawJson {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RawJson {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Box::<RawValue>::deserialize(deserializer)?;
        Self::from_raw_value(raw).map_err(de::Error::custom)
    }
}
