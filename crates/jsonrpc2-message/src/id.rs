use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Request identifier.
///
/// On the wire an id is a string, an integer, or `null`. The variants keep
/// these apart, so `Number(2)` and `Name("2")` never compare equal or hash
/// the same.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Id {
    /// No usable id: `null` on the wire.
    #[default]
    Absent,
    /// String id.
    Name(String),
    /// Integer id.
    Number(i64),
}

impl Id {
    /// Returns true for [`Id::Absent`].
    pub fn is_absent(&self) -> bool {
        matches!(self, Id::Absent)
    }

    /// The string alternative, if populated.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Id::Name(name) => Some(name),
            _ => None,
        }
    }

    /// The numeric alternative, if populated.
    pub fn as_number(&self) -> Option<i64> {
        match self {
            Id::Number(number) => Some(*number),
            _ => None,
        }
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::Absent => f.write_str("null"),
            Id::Name(name) => write!(f, "{name:?}"),
            Id::Number(number) => write!(f, "{number}"),
        }
    }
}

impl From<i64> for Id {
    fn from(number: i64) -> Self {
        Id::Number(number)
    }
}

impl From<&str> for Id {
    fn from(name: &str) -> Self {
        Id::Name(name.to_string())
    }
}

impl From<String> for Id {
    fn from(name: String) -> Self {
        Id::Name(name)
    }
}

impl Serialize for Id {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Id::Absent => serializer.serialize_unit(),
            Id::Name(name) => serializer.serialize_str(name),
            Id::Number(number) => serializer.serialize_i64(*number),
        }
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(IdVisitor)
    }
}

struct IdVisitor;

impl<'de> Visitor<'de> for IdVisitor {
    type Value = Id;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string, an integer or null")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Id, E> {
        Ok(Id::Name(value.to_string()))
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<Id, E> {
        Ok(Id::Name(value))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Id, E> {
        Ok(Id::Number(value))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Id, E> {
        i64::try_from(value)
            .map(Id::Number)
            .map_err(|_| E::invalid_value(de::Unexpected::Unsigned(value), &self))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Id, E> {
        Ok(Id::Absent)
    }

    fn visit_none<E: de::Error>(self) -> Result<Id, E> {
        Ok(Id::Absent)
    }
}
