//! Structural classification of incoming JSON objects.
//!
//! One pass over the object records which of the interesting members are
//! present, borrowing each as raw JSON. Classification then looks only at
//! presence; member values are decoded afterwards, and only the small ones
//! (`id`, `method`, `error`) are parsed at all.

use std::fmt;
use std::marker::PhantomData;

use serde::de::{self, Deserialize, Deserializer, IgnoredAny, MapAccess, Visitor};
use serde_json::value::RawValue;
use tracing::trace;

use crate::error::{MessageError, Result};
use crate::id::Id;
use crate::message::{Message, Notification, Outcome, Request, Response, ResponseError};
use crate::raw::{RawJson, Version, VERSION};

const EXCERPT_LEN: usize = 96;

/// The members of a message object that matter for classification.
///
/// A member that is present with the value `null` is `Some`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Envelope<'a> {
    pub jsonrpc: Option<&'a RawValue>,
    pub id: Option<&'a RawValue>,
    pub method: Option<&'a RawValue>,
    pub params: Option<&'a RawValue>,
    pub result: Option<&'a RawValue>,
    pub error: Option<&'a RawValue>,
}

/// Decode one JSON object into a [`Message`].
pub fn decode_message(data: &[u8]) -> Result<Message> {
    decode_envelope(data)?.classify(data)
}

/// Scan one JSON object into an [`Envelope`] without classifying it.
pub fn decode_envelope(data: &[u8]) -> Result<Envelope<'_>> {
    Ok(serde_json::from_slice(data)?)
}

impl<'a> Envelope<'a> {
    /// Turn the recorded members into a typed message.
    ///
    /// `source` is the text the envelope was read from; it is only used to
    /// describe objects that fit no message shape.
    pub fn classify(self, source: &[u8]) -> Result<Message> {
        self.check_version()?;

        let message = match (self.id, self.method) {
            (Some(id), Some(method)) => Message::Request(Request {
                jsonrpc: Version,
                id: decode_id(id)?,
                method: decode_method(method)?,
                params: self.params.map(RawJson::from_raw).transpose()?,
            }),
            (None, Some(method)) => Message::Notification(Notification {
                jsonrpc: Version,
                method: decode_method(method)?,
                params: self.params.map(RawJson::from_raw).transpose()?,
            }),
            (Some(id), None) => {
                let id = decode_id(id)?;
                let outcome = match (self.result, self.error) {
                    (Some(result), None) => Outcome::Result(RawJson::from_raw(result)?),
                    (None, Some(error)) => {
                        Outcome::Error(serde_json::from_str::<ResponseError>(error.get())?)
                    }
                    (Some(_), Some(_)) => {
                        return Err(MessageError::AmbiguousResponse { id: id.to_string() })
                    }
                    (None, None) => return Err(unknown_shape(source)),
                };
                Message::Response(Response {
                    jsonrpc: Version,
                    id,
                    outcome,
                })
            }
            (None, None) => return Err(unknown_shape(source)),
        };

        trace!(kind = %message.kind(), method = message.method(), "classified message");
        Ok(message)
    }

    fn check_version(&self) -> Result<()> {
        let Some(raw) = self.jsonrpc else {
            return Err(MessageError::UnsupportedVersion { found: None });
        };
        match serde_json::from_str::<String>(raw.get()) {
            Ok(version) if version == VERSION => Ok(()),
            _ => Err(MessageError::UnsupportedVersion {
                found: Some(raw.get().to_string()),
            }),
        }
    }
}

fn decode_id(raw: &RawValue) -> Result<Id> {
    Ok(serde_json::from_str(raw.get())?)
}

fn decode_method(raw: &RawValue) -> Result<String> {
    let method: String = serde_json::from_str(raw.get())?;
    if method.is_empty() {
        return Err(MessageError::EmptyMethod);
    }
    Ok(method)
}

fn unknown_shape(source: &[u8]) -> MessageError {
    let text = String::from_utf8_lossy(source);
    let excerpt = match text.char_indices().nth(EXCERPT_LEN) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.into_owned(),
    };
    MessageError::UnknownShape { excerpt }
}

#[derive(Debug)]
enum Field {
    Jsonrpc,
    Id,
    Method,
    Params,
    Result,
    Error,
    Other,
}

impl<'de> Deserialize<'de> for Field {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_identifier(FieldVisitor)
    }
}

struct FieldVisitor;

impl Visitor<'_> for FieldVisitor {
    type Value = Field;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a member name")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> std::result::Result<Field, E> {
        Ok(match value {
            "jsonrpc" => Field::Jsonrpc,
            "id" => Field::Id,
            "method" => Field::Method,
            "params" => Field::Params,
            "result" => Field::Result,
            "error" => Field::Error,
            _ => Field::Other,
        })
    }
}

impl<'de: 'a, 'a> Deserialize<'de> for Envelope<'a> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(EnvelopeVisitor(PhantomData))
    }
}

struct EnvelopeVisitor<'a>(PhantomData<&'a ()>);

impl<'de: 'a, 'a> Visitor<'de> for EnvelopeVisitor<'a> {
    type Value = Envelope<'a>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON-RPC message object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Envelope<'a>, A::Error> {
        let mut envelope = Envelope::default();
        while let Some(field) = map.next_key::<Field>()? {
            let slot = match field {
                Field::Jsonrpc => &mut envelope.jsonrpc,
                Field::Id => &mut envelope.id,
                Field::Method => &mut envelope.method,
                Field::Params => &mut envelope.params,
                Field::Result => &mut envelope.result,
                Field::Error => &mut envelope.error,
                Field::Other => {
                    map.next_value::<IgnoredAny>()?;
                    continue;
                }
            };
            *slot = Some(map.next_value::<&'de RawValue>()?);
        }
        Ok(envelope)
    }
}
