use std::fmt;

use serde::de::{self, Deserializer};
use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::dispatch::decode_message;
use crate::error::Result;
use crate::id::Id;
use crate::raw::{RawJson, Version};

/// The three message kinds, told apart by which members are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Request,
    Response,
    Notification,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MessageKind::Request => "request",
            MessageKind::Response => "response",
            MessageKind::Notification => "notification",
        })
    }
}

/// A call that expects a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Request {
    pub jsonrpc: Version,
    pub id: Id,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<RawJson>,
}

impl Request {
    /// Build a request from already-encoded params.
    pub fn new(id: impl Into<Id>, method: impl Into<String>, params: Option<RawJson>) -> Self {
        Self {
            jsonrpc: Version,
            id: id.into(),
            method: method.into(),
            params,
        }
    }

    /// Build a request, serializing `params`.
    pub fn with_params<P: Serialize + ?Sized>(
        id: impl Into<Id>,
        method: impl Into<String>,
        params: &P,
    ) -> serde_json::Result<Self> {
        Ok(Self::new(id, method, Some(RawJson::from_value(params)?)))
    }
}

/// A one-way message: no id, never answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub jsonrpc: Version,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<RawJson>,
}

impl Notification {
    /// Build a notification from already-encoded params.
    pub fn new(method: impl Into<String>, params: Option<RawJson>) -> Self {
        Self {
            jsonrpc: Version,
            method: method.into(),
            params,
        }
    }

    /// Build a notification, serializing `params`.
    pub fn with_params<P: Serialize + ?Sized>(
        method: impl Into<String>,
        params: &P,
    ) -> serde_json::Result<Self> {
        Ok(Self::new(method, Some(RawJson::from_value(params)?)))
    }
}

/// The error member of a failed response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message} (code {code})")]
pub struct ResponseError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<RawJson>,
}

impl ResponseError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Attach a serialized `data` member.
    pub fn with_data<T: Serialize + ?Sized>(mut self, data: &T) -> serde_json::Result<Self> {
        self.data = Some(RawJson::from_value(data)?);
        Ok(self)
    }
}

/// What a response carries: a result or an error, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Result(RawJson),
    Error(ResponseError),
}

/// The answer to a [`Request`], matched to it by id.
///
/// Only the populated [`Outcome`] member is written; `result` and `error`
/// never both appear on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub jsonrpc: Version,
    pub id: Id,
    pub outcome: Outcome,
}

impl Response {
    /// A successful response with an already-encoded result.
    pub fn ok(id: impl Into<Id>, result: RawJson) -> Self {
        Self {
            jsonrpc: Version,
            id: id.into(),
            outcome: Outcome::Result(result),
        }
    }

    /// A successful response, serializing `result`.
    pub fn result<T: Serialize + ?Sized>(id: impl Into<Id>, result: &T) -> serde_json::Result<Self> {
        Ok(Self::ok(id, RawJson::from_value(result)?))
    }

    /// A failed response.
    pub fn error(id: impl Into<Id>, error: ResponseError) -> Self {
        Self {
            jsonrpc: Version,
            id: id.into(),
            outcome: Outcome::Error(error),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, Outcome::Error(_))
    }

    /// Convert into the result payload or the response error.
    pub fn into_result(self) -> std::result::Result<RawJson, ResponseError> {
        match self.outcome {
            Outcome::Result(result) => Ok(result),
            Outcome::Error(error) => Err(error),
        }
    }
}

impl Serialize for Response {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Response", 3)?;
        state.serialize_field("jsonrpc", &self.jsonrpc)?;
        state.serialize_field("id", &self.id)?;
        match &self.outcome {
            Outcome::Result(result) => state.serialize_field("result", result)?,
            Outcome::Error(error) => state.serialize_field("error", error)?,
        }
        state.end()
    }
}

/// Any decoded JSON-RPC message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Message {
    Request(Request),
    Response(Response),
    Notification(Notification),
}

impl Message {
    /// Classify and decode one JSON object.
    pub fn decode(data: &[u8]) -> Result<Self> {
        decode_message(data)
    }

    /// Serialize to compact JSON.
    pub fn to_vec(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Request(_) => MessageKind::Request,
            Message::Response(_) => MessageKind::Response,
            Message::Notification(_) => MessageKind::Notification,
        }
    }

    /// Method name for requests and notifications.
    pub fn method(&self) -> Option<&str> {
        match self {
            Message::Request(req) => Some(&req.method),
            Message::Notification(note) => Some(&note.method),
            Message::Response(_) => None,
        }
    }

    /// Id for requests and responses.
    pub fn id(&self) -> Option<&Id> {
        match self {
            Message::Request(req) => Some(&req.id),
            Message::Response(resp) => Some(&resp.id),
            Message::Notification(_) => None,
        }
    }
}

impl From<Request> for Message {
    fn from(req: Request) -> Self {
        Message::Request(req)
    }
}

impl From<Response> for Message {
    fn from(resp: Response) -> Self {
        Message::Response(resp)
    }
}

impl From<Notification> for Message {
    fn from(note: Notification) -> Self {
        Message::Notification(note)
    }
}

impl<'de> Deserialize<'de> for Message {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        RawMessage::deserialize(deserializer)?
            .classify()
            .map_err(de::Error::custom)
    }
}

/// A JSON object whose message kind has not been determined yet.
#[derive(Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawMessage(Box<RawValue>);

impl RawMessage {
    /// Capture one JSON value without interpreting it.
    pub fn from_slice(data: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(data).map(Self)
    }

    /// Run dispatch on the captured bytes.
    pub fn classify(&self) -> Result<Message> {
        decode_message(self.0.get().as_bytes())
    }

    /// Run dispatch, consuming the raw message.
    pub fn into_message(self) -> Result<Message> {
        self.classify()
    }

    pub fn get(&self) -> &str {
        self.0.get()
    }
}

impl fmt::Debug for RawMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RawMessage").field(&self.get()).finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::codes;

    #[test]
    fn request_wire_form() {
        let req = Request::with_params(1, "textDocument/hover", &json!({"line": 2})).unwrap();
        assert_eq!(
            serde_json::to_string(&req).unwrap(),
            r#"{"jsonrpc":"2.0","id":1,"method":"textDocument/hover","params":{"line":2}}"#
        );
    }

    #[test]
    fn request_without_params_omits_member() {
        let req = Request::new("a", "shutdown", None);
        assert_eq!(
            serde_json::to_string(&req).unwrap(),
            r#"{"jsonrpc":"2.0","id":"a","method":"shutdown"}"#
        );
    }

    #[test]
    fn notification_wire_form() {
        let note = Notification::with_params("exit", &json!([1, 2])).unwrap();
        assert_eq!(
            serde_json::to_string(&note).unwrap(),
            r#"{"jsonrpc":"2.0","method":"exit","params":[1,2]}"#
        );
    }

    #[test]
    fn result_response_omits_error() {
        let resp = Response::result(3, &json!({"ok": true})).unwrap();
        assert_eq!(
            serde_json::to_string(&resp).unwrap(),
            r#"{"jsonrpc":"2.0","id":3,"result":{"ok":true}}"#
        );
    }

    #[test]
    fn null_result_is_still_emitted() {
        let resp = Response::result(4, &()).unwrap();
        assert_eq!(
            serde_json::to_string(&resp).unwrap(),
            r#"{"jsonrpc":"2.0","id":4,"result":null}"#
        );
    }

    #[test]
    fn error_response_omits_result() {
        let err = ResponseError::new(codes::METHOD_NOT_FOUND, "no such method")
            .with_data(&json!("frobnicate"))
            .unwrap();
        let resp = Response::error("x", err);
        assert!(resp.is_error());
        assert_eq!(
            serde_json::to_string(&resp).unwrap(),
            r#"{"jsonrpc":"2.0","id":"x","error":{"code":-32601,"message":"no such method","data":"frobnicate"}}"#
        );
    }

    #[test]
    fn response_into_result() {
        let resp = Response::error(1, ResponseError::new(codes::INTERNAL_ERROR, "boom"));
        let err = resp.into_result().unwrap_err();
        assert_eq!(err.to_string(), "boom (code -32603)");

        let resp = Response::result(1, &5).unwrap();
        let value: i32 = resp.into_result().unwrap().decode().unwrap();
        assert_eq!(value, 5);
    }

    #[test]
    fn message_accessors() {
        let msg = Message::from(Request::new(9, "ping", None));
        assert_eq!(msg.kind(), MessageKind::Request);
        assert_eq!(msg.method(), Some("ping"));
        assert_eq!(msg.id(), Some(&Id::Number(9)));

        let msg = Message::from(Notification::new("tick", None));
        assert_eq!(msg.kind(), MessageKind::Notification);
        assert_eq!(msg.id(), None);

        let msg = Message::from(Response::result(9, &true).unwrap());
        assert_eq!(msg.kind(), MessageKind::Response);
        assert_eq!(msg.method(), None);
        assert_eq!(msg.kind().to_string(), "response");
    }

    #[test]
    fn message_serde_roundtrip_through_dispatch() {
        let original = Message::from(Request::with_params("q", "sum", &[1, 2, 3]).unwrap());
        let bytes = original.to_vec().unwrap();
        let decoded: Message = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn raw_message_defers_classification() {
        let raw = RawMessage::from_slice(br#"{"jsonrpc":"2.0","method":"later"}"#).unwrap();
        assert!(raw.get().contains("later"));
        let msg = raw.into_message().unwrap();
        assert_eq!(msg.kind(), MessageKind::Notification);
    }

    #[test]
    fn raw_message_nested_in_batch_like_array() {
        let items: Vec<RawMessage> = serde_json::from_str(
            r#"[{"jsonrpc":"2.0","id":1,"result":0},{"jsonrpc":"2.0","method":"m"}]"#,
        )
        .unwrap();
        let kinds: Vec<_> = items
            .iter()
            .map(|raw| raw.classify().unwrap().kind())
            .collect();
        assert_eq!(kinds, [MessageKind::Response, MessageKind::Notification]);
    }
}
