//! JSON-RPC 2.0 message model.
//!
//! Messages are classified structurally (by which members are present), not
//! by a type tag. Method-specific payloads (`params`, `result`, error `data`)
//! stay as raw JSON until a consumer that knows their schema decodes them
//! with [`RawJson::decode`].

pub mod codes;
pub mod dispatch;
pub mod error;
pub mod id;
pub mod message;
pub mod raw;

pub use dispatch::{decode_envelope, decode_message, Envelope};
pub use error::{MessageError, Result};
pub use id::Id;
pub use message::{
    Message, MessageKind, Notification, Outcome, RawMessage, Request, Response, ResponseError,
};
pub use raw::{RawJson, Version, VERSION};
