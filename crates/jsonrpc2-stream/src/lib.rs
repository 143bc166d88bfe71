//! Message streams for JSON-RPC 2.0.
//!
//! Two wire conventions are supported:
//! - `raw`: bare concatenated JSON values, split on the JSON grammar itself
//! - `header`: a `Content-Length` header block before every body, as used by
//!   the Language Server Protocol
//!
//! A [`Stream`] hands out whole messages only. Partial reads, buffering and
//! header parsing stay inside this crate.

pub mod codec;
pub mod error;
pub mod header;
pub mod raw;
pub mod reader;
pub mod stream;
#[cfg(feature = "async")]
pub mod tokio_codec;
pub mod writer;

pub use codec::{
    encode_message, Framer, MessageDecoder, StreamConfig, DEFAULT_MAX_HEADER, DEFAULT_MAX_MESSAGE,
};
pub use error::{ErrorClass, Result, StreamError};
pub use reader::MessageReader;
pub use stream::{MessageStream, Stream};
pub use tokio_util::sync::CancellationToken;
pub use writer::MessageWriter;

#[cfg(feature = "async")]
pub use tokio_codec::{framed, JsonRpcCodec};
