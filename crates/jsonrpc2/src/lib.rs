//! JSON-RPC 2.0 over byte connections.
//!
//! jsonrpc2 turns a bidirectional byte connection (TCP, Unix socket) into a
//! stream of typed JSON-RPC messages, either as bare concatenated JSON or
//! with LSP-style `Content-Length` headers.
//!
//! # Crate Structure
//!
//! - [`transport`]: the `Connection` trait and its TCP / Unix socket impls
//! - [`message`]: requests, notifications, responses, ids and decode dispatch
//! - [`stream`]: framing codecs, blocking reader/writer and the `Stream` contract
//!
//! ```rust,ignore
//! use jsonrpc2::stream::{CancellationToken, Framer, Stream};
//! use jsonrpc2::message::Request;
//!
//! let stream = Framer::Header.wrap(std::net::TcpStream::connect(addr)?)?;
//! stream.write(&CancellationToken::new(), &Request::new(1, "ping", None).into())?;
//! let (reply, _bytes) = stream.read(&CancellationToken::new())?;
//! ```

/// Re-export transport types.
pub mod transport {
    pub use jsonrpc2_transport::*;
}

/// Re-export message types.
pub mod message {
    pub use jsonrpc2_message::*;
}

/// Re-export stream types.
pub mod stream {
    pub use jsonrpc2_stream::*;
}

pub use jsonrpc2_message::{Id, Message, Notification, Request, Response, ResponseError};
pub use jsonrpc2_stream::{CancellationToken, Framer, MessageStream, Stream, StreamConfig, StreamError};
