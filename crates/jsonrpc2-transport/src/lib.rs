//! Byte connection abstraction for JSON-RPC streams.
//!
//! A stream needs three handles on one live connection: a read half, a write
//! half, and a control handle that can shut the connection down while the
//! other two are blocked. [`Connection`] captures exactly that, with
//! implementations for:
//! - TCP sockets
//! - Unix domain sockets (Linux/macOS)
//!
//! This is the lowest layer. Establishing the connection (listen, accept,
//! dial) stays with the caller.

pub mod connection;
pub mod tcp;

#[cfg(unix)]
pub mod uds;

pub use connection::{is_already_disconnected, Connection, Halves};
