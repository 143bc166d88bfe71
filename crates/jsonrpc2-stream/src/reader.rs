use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use jsonrpc2_message::Message;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::codec::{MessageDecoder, StreamConfig};
use crate::error::{Result, StreamError};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete messages from any `Read` stream.
///
/// Handles partial reads internally; callers always get whole messages.
/// Bytes read past the end of a message stay buffered for the next call.
pub struct MessageReader<T> {
    inner: T,
    buf: BytesMut,
    decoder: MessageDecoder,
    poll_for_cancel: bool,
}

impl<T: Read> MessageReader<T> {
    /// Create a new message reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, &StreamConfig::default())
    }

    /// Create a new message reader with explicit configuration.
    ///
    /// `cancel_poll_interval` only takes effect if the caller also applied it
    /// as the read timeout of `inner` (see `MessageStream`).
    pub fn with_config(inner: T, config: &StreamConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            decoder: MessageDecoder::new(config),
            poll_for_cancel: config.cancel_poll_interval.is_some(),
        }
    }

    /// Read the next complete message (blocking) without cancellation.
    pub fn read_message(&mut self) -> Result<(Message, usize)> {
        self.read_message_cancellable(&CancellationToken::new())
    }

    /// Read the next complete message (blocking).
    ///
    /// The token is checked before anything is consumed and again before
    /// every read from the connection. Returns `StreamError::ConnectionClosed`
    /// at a clean EOF and `StreamError::Truncated` when EOF cuts a message.
    pub fn read_message_cancellable(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<(Message, usize)> {
        loop {
            if cancel.is_cancelled() {
                return Err(StreamError::Cancelled);
            }

            if let Some((message, size)) = self.decoder.decode(&mut self.buf)? {
                debug!(
                    kind = %message.kind(),
                    method = message.method(),
                    size,
                    "read message"
                );
                return Ok((message, size));
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if self.poll_for_cancel
                        && matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    continue
                }
                Err(err) => return Err(StreamError::Io(err)),
            };

            if read == 0 {
                return Err(if self.buf.iter().all(u8::is_ascii_whitespace) {
                    StreamError::ConnectionClosed
                } else {
                    StreamError::Truncated {
                        buffered: self.buf.len(),
                    }
                });
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Number of bytes read from the connection but not yet returned.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
