use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use jsonrpc2_message::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::codec::{encode_message, Framer, StreamConfig};
use crate::error::{Result, StreamError};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Writes complete messages to any `Write` stream.
///
/// Each message (header included) is encoded into one buffer and written
/// out before the call returns.
pub struct MessageWriter<T> {
    inner: T,
    buf: BytesMut,
    framer: Framer,
    max_message_size: usize,
    fail_on_timeout: bool,
}

impl<T: Write> MessageWriter<T> {
    /// Create a new message writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, &StreamConfig::default())
    }

    /// Create a new message writer with explicit configuration.
    ///
    /// With `write_timeout` set, `WouldBlock` and `TimedOut` from `inner`
    /// are treated as an expired timeout and returned as errors instead of
    /// retried. The caller applies the timeout to `inner` (see
    /// `MessageStream`).
    pub fn with_config(inner: T, config: &StreamConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            framer: config.framer,
            max_message_size: config.max_message_size,
            fail_on_timeout: config.write_timeout.is_some(),
        }
    }

    /// Write a complete message (blocking) without cancellation.
    pub fn write_message(&mut self, message: &Message) -> Result<usize> {
        self.write_message_cancellable(&CancellationToken::new(), message)
    }

    /// Encode and send one message, returning the bytes written.
    ///
    /// The token is checked once, before anything is written; a message that
    /// has started going out is finished unless the write timeout expires,
    /// which leaves the peer with a partial message.
    pub fn write_message_cancellable(
        &mut self,
        cancel: &CancellationToken,
        message: &Message,
    ) -> Result<usize> {
        if cancel.is_cancelled() {
            return Err(StreamError::Cancelled);
        }

        self.buf.clear();
        let size = encode_message(self.framer, message, &mut self.buf, self.max_message_size)?;

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(StreamError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if self.should_retry(&err) => continue,
                Err(err) => {
                    warn!(written = offset, size, error = %err, "write failed");
                    return Err(StreamError::Io(err));
                }
            }
        }

        self.flush()?;
        debug!(
            kind = %message.kind(),
            method = message.method(),
            size,
            "wrote message"
        );
        Ok(size)
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if self.should_retry(&err) => continue,
                Err(err) => return Err(StreamError::Io(err)),
            }
        }
    }

    fn should_retry(&self, err: &std::io::Error) -> bool {
        match err.kind() {
            ErrorKind::Interrupted => true,
            ErrorKind::WouldBlock | ErrorKind::TimedOut => !self.fail_on_timeout,
            _ => false,
        }
    }

    pub fn framer(&self) -> Framer {
        self.framer
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
