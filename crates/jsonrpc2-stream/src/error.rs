use jsonrpc2_message::MessageError;

/// Errors that can occur while reading or writing messages.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The cancellation token fired before the operation completed.
    #[error("operation cancelled")]
    Cancelled,

    /// The stream was closed locally.
    #[error("stream closed")]
    Closed,

    /// A header line has no colon or is not valid UTF-8.
    #[error("invalid header line {0:?}")]
    InvalidHeader(String),

    /// The header block ended without a `Content-Length` header.
    #[error("missing Content-Length header")]
    MissingContentLength,

    /// `Content-Length` is not a positive decimal integer.
    #[error("invalid Content-Length: {0:?}")]
    InvalidContentLength(String),

    /// The header block grew past the configured limit without ending.
    #[error("header block too large ({size} bytes, max {max})")]
    HeaderTooLarge { size: usize, max: usize },

    /// Raw mode found a byte that cannot start a message.
    #[error("unexpected byte 0x{found:02x} between messages")]
    UnexpectedByte { found: u8 },

    /// The message body exceeds the configured maximum size.
    #[error("message too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The body was read but is not a valid JSON-RPC message.
    #[error("malformed message: {0}")]
    Message(#[from] MessageError),

    /// The outgoing message could not be serialized.
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    /// An I/O error occurred on the connection.
    #[error("stream I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the connection between messages.
    #[error("connection closed")]
    ConnectionClosed,

    /// The peer closed the connection in the middle of a message.
    #[error("connection closed mid-message ({buffered} bytes buffered)")]
    Truncated { buffered: usize },
}

/// Broad error categories; each calls for a different recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// The caller cancelled. Nothing is wrong with the stream.
    Cancelled,
    /// The peer sent something unreadable. Stream position may be lost.
    Corrupt,
    /// The connection is gone or unusable.
    Disconnected,
}

impl StreamError {
    /// Classify the error for recovery decisions.
    pub fn class(&self) -> ErrorClass {
        match self {
            StreamError::Cancelled => ErrorClass::Cancelled,
            StreamError::InvalidHeader(_)
            | StreamError::MissingContentLength
            | StreamError::InvalidContentLength(_)
            | StreamError::HeaderTooLarge { .. }
            | StreamError::UnexpectedByte { .. }
            | StreamError::PayloadTooLarge { .. }
            | StreamError::Message(_)
            | StreamError::Encode(_) => ErrorClass::Corrupt,
            StreamError::Closed
            | StreamError::Io(_)
            | StreamError::ConnectionClosed
            | StreamError::Truncated { .. } => ErrorClass::Disconnected,
        }
    }

    /// Returns true if the operation was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.class() == ErrorClass::Cancelled
    }

    /// Returns true if the error came from a framing or header problem.
    pub fn is_framing(&self) -> bool {
        matches!(
            self,
            StreamError::InvalidHeader(_)
                | StreamError::MissingContentLength
                | StreamError::InvalidContentLength(_)
                | StreamError::HeaderTooLarge { .. }
                | StreamError::UnexpectedByte { .. }
                | StreamError::PayloadTooLarge { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, StreamError>;
