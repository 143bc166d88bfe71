/// Errors that can occur while decoding or building messages.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    /// The bytes are not valid JSON, or a member has the wrong JSON type.
    #[error("invalid JSON message: {0}")]
    Json(#[from] serde_json::Error),

    /// The `jsonrpc` member is missing or is not "2.0".
    #[error("unsupported protocol version {found:?} (expected \"2.0\")")]
    UnsupportedVersion { found: Option<String> },

    /// The object matches none of request, notification or response.
    #[error("unrecognized message shape: {excerpt}")]
    UnknownShape { excerpt: String },

    /// A response carries both `result` and `error`.
    #[error("response {id} carries both result and error")]
    AmbiguousResponse { id: String },

    /// A request or notification has an empty method name.
    #[error("empty method name")]
    EmptyMethod,
}

pub type Result<T> = std::result::Result<T, MessageError>;
