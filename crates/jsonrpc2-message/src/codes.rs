//! Well-known error codes.
//!
//! Codes -32768 to -32000 are reserved by JSON-RPC. The LSP codes below sit
//! inside that range as well.

/// Invalid JSON was received.
pub const PARSE_ERROR: i64 = -32700;

/// The JSON sent is not a valid request object.
pub const INVALID_REQUEST: i64 = -32600;

/// The method does not exist or is not available.
pub const METHOD_NOT_FOUND: i64 = -32601;

/// Invalid method parameters.
pub const INVALID_PARAMS: i64 = -32602;

/// Internal JSON-RPC error.
pub const INTERNAL_ERROR: i64 = -32603;

/// A request arrived before the server was initialized (LSP).
pub const SERVER_NOT_INITIALIZED: i64 = -32002;

/// Unknown error (LSP).
pub const UNKNOWN_ERROR_CODE: i64 = -32001;

/// The request failed although it was syntactically valid (LSP).
pub const REQUEST_FAILED: i64 = -32803;

/// The server cancelled the request (LSP).
pub const SERVER_CANCELLED: i64 = -32802;

/// Document content changed outside the normal conditions (LSP).
pub const CONTENT_MODIFIED: i64 = -32801;

/// The client cancelled the request (LSP).
pub const REQUEST_CANCELLED: i64 = -32800;

/// Returns a human-readable name for a well-known code.
pub fn code_name(code: i64) -> &'static str {
    match code {
        PARSE_ERROR => "ParseError",
        INVALID_REQUEST => "InvalidRequest",
        METHOD_NOT_FOUND => "MethodNotFound",
        INVALID_PARAMS => "InvalidParams",
        INTERNAL_ERROR => "InternalError",
        SERVER_NOT_INITIALIZED => "ServerNotInitialized",
        UNKNOWN_ERROR_CODE => "UnknownErrorCode",
        REQUEST_FAILED => "RequestFailed",
        SERVER_CANCELLED => "ServerCancelled",
        CONTENT_MODIFIED => "ContentModified",
        REQUEST_CANCELLED => "RequestCancelled",
        -32099..=-32000 => "ServerError",
        _ => "ApplicationError",
    }
}

/// Returns true if the code lies in the range reserved by JSON-RPC.
pub fn is_reserved(code: i64) -> bool {
    (-32768..=-32000).contains(&code)
}
