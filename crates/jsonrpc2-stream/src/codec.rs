use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use bytes::BytesMut;
use jsonrpc2_message::Message;

use crate::error::Result;
use crate::header::{decode_header_message, encode_header_message, HeaderBlock};
use crate::raw::{decode_raw_message, encode_raw_message, RawScanner};

/// Default maximum message body size: 16 MiB.
pub const DEFAULT_MAX_MESSAGE: usize = 16 * 1024 * 1024;

/// Default maximum header block size: 8 KiB.
pub const DEFAULT_MAX_HEADER: usize = 8 * 1024;

/// Wire convention used to mark message boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Framer {
    /// Bare concatenated JSON; boundaries come from the JSON grammar.
    Raw,
    /// `Content-Length` header block before every body (LSP style).
    #[default]
    Header,
}

impl Framer {
    pub fn as_str(self) -> &'static str {
        match self {
            Framer::Raw => "raw",
            Framer::Header => "header",
        }
    }
}

impl fmt::Display for Framer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Framer {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "raw" => Ok(Framer::Raw),
            "header" | "framed" | "lsp" => Ok(Framer::Header),
            other => Err(format!("unknown framing '{other}' (expected 'raw' or 'header')")),
        }
    }
}

/// Configuration for message streams and codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    /// Wire convention. Default: header.
    pub framer: Framer,
    /// Maximum message body size in bytes. Default: 16 MiB.
    pub max_message_size: usize,
    /// Maximum header block size in bytes (header framing only). Default: 8 KiB.
    pub max_header_size: usize,
    /// Write timeout applied to the connection.
    pub write_timeout: Option<Duration>,
    /// When set, blocking reads wake up at this interval to re-check
    /// cancellation. When unset, cancellation is only noticed between reads.
    pub cancel_poll_interval: Option<Duration>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            framer: Framer::default(),
            max_message_size: DEFAULT_MAX_MESSAGE,
            max_header_size: DEFAULT_MAX_HEADER,
            write_timeout: None,
            cancel_poll_interval: None,
        }
    }
}

impl StreamConfig {
    /// Default configuration with an explicit framer.
    pub fn with_framer(framer: Framer) -> Self {
        Self {
            framer,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
enum DecodeState {
    Raw(RawScanner),
    Header(Option<HeaderBlock>),
}

/// Framing state machine shared by the blocking reader and the async codec.
#[derive(Debug, Clone)]
pub struct MessageDecoder {
    state: DecodeState,
    max_message_size: usize,
    max_header_size: usize,
}

impl MessageDecoder {
    pub fn new(config: &StreamConfig) -> Self {
        let state = match config.framer {
            Framer::Raw => DecodeState::Raw(RawScanner::new()),
            Framer::Header => DecodeState::Header(None),
        };
        Self {
            state,
            max_message_size: config.max_message_size,
            max_header_size: config.max_header_size,
        }
    }

    pub fn framer(&self) -> Framer {
        match self.state {
            DecodeState::Raw(_) => Framer::Raw,
            DecodeState::Header(_) => Framer::Header,
        }
    }

    /// Decode the next message from the front of `src`.
    ///
    /// Returns `Ok(None)` if `src` does not hold a complete message yet. On
    /// success the message bytes are consumed and the wire size is returned
    /// alongside the message.
    pub fn decode(&mut self, src: &mut BytesMut) -> Result<Option<(Message, usize)>> {
        match &mut self.state {
            DecodeState::Raw(scanner) => decode_raw_message(src, scanner, self.max_message_size),
            DecodeState::Header(pending) => {
                decode_header_message(src, pending, self.max_message_size, self.max_header_size)
            }
        }
    }
}

/// Encode one message for the given framer into `dst`.
///
/// Returns the number of bytes appended.
pub fn encode_message(
    framer: Framer,
    message: &Message,
    dst: &mut BytesMut,
    max_message_size: usize,
) -> Result<usize> {
    match framer {
        Framer::Raw => encode_raw_message(message, dst, max_message_size),
        Framer::Header => encode_header_message(message, dst, max_message_size),
    }
}
