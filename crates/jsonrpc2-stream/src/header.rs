//! Content-Length framing.
//!
//! Wire format:
//! ```text
//! Content-Length: <decimal-digits>\r\n
//! [Other-Header: value\r\n]*
//! \r\n
//! <body: exactly Content-Length bytes of compact JSON>
//! ```

use bytes::{Buf, BufMut, BytesMut};
use jsonrpc2_message::{decode_message, Message};
use tracing::{trace, warn};

use crate::error::{Result, StreamError};

pub const CONTENT_LENGTH: &str = "Content-Length";
pub const CONTENT_TYPE: &str = "Content-Type";

/// A fully parsed header block still sitting at the front of the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderBlock {
    /// Bytes taken by the header lines including the blank terminator line.
    pub header_len: usize,
    /// Declared body length.
    pub content_length: usize,
}

impl HeaderBlock {
    /// Header plus body.
    pub fn wire_size(&self) -> usize {
        self.header_len + self.content_length
    }
}

/// Parse the header block at the front of `src`.
///
/// Returns `Ok(None)` while the block is still incomplete. Lines are
/// `\n`-terminated; trailing whitespace (including `\r`) is trimmed. An empty
/// line ends the block.
pub fn parse_header_block(
    src: &[u8],
    max_message_size: usize,
    max_header_size: usize,
) -> Result<Option<HeaderBlock>> {
    let mut pos = 0usize;
    let mut content_length = None;

    loop {
        let Some(newline) = src[pos..].iter().position(|&b| b == b'\n') else {
            if src.len() > max_header_size {
                return Err(StreamError::HeaderTooLarge {
                    size: src.len(),
                    max: max_header_size,
                });
            }
            return Ok(None);
        };
        let end = pos + newline + 1;
        if end > max_header_size {
            return Err(StreamError::HeaderTooLarge {
                size: end,
                max: max_header_size,
            });
        }
        let raw_line = &src[pos..end];
        pos = end;

        let line = std::str::from_utf8(raw_line)
            .map_err(|_| StreamError::InvalidHeader(String::from_utf8_lossy(raw_line).into_owned()))?
            .trim();
        if line.is_empty() {
            break;
        }

        let Some((name, value)) = line.split_once(':') else {
            warn!(line, "header line without colon");
            return Err(StreamError::InvalidHeader(line.to_string()));
        };
        let (name, value) = (name.trim(), value.trim());
        trace!(name, value, "header");

        if name.eq_ignore_ascii_case(CONTENT_LENGTH) {
            content_length = Some(parse_content_length(value, max_message_size)?);
        }
    }

    match content_length {
        Some(content_length) => Ok(Some(HeaderBlock {
            header_len: pos,
            content_length,
        })),
        None => {
            warn!("header block without Content-Length");
            Err(StreamError::MissingContentLength)
        }
    }
}

fn parse_content_length(value: &str, max_message_size: usize) -> Result<usize> {
    let invalid = || {
        warn!(value, "invalid Content-Length");
        StreamError::InvalidContentLength(value.to_string())
    };
    let length: i64 = value.parse().map_err(|_| invalid())?;
    if length <= 0 {
        return Err(invalid());
    }
    let length = usize::try_from(length).map_err(|_| invalid())?;
    if length > max_message_size {
        warn!(length, max = max_message_size, "Content-Length over limit");
        return Err(StreamError::PayloadTooLarge {
            size: length,
            max: max_message_size,
        });
    }
    Ok(length)
}

/// Decode one framed message from the front of `src`.
///
/// `pending` caches the parsed header block while the body is still
/// arriving. On success the header and body are consumed and the wire size
/// is returned with the message. A body that fails classification is
/// consumed as well, so the next read starts at the next header block.
pub fn decode_header_message(
    src: &mut BytesMut,
    pending: &mut Option<HeaderBlock>,
    max_message_size: usize,
    max_header_size: usize,
) -> Result<Option<(Message, usize)>> {
    let block = match *pending {
        Some(block) => block,
        None => match parse_header_block(src, max_message_size, max_header_size)? {
            Some(block) => {
                *pending = Some(block);
                block
            }
            None => return Ok(None),
        },
    };

    if src.len() < block.wire_size() {
        src.reserve(block.wire_size() - src.len());
        return Ok(None);
    }

    *pending = None;
    src.advance(block.header_len);
    let body = src.split_to(block.content_length);
    let message = decode_message(&body)?;
    Ok(Some((message, block.wire_size())))
}

/// Encode a message with a Content-Length header into `dst`.
///
/// Returns the number of bytes appended.
pub fn encode_header_message(
    message: &Message,
    dst: &mut BytesMut,
    max_message_size: usize,
) -> Result<usize> {
    let body = serde_json::to_vec(message).map_err(StreamError::Encode)?;
    if body.len() > max_message_size {
        return Err(StreamError::PayloadTooLarge {
            size: body.len(),
            max: max_message_size,
        });
    }

    let header = format!("{CONTENT_LENGTH}: {}\r\n\r\n", body.len());
    dst.reserve(header.len() + body.len());
    dst.put_slice(header.as_bytes());
    dst.put_slice(&body);
    Ok(header.len() + body.len())
}
