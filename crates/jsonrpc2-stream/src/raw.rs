//! Unframed JSON framing.
//!
//! Messages are written back to back with no separator. The reader finds
//! each boundary with an incremental scanner that tracks string, escape and
//! nesting state across reads, so every buffered byte is looked at once.
//! There is no resynchronization: a value that never closes swallows the
//! rest of the stream.

use bytes::{BufMut, BytesMut};
use jsonrpc2_message::{decode_message, Message};
use tracing::warn;

use crate::error::{Result, StreamError};

/// Incremental boundary finder for concatenated JSON objects.
///
/// Offsets are relative to the front of the buffer being scanned; the
/// scanner resets itself after each complete value, when the caller is
/// expected to consume that value from the buffer.
#[derive(Debug, Default, Clone)]
pub struct RawScanner {
    scanned: usize,
    start: Option<usize>,
    depth: usize,
    in_string: bool,
    escaped: bool,
}

/// Location of one complete value in the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueSpan {
    /// First byte of the value (after leading whitespace).
    pub start: usize,
    /// One past the last byte of the value.
    pub end: usize,
}

impl RawScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue scanning `buf` from where the previous call stopped.
    pub fn scan(&mut self, buf: &[u8]) -> Result<Option<ValueSpan>> {
        while self.scanned < buf.len() {
            let b = buf[self.scanned];

            let Some(start) = self.start else {
                match b {
                    b' ' | b'\t' | b'\r' | b'\n' => {}
                    b'{' | b'[' => {
                        self.start = Some(self.scanned);
                        self.depth = 1;
                    }
                    found => {
                        warn!(byte = found, offset = self.scanned, "unexpected byte between messages");
                        return Err(StreamError::UnexpectedByte { found });
                    }
                }
                self.scanned += 1;
                continue;
            };
            self.scanned += 1;

            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if b == b'\\' {
                    self.escaped = true;
                } else if b == b'"' {
                    self.in_string = false;
                }
                continue;
            }

            match b {
                b'"' => self.in_string = true,
                b'{' | b'[' => self.depth += 1,
                b'}' | b']' => {
                    self.depth -= 1;
                    if self.depth == 0 {
                        let span = ValueSpan {
                            start,
                            end: self.scanned,
                        };
                        *self = Self::default();
                        return Ok(Some(span));
                    }
                }
                _ => {}
            }
        }
        Ok(None)
    }

    /// Start of the value currently being scanned, if one has begun.
    pub fn value_start(&self) -> Option<usize> {
        self.start
    }
}

/// Decode one unframed message from the front of `src`.
///
/// The returned size covers the value and any whitespace before it. A
/// complete value that fails classification is consumed before the error is
/// returned. Buffered bytes that do not yet form a value, leading whitespace
/// included, count against `max_message_size`.
pub fn decode_raw_message(
    src: &mut BytesMut,
    scanner: &mut RawScanner,
    max_message_size: usize,
) -> Result<Option<(Message, usize)>> {
    let Some(span) = scanner.scan(src)? else {
        let pending = scanner
            .value_start()
            .map_or(src.len(), |start| src.len() - start);
        if pending > max_message_size {
            return Err(StreamError::PayloadTooLarge {
                size: pending,
                max: max_message_size,
            });
        }
        return Ok(None);
    };

    let frame = src.split_to(span.end);
    let size = span.end - span.start;
    if size > max_message_size {
        return Err(StreamError::PayloadTooLarge {
            size,
            max: max_message_size,
        });
    }
    let message = decode_message(&frame[span.start..])?;
    Ok(Some((message, span.end)))
}

/// Encode a message as compact JSON into `dst`.
///
/// Returns the number of bytes appended.
pub fn encode_raw_message(
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
    dst.put_slice(&body);
    Ok(body.len())
}

#[cfg(test)]
mod tests {
    use jsonrpc2_message::{MessageKind, Request, Response};

    use super::*;
    use crate::codec::DEFAULT_MAX_MESSAGE;

    fn scan_all(input: &[u8]) -> Vec<ValueSpan> {
        let mut scanner = RawScanner::new();
        let mut spans = Vec::new();
        let mut offset = 0;
        while let Some(span) = scanner.scan(&input[offset..]).unwrap() {
            spans.push(ValueSpan {
                start: offset + span.start,
                end: offset + span.end,
            });
            offset += span.end;
        }
        spans
    }

    #[test]
    fn finds_concatenated_objects() {
        let input = br#"{"a":1}{"b":[1,{"c":2}]}  {"d":{}}"#;
        let spans = scan_all(input);
        let values: Vec<&[u8]> = spans.iter().map(|s| &input[s.start..s.end]).collect();
        assert_eq!(
            values,
            [
                &br#"{"a":1}"#[..],
                &br#"{"b":[1,{"c":2}]}"#[..],
                &br#"{"d":{}}"#[..]
            ]
        );
    }

    #[test]
    fn braces_inside_strings_are_ignored() {
        let input = br#"{"s":"}{]\"}"}{"t":"\\"}"#;
        let spans = scan_all(input);
        assert_eq!(spans.len(), 2);
        assert_eq!(&input[spans[0].start..spans[0].end], br#"{"s":"}{]\"}"}"#);
        assert_eq!(&input[spans[1].start..spans[1].end], br#"{"t":"\\"}"#);
    }

    #[test]
    fn resumes_across_partial_input() {
        let input = br#"  {"method":"x","params":"{"}"#;
        let mut scanner = RawScanner::new();
        for cut in 1..input.len() {
            assert!(scanner.scan(&input[..cut]).unwrap().is_none(), "cut {cut}");
        }
        let span = scanner.scan(input).unwrap().unwrap();
        assert_eq!(span, ValueSpan { start: 2, end: input.len() });
    }

    #[test]
    fn rejects_scalars_between_messages() {
        let mut scanner = RawScanner::new();
        let err = scanner.scan(b" 42").unwrap_err();
        assert!(matches!(err, StreamError::UnexpectedByte { found: b'4' }));
    }

    #[test]
    fn decodes_back_to_back_messages() {
        let first = Message::from(Request::new(1, "a", None));
        let second = Message::from(Response::result(1, &"done").unwrap());
        let mut src = BytesMut::new();
        encode_raw_message(&first, &mut src, DEFAULT_MAX_MESSAGE).unwrap();
        src.put_slice(b"\n");
        encode_raw_message(&second, &mut src, DEFAULT_MAX_MESSAGE).unwrap();

        let mut scanner = RawScanner::new();
        let (m1, n1) = decode_raw_message(&mut src, &mut scanner, DEFAULT_MAX_MESSAGE)
            .unwrap()
            .unwrap();
        let (m2, n2) = decode_raw_message(&mut src, &mut scanner, DEFAULT_MAX_MESSAGE)
            .unwrap()
            .unwrap();
        assert_eq!(m1, first);
        assert_eq!(m2, second);
        assert_eq!(n1, first.to_vec().unwrap().len());
        assert_eq!(n2, second.to_vec().unwrap().len() + 1);
        assert!(src.is_empty());
    }

    #[test]
    fn unclassifiable_value_is_consumed() {
        let mut src = BytesMut::from(&br#"{"jsonrpc":"2.0","id":1}{"jsonrpc":"2.0","method":"ok"}"#[..]);
        let mut scanner = RawScanner::new();
        assert!(decode_raw_message(&mut src, &mut scanner, DEFAULT_MAX_MESSAGE).is_err());
        let (message, _) = decode_raw_message(&mut src, &mut scanner, DEFAULT_MAX_MESSAGE)
            .unwrap()
            .unwrap();
        assert_eq!(message.kind(), MessageKind::Notification);
    }

    #[test]
    fn malformed_json_inside_balanced_braces_is_consumed() {
        let mut src = BytesMut::from(&br#"{"jsonrpc" "2.0"}{"jsonrpc":"2.0","method":"ok"}"#[..]);
        let mut scanner = RawScanner::new();
        let err = decode_raw_message(&mut src, &mut scanner, DEFAULT_MAX_MESSAGE).unwrap_err();
        assert!(matches!(err, StreamError::Message(_)));
        assert!(decode_raw_message(&mut src, &mut scanner, DEFAULT_MAX_MESSAGE)
            .unwrap()
            .is_some());
    }

    #[test]
    fn pending_value_over_limit_rejected() {
        let mut src = BytesMut::from(&br#"{"jsonrpc":"2.0","method":"#[..]);
        let mut scanner = RawScanner::new();
        let err = decode_raw_message(&mut src, &mut scanner, 8).unwrap_err();
        assert!(matches!(err, StreamError::PayloadTooLarge { max: 8, .. }));
    }

    #[test]
    fn whitespace_only_needs_more() {
        let mut src = BytesMut::from(&b" \r\n\t"[..]);
        let mut scanner = RawScanner::new();
        assert!(decode_raw_message(&mut src, &mut scanner, DEFAULT_MAX_MESSAGE)
            .unwrap()
            .is_none());
        assert_eq!(src.len(), 4);
    }

    #[test]
    fn whitespace_flood_hits_limit() {
        let mut src = BytesMut::from(&[b' '; 64][..]);
        let mut scanner = RawScanner::new();
        let err = decode_raw_message(&mut src, &mut scanner, 32).unwrap_err();
        assert!(matches!(err, StreamError::PayloadTooLarge { size: 64, max: 32 }));
    }

    #[test]
    fn whitespace_before_value_does_not_count_once_value_starts() {
        let mut src = BytesMut::from(&b"        {\"jsonrpc\":\"2.0\""[..]);
        let mut scanner = RawScanner::new();
        assert!(decode_raw_message(&mut src, &mut scanner, 20)
            .unwrap()
            .is_none());
    }
}
