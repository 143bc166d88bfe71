//! [`tokio_util::codec`] adapter over the same framing state machine used by
//! the blocking reader and writer.
//!
//! ```rust,ignore
//! use futures_util::{SinkExt, StreamExt};
//! use jsonrpc2_stream::tokio_codec::framed;
//!
//! let mut conn = framed(socket, &StreamConfig::default());
//! conn.send(message).await?;
//! let reply = conn.next().await.transpose()?;
//! ```

use bytes::BytesMut;
use jsonrpc2_message::Message;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Decoder, Encoder, Framed};
use tracing::trace;

use crate::codec::{encode_message, Framer, MessageDecoder, StreamConfig};
use crate::error::{Result, StreamError};

/// Decoder and encoder for JSON-RPC messages in either framing.
#[derive(Debug, Clone)]
pub struct JsonRpcCodec {
    decoder: MessageDecoder,
    max_message_size: usize,
}

impl JsonRpcCodec {
    pub fn new(config: &StreamConfig) -> Self {
        Self {
            decoder: MessageDecoder::new(config),
            max_message_size: config.max_message_size,
        }
    }

    pub fn framer(&self) -> Framer {
        self.decoder.framer()
    }
}

impl Default for JsonRpcCodec {
    fn default() -> Self {
        Self::new(&StreamConfig::default())
    }
}

impl Decoder for JsonRpcCodec {
    type Item = Message;
    type Error = StreamError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>> {
        Ok(self.decoder.decode(src)?.map(|(message, size)| {
            trace!(kind = %message.kind(), size, "decoded message");
            message
        }))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Message>> {
        if let Some(message) = self.decode(src)? {
            return Ok(Some(message));
        }
        if src.iter().all(u8::is_ascii_whitespace) {
            src.clear();
            Ok(None)
        } else {
            Err(StreamError::Truncated {
                buffered: src.len(),
            })
        }
    }
}

impl Encoder<&Message> for JsonRpcCodec {
    type Error = StreamError;

    fn encode(&mut self, message: &Message, dst: &mut BytesMut) -> Result<()> {
        let size = encode_message(self.framer(), message, dst, self.max_message_size)?;
        trace!(kind = %message.kind(), size, "encoded message");
        Ok(())
    }
}

impl Encoder<Message> for JsonRpcCodec {
    type Error = StreamError;

    fn encode(&mut self, message: Message, dst: &mut BytesMut) -> Result<()> {
        <Self as Encoder<&Message>>::encode(self, &message, dst)
    }
}

/// Wrap an async byte stream in a message sink and stream.
pub fn framed<T>(io: T, config: &StreamConfig) -> Framed<T, JsonRpcCodec>
where
    T: AsyncRead + AsyncWrite,
{
    Framed::new(io, JsonRpcCodec::new(config))
}
