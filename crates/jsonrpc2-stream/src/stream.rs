use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use jsonrpc2_message::Message;
use jsonrpc2_transport::{is_already_disconnected, Connection, Halves};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::codec::{Framer, StreamConfig};
use crate::error::{Result, StreamError};
use crate::reader::MessageReader;
use crate::writer::MessageWriter;

/// Transport mechanics beneath a JSON-RPC connection.
///
/// Each successful `read` or `write` moves exactly one whole message. One
/// reader and one writer may use a stream at the same time; concurrent
/// readers (or concurrent writers) are serialized.
pub trait Stream: Send + Sync {
    /// Read the next message and the number of wire bytes it took.
    fn read(&self, cancel: &CancellationToken) -> Result<(Message, usize)>;

    /// Send one message and return the number of wire bytes written.
    fn write(&self, cancel: &CancellationToken, message: &Message) -> Result<usize>;

    /// Close the connection. Blocked reads and writes return errors.
    fn close(&self) -> Result<()>;
}

impl<S: Stream + ?Sized> Stream for Arc<S> {
    fn read(&self, cancel: &CancellationToken) -> Result<(Message, usize)> {
        (**self).read(cancel)
    }

    fn write(&self, cancel: &CancellationToken, message: &Message) -> Result<usize> {
        (**self).write(cancel, message)
    }

    fn close(&self) -> Result<()> {
        (**self).close()
    }
}

impl<S: Stream + ?Sized> Stream for Box<S> {
    fn read(&self, cancel: &CancellationToken) -> Result<(Message, usize)> {
        (**self).read(cancel)
    }

    fn write(&self, cancel: &CancellationToken, message: &Message) -> Result<usize> {
        (**self).write(cancel, message)
    }

    fn close(&self) -> Result<()> {
        (**self).close()
    }
}

/// A [`Stream`] over a live [`Connection`].
///
/// The connection is split into a read handle, a write handle and a control
/// handle. The read and write sides sit behind their own locks, which are
/// uncontended under the one-reader/one-writer discipline; `close` goes
/// through the control handle and never waits for either lock.
pub struct MessageStream<C> {
    reader: Mutex<MessageReader<C>>,
    writer: Mutex<MessageWriter<C>>,
    control: C,
    closed: AtomicBool,
    framer: Framer,
}

impl<C: Connection> MessageStream<C> {
    /// Wrap a connection.
    pub fn new(conn: C, config: StreamConfig) -> Result<Self> {
        let Halves {
            reader,
            writer,
            control,
        } = Halves::split(conn)?;

        if let Some(interval) = config.cancel_poll_interval {
            reader.set_read_timeout(Some(interval))?;
        }
        if let Some(timeout) = config.write_timeout {
            writer.set_write_timeout(Some(timeout))?;
        }

        debug!(
            transport = control.transport_name(),
            framer = %config.framer,
            "opened message stream"
        );

        Ok(Self {
            reader: Mutex::new(MessageReader::with_config(reader, &config)),
            writer: Mutex::new(MessageWriter::with_config(writer, &config)),
            control,
            closed: AtomicBool::new(false),
            framer: config.framer,
        })
    }

    pub fn framer(&self) -> Framer {
        self.framer
    }

    /// Returns true once `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(StreamError::Closed);
        }
        Ok(())
    }

    /// Errors caused by our own `close` are reported as `Closed`.
    fn after_close(&self, err: StreamError) -> StreamError {
        if self.is_closed() && !err.is_cancelled() {
            StreamError::Closed
        } else {
            err
        }
    }
}

impl<C: Connection> Stream for MessageStream<C> {
    fn read(&self, cancel: &CancellationToken) -> Result<(Message, usize)> {
        self.ensure_open()?;
        if cancel.is_cancelled() {
            return Err(StreamError::Cancelled);
        }
        lock(&self.reader)
            .read_message_cancellable(cancel)
            .map_err(|err| self.after_close(err))
    }

    fn write(&self, cancel: &CancellationToken, message: &Message) -> Result<usize> {
        self.ensure_open()?;
        if cancel.is_cancelled() {
            return Err(StreamError::Cancelled);
        }
        lock(&self.writer)
            .write_message_cancellable(cancel, message)
            .map_err(|err| self.after_close(err))
    }

    fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        debug!(transport = self.control.transport_name(), "closing message stream");
        match self.control.shutdown() {
            Ok(()) => Ok(()),
            Err(err) if is_already_disconnected(&err) => Ok(()),
            Err(err) => Err(StreamError::Io(err)),
        }
    }
}

impl<C> std::fmt::Debug for MessageStream<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageStream")
            .field("framer", &self.framer)
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Framer {
    /// Wrap a connection using this framer and otherwise default settings.
    pub fn wrap<C: Connection>(self, conn: C) -> Result<MessageStream<C>> {
        MessageStream::new(conn, StreamConfig::with_framer(self))
    }

    /// Wrap a connection with an explicit configuration. The framer in
    /// `config` is replaced by `self`.
    pub fn wrap_with_config<C: Connection>(
        self,
        conn: C,
        config: StreamConfig,
    ) -> Result<MessageStream<C>> {
        MessageStream::new(
            conn,
            StreamConfig {
                framer: self,
                ..config
            },
        )
    }

    /// Wrap a connection and erase its type.
    pub fn boxed<C: Connection>(self, conn: C) -> Result<Box<dyn Stream>> {
        Ok(Box::new(self.wrap(conn)?))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::io::{Read, Write};
    use std::os::unix::net::UnixStream;
    use std::time::{Duration, Instant};

    use jsonrpc2_message::{Notification, Request, Response};

    use super::*;
    use crate::error::ErrorClass;

    fn pair(framer: Framer) -> (MessageStream<UnixStream>, MessageStream<UnixStream>) {
        let (left, right) = UnixStream::pair().unwrap();
        (framer.wrap(left).unwrap(), framer.wrap(right).unwrap())
    }

    #[test]
    fn roundtrip_over_socket_pair() {
        for framer in [Framer::Raw, Framer::Header] {
            let (client, server) = pair(framer);
            let cancel = CancellationToken::new();
            let sent: Message = Request::with_params(1, "add", &[2, 3]).unwrap().into();

            let written = client.write(&cancel, &sent).unwrap();
            let (received, read) = server.read(&cancel).unwrap();
            assert_eq!(received, sent);
            assert_eq!(read, written);
        }
    }

    #[test]
    fn concurrent_reader_and_writer() {
        let (client, server) = pair(Framer::Header);
        let client = Arc::new(client);
        let cancel = CancellationToken::new();

        let reader = {
            let client = Arc::clone(&client);
            let cancel = cancel.clone();
            std::thread::spawn(move || {
                (0..32)
                    .map(|_| client.read(&cancel).unwrap().0)
                    .collect::<Vec<_>>()
            })
        };

        let echo = std::thread::spawn(move || {
            let cancel = CancellationToken::new();
            for _ in 0..32 {
                let (message, _) = server.read(&cancel).unwrap();
                let Message::Request(req) = message else {
                    panic!("expected request");
                };
                let reply = Response::result(req.id, &req.method).unwrap();
                server.write(&cancel, &reply.into()).unwrap();
            }
        });

        for i in 0..32i64 {
            let req = Request::new(i, format!("m{i}"), None);
            client.write(&cancel, &req.into()).unwrap();
        }

        echo.join().unwrap();
        let replies = reader.join().unwrap();
        for (i, reply) in replies.iter().enumerate() {
            assert_eq!(reply.id(), Some(&jsonrpc2_message::Id::Number(i as i64)));
        }
    }

    #[test]
    fn close_unblocks_pending_read() {
        let (client, _server) = pair(Framer::Header);
        let client = Arc::new(client);

        let reader = {
            let client = Arc::clone(&client);
            std::thread::spawn(move || client.read(&CancellationToken::new()))
        };

        std::thread::sleep(Duration::from_millis(50));
        let started = Instant::now();
        client.close().unwrap();
        let result = reader.join().unwrap();

        assert!(matches!(result, Err(StreamError::Closed)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn closed_stream_rejects_calls() {
        let (client, _server) = pair(Framer::Raw);
        client.close().unwrap();
        client.close().unwrap();
        assert!(client.is_closed());

        let cancel = CancellationToken::new();
        let note: Message = Notification::new("late", None).into();
        assert!(matches!(client.write(&cancel, &note), Err(StreamError::Closed)));
        assert!(matches!(client.read(&cancel), Err(StreamError::Closed)));
    }

    #[test]
    fn precancelled_read_consumes_nothing() {
        let (left, mut right) = UnixStream::pair().unwrap();
        let stream = Framer::Header.wrap(left).unwrap();
        let message: Message = Notification::new("queued", None).into();

        let mut wire = bytes::BytesMut::new();
        crate::codec::encode_message(Framer::Header, &message, &mut wire, usize::MAX).unwrap();
        right.write_all(&wire).unwrap();

        let cancelled = CancellationToken::new();
        cancelled.cancel();
        assert!(matches!(stream.read(&cancelled), Err(StreamError::Cancelled)));

        let (received, size) = stream.read(&CancellationToken::new()).unwrap();
        assert_eq!(received, message);
        assert_eq!(size, wire.len());
    }

    #[test]
    fn cancellation_interrupts_idle_read_when_polling() {
        let (left, _right) = UnixStream::pair().unwrap();
        let config = StreamConfig {
            cancel_poll_interval: Some(Duration::from_millis(10)),
            ..StreamConfig::default()
        };
        let stream = Arc::new(Framer::Raw.wrap_with_config(left, config).unwrap());
        let cancel = CancellationToken::new();

        let reader = {
            let stream = Arc::clone(&stream);
            let cancel = cancel.clone();
            std::thread::spawn(move || stream.read(&cancel))
        };

        std::thread::sleep(Duration::from_millis(50));
        cancel.cancel();
        let result = reader.join().unwrap();
        assert!(matches!(result, Err(StreamError::Cancelled)));
        assert!(!stream.is_closed());
    }

    #[test]
    fn write_timeout_fires_when_peer_stops_reading() {
        let (left, _right) = UnixStream::pair().unwrap();
        let config = StreamConfig {
            write_timeout: Some(Duration::from_millis(50)),
            ..StreamConfig::default()
        };
        let stream = Framer::Raw.wrap_with_config(left, config).unwrap();
        let bulk = "x".repeat(4 * 1024 * 1024);
        let message: Message = Notification::with_params("bulk", &bulk).unwrap().into();

        let (done_tx, done_rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let result = stream.write(&CancellationToken::new(), &message);
            let _ = done_tx.send(result);
        });

        let result = done_rx
            .recv_timeout(Duration::from_secs(10))
            .expect("write should give up once the timeout expires");
        let err = result.unwrap_err();
        assert!(
            matches!(&err, StreamError::Io(e) if matches!(e.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut)),
            "{err}"
        );
        assert_eq!(err.class(), ErrorClass::Disconnected);
    }

    #[test]
    fn peer_hangup_reports_connection_closed() {
        let (left, right) = UnixStream::pair().unwrap();
        let stream = Framer::Raw.wrap(left).unwrap();
        drop(right);
        let err = stream.read(&CancellationToken::new()).unwrap_err();
        assert!(matches!(err, StreamError::ConnectionClosed));
    }

    #[test]
    fn peer_hangup_mid_body_is_truncated() {
        let (left, mut right) = UnixStream::pair().unwrap();
        let stream = Framer::Header.wrap(left).unwrap();
        right
            .write_all(b"Content-Length: 50\r\n\r\n{\"jsonrpc\":\"2.0\"")
            .unwrap();
        drop(right);
        let err = stream.read(&CancellationToken::new()).unwrap_err();
        assert!(matches!(err, StreamError::Truncated { .. }));
    }

    #[test]
    fn boxed_stream_writes_to_peer() {
        let (left, mut right) = UnixStream::pair().unwrap();
        let stream: Box<dyn Stream> = Framer::Raw.boxed(left).unwrap();
        let note: Message = Notification::new("n", None).into();
        let written = stream.write(&CancellationToken::new(), &note).unwrap();

        let mut buf = vec![0u8; written];
        right.read_exact(&mut buf).unwrap();
        assert_eq!(buf, br#"{"jsonrpc":"2.0","method":"n"}"#);
        stream.close().unwrap();
    }
}
