use std::io::{self, Read, Write};
use std::time::Duration;

/// A connected, bidirectional byte stream that can be split into handles.
///
/// Every handle returned by [`Connection::try_clone`] refers to the same
/// underlying connection. Shutting down through one handle unblocks reads
/// and writes in progress on the others.
pub trait Connection: Read + Write + Send + Sync + 'static {
    /// Create another handle to the same connection.
    fn try_clone(&self) -> io::Result<Self>
    where
        Self: Sized;

    /// Shut down both directions of the connection.
    fn shutdown(&self) -> io::Result<()>;

    /// Set the read timeout on the underlying connection.
    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()>;

    /// Set the write timeout on the underlying connection.
    fn set_write_timeout(&self, timeout: Option<Duration>) -> io::Result<()>;

    /// Transport name for diagnostics.
    fn transport_name(&self) -> &'static str;
}

/// The three handles a stream keeps on one connection.
#[derive(Debug)]
pub struct Halves<C> {
    /// Handle used only by the reading side.
    pub reader: C,
    /// Handle used only by the writing side.
    pub writer: C,
    /// Handle used to shut the connection down.
    pub control: C,
}

impl<C: Connection> Halves<C> {
    /// Split a connection into reader, writer and control handles.
    pub fn split(conn: C) -> io::Result<Self> {
        let reader = conn.try_clone()?;
        let control = conn.try_clone()?;
        Ok(Self {
            reader,
            writer: conn,
            control,
        })
    }
}

/// Returns true when a shutdown error only reports that the peer already went away.
pub fn is_already_disconnected(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotConnected | io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset
    )
}

#[cfg(all(test, unix))]
mod tests {
    use std::io::{Read, Write};
    use std::os::unix::net::UnixStream;

    use super::*;

    #[test]
    fn split_handles_share_connection() {
        let (left, mut right) = UnixStream::pair().unwrap();
        let mut halves = Halves::split(left).unwrap();

        halves.writer.write_all(b"ping").unwrap();
        let mut buf = [0u8; 4];
        right.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ping");

        right.write_all(b"pong").unwrap();
        halves.reader.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"pong");
    }

    #[test]
    fn disconnect_kinds() {
        assert!(is_already_disconnected(&io::Error::from(
            io::ErrorKind::NotConnected
        )));
        assert!(!is_already_disconnected(&io::Error::from(
            io::ErrorKind::PermissionDenied
        )));
    }
}
