use std::io;
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use tracing::debug;

use crate::connection::Connection;

impl Connection for TcpStream {
    fn try_clone(&self) -> io::Result<Self> {
        TcpStream::try_clone(self)
    }

    fn shutdown(&self) -> io::Result<()> {
        debug!(peer = ?self.peer_addr().ok(), "shutting down tcp connection");
        TcpStream::shutdown(self, Shutdown::Both)
    }

    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        TcpStream::set_read_timeout(self, timeout)
    }

    fn set_write_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        TcpStream::set_write_timeout(self, timeout)
    }

    fn transport_name(&self) -> &'static str {
        "tcp"
    }
}
