//! The blocking socket primitives the pipeline is built on.
//!
//! [`Transport`] is the listening side (`accept`, `wake`), [`ConnectionIo`] one accepted peer
//! (`read`, `write_all`, `shutdown_read`, `close`). Every method takes `&self` so a single handle can be read
//! by its read loop while other threads write to it. [`TcpTransport`] implements both over
//! `std::net`.

mod tcp;
pub use tcp::TcpTransport;

use std::io;
use std::net::SocketAddr;

/// A bound, listening socket.
#[cfg_attr(test, mockall::automock(type Conn = MockConnectionIo;))]
pub trait Transport: Send + Sync + 'static {
    type Conn: ConnectionIo;

    /// Blocks until a peer connects.
    fn accept(&self) -> io::Result<(Self::Conn, SocketAddr)>;

    /// Makes a pending `accept` return, so a thread blocked in it can notice it should stop.
    fn wake(&self) -> io::Result<()>;

    fn local_addr(&self) -> io::Result<SocketAddr>;
}

/// One accepted peer.
#[cfg_attr(test, mockall::automock)]
pub trait ConnectionIo: Send + Sync + 'static {
    /// Blocking read of at most `buf.len()` bytes; `Ok(0)` means the peer closed.
    fn read(&self, buf: &mut [u8]) -> io::Result<usize>;

    /// Blocking write that drains `bytes` completely or fails.
    fn write_all(&self, bytes: &[u8]) -> io::Result<()>;

    /// Stops receiving after the peer finished sending; writes keep working.
    fn shutdown_read(&self) -> io::Result<()>;

    /// Shuts the peer down; blocked reads return once this is called.
    fn close(&self) -> io::Result<()>;
}
