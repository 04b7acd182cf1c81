use std::fmt;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, info};

use crate::transport::ConnectionIo;
use crate::window::Teardown;

/// The shared state of one accepted peer.
///
/// Reads are left unsynchronized (there is a single reader), writes are serialized, and
/// closing happens at most once. The read side can be shut on its own when the peer
/// half-closes.
pub(crate) struct Handle<C: ConnectionIo> {
    io: C,
    id: u64,
    closed: AtomicBool,
    read_closed: AtomicBool,
    write_lock: Mutex<()>,
}

impl<C: ConnectionIo> fmt::Debug for Handle<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle").field("id", &self.id).field("closed", &self.is_closed()).finish_non_exhaustive()
    }
}

impl<C: ConnectionIo> Handle<C> {
    pub(crate) fn new(io: C, id: u64) -> Self {
        Self {
            io,
            id,
            closed: AtomicBool::new(false),
            read_closed: AtomicBool::new(false),
            write_lock: Mutex::new(()),
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.io.read(buf)
    }

    pub(crate) fn write_all(&self, bytes: &[u8]) -> io::Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if self.is_closed() {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "connection closed"));
        }
        self.io.write_all(bytes)
    }

    /// Shuts the read side once; a no-op after a full close.
    pub(crate) fn close_read(&self) -> io::Result<()> {
        if self.is_closed() || self.read_closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        debug!(connection = self.id, "read side closed");
        self.io.shutdown_read()
    }

    /// Closes the peer; only the first call reaches the transport.
    pub(crate) fn close(&self) -> io::Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        info!(connection = self.id, "connection closed");
        self.io.close()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl<C: ConnectionIo> Teardown for Handle<C> {
    fn teardown(&self) {
        if let Err(e) = self.close() {
            debug!(connection = self.id, cause = %e, "teardown could not shut the connection down");
        }
    }
}

impl<C: ConnectionIo> Drop for Handle<C> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            debug!(connection = self.id, cause = %e, "close on drop failed");
        }
    }
}
