use std::fmt;
use std::io;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use tracing::{debug, trace};

use crate::connection::handle::Handle;
use crate::protocol::{SockError, StreamEvent};
use crate::transport::ConnectionIo;

/// The read loop of a connection: one blocking read of up to `capacity` bytes per event.
///
/// Emits `Data` for every successful read, then exactly one terminal event. End of input
/// shuts the read side and completes the stream, so a peer that half-closed can still be
/// answered; the connection is released once its last owner drops. A read error closes it and
/// fails the stream. Dropping the stream early leaves the connection open for its writers.
pub struct ByteStream<C: ConnectionIo> {
    handle: Arc<Handle<C>>,
    buffer: BytesMut,
    capacity: usize,
    finished: bool,
}

impl<C: ConnectionIo> fmt::Debug for ByteStream<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteStream")
            .field("connection", &self.handle.id())
            .field("capacity", &self.capacity)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl<C: ConnectionIo> ByteStream<C> {
    pub(crate) fn new(handle: Arc<Handle<C>>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { handle, buffer: BytesMut::with_capacity(capacity), capacity, finished: false }
    }

    pub fn connection_id(&self) -> u64 {
        self.handle.id()
    }

    fn end_of_input(&mut self) {
        self.finished = true;
        if let Err(e) = self.handle.close_read() {
            debug!(connection = self.handle.id(), cause = %e, "failed to shut the read side");
        }
    }

    fn fail(&mut self) {
        self.finished = true;
        if let Err(e) = self.handle.close() {
            debug!(connection = self.handle.id(), cause = %e, "failed to close connection");
        }
    }
}

impl<C: ConnectionIo> Iterator for ByteStream<C> {
    type Item = StreamEvent<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            self.buffer.resize(self.capacity, 0);
            match self.handle.read(&mut self.buffer) {
                Ok(0) => {
                    trace!(connection = self.handle.id(), "end of input");
                    self.end_of_input();
                    return Some(StreamEvent::Completed);
                }
                Ok(n) => {
                    self.buffer.truncate(n);
                    trace!(connection = self.handle.id(), size = n, "read chunk");
                    return Some(StreamEvent::Data(self.buffer.split().freeze()));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    debug!(connection = self.handle.id(), cause = %e, "read failed");
                    self.fail();
                    return Some(StreamEvent::Failed(SockError::io(e)));
                }
            }
        }
    }
}
