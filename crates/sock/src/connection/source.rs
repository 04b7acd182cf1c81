use std::fmt;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info};

use crate::connection::Connection;
use crate::protocol::{SockError, StreamEvent};
use crate::stream::{self, EventStream};
use crate::transport::{TcpTransport, Transport};

/// Turns a listening [`Transport`] into [`Connection`]s.
///
/// Connection ids start at 1 and increase by one per accepted peer. An accept failure is
/// listener-scoped: it ends the source, while every connection accepted so far keeps running.
#[derive(Debug)]
pub struct ConnectionSource<T = TcpTransport> {
    transport: Arc<T>,
    next_id: u64,
}

impl ConnectionSource<TcpTransport> {
    /// Listens on `port` of every IPv4 interface; port 0 picks a free one.
    pub fn bind(port: u16) -> Result<Self, SockError> {
        TcpTransport::bind_port(port).map(Self::new)
    }

    pub fn bind_addr<A: ToSocketAddrs>(address: A) -> Result<Self, SockError> {
        TcpTransport::bind(address).map(Self::new)
    }
}

impl<T: Transport> ConnectionSource<T> {
    pub fn new(transport: T) -> Self {
        Self { transport: Arc::new(transport), next_id: 1 }
    }

    pub fn local_addr(&self) -> Result<SocketAddr, SockError> {
        self.transport.local_addr().map_err(SockError::io)
    }

    /// Blocks until the next peer connects.
    pub fn accept(&mut self) -> Result<Connection<T::Conn>, SockError> {
        let (io, peer) = self.accept_raw()?;
        Ok(self.register(io, peer))
    }

    fn accept_raw(&self) -> Result<(T::Conn, SocketAddr), SockError> {
        loop {
            match self.transport.accept() {
                Ok(accepted) => return Ok(accepted),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    error!(cause = %e, "failed to accept connection, stop listening");
                    return Err(SockError::accept(e));
                }
            }
        }
    }

    fn register(&mut self, io: T::Conn, peer: SocketAddr) -> Connection<T::Conn> {
        let id = self.next_id;
        self.next_id += 1;
        info!(connection = id, peer = %peer, "connection established");
        Connection::new(io, peer, id)
    }

    /// Runs the accept loop on a `sock-accept` worker and hands each connection over.
    ///
    /// The stream fails with [`SockError::Accept`] when the listener does. Each accept waits
    /// until the previous connection has been taken. Dropping the stream stops the worker and
    /// releases the listener.
    pub fn start(self) -> Result<ConnectionStream<T>, SockError> {
        let (mut sink, connections) = stream::rendezvous();
        let stopped = Arc::new(AtomicBool::new(false));
        let transport = Arc::clone(&self.transport);
        let mut source = self;

        let stop = Arc::clone(&stopped);
        let worker = thread::Builder::new()
            .name("sock-accept".into())
            .spawn(move || {
                loop {
                    let accepted = source.accept_raw();
                    if stop.load(Ordering::Acquire) {
                        debug!("connection stream dropped, stop accepting");
                        return;
                    }
                    match accepted {
                        Ok((io, peer)) => {
                            if !sink.next(source.register(io, peer)) {
                                debug!("connection stream dropped, stop accepting");
                                return;
                            }
                        }
                        Err(e) => {
                            sink.fail(e);
                            return;
                        }
                    }
                }
            })
            .map_err(SockError::io)?;

        Ok(ConnectionStream { connections: Some(connections), stopped, transport, worker: Some(worker), ended: false })
    }

    /// Accepts on the calling thread and runs `handler` on a `sock-conn-<id>` worker per
    /// connection. Only returns when accepting fails.
    pub fn serve<H>(mut self, handler: H) -> SockError
    where
        H: Fn(Connection<T::Conn>) + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        loop {
            let connection = match self.accept() {
                Ok(connection) => connection,
                Err(e) => return e,
            };

            let id = connection.id();
            let handler = Arc::clone(&handler);
            if let Err(e) = thread::Builder::new().name(format!("sock-conn-{id}")).spawn(move || handler(connection)) {
                error!(connection = id, cause = %e, "failed to spawn connection worker");
            }
        }
    }
}

/// Connections accepted by the worker behind [`ConnectionSource::start`].
///
/// Dropping it stops that worker and closes the listener, even while the worker is blocked
/// waiting for a peer.
pub struct ConnectionStream<T: Transport = TcpTransport> {
    connections: Option<EventStream<Connection<T::Conn>>>,
    stopped: Arc<AtomicBool>,
    transport: Arc<T>,
    worker: Option<JoinHandle<()>>,
    ended: bool,
}

impl<T: Transport> fmt::Debug for ConnectionStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionStream").field("ended", &self.ended).finish_non_exhaustive()
    }
}

impl<T: Transport> Iterator for ConnectionStream<T> {
    type Item = StreamEvent<Connection<T::Conn>>;

    fn next(&mut self) -> Option<Self::Item> {
        let event = self.connections.as_mut()?.next();
        if event.as_ref().is_none_or(StreamEvent::is_terminal) {
            self.ended = true;
        }
        event
    }
}

impl<T: Transport> ConnectionStream<T> {
    fn wake_worker(&self) -> bool {
        match self.transport.wake() {
            Ok(()) => true,
            Err(e) => {
                debug!(cause = %e, "could not wake the accept loop, leaving it to the next peer");
                false
            }
        }
    }
}

impl<T: Transport> Drop for ConnectionStream<T> {
    fn drop(&mut self) {
        self.stopped.store(true, Ordering::Release);
        // unblocks a worker waiting to hand a connection over
        self.connections = None;

        let Some(worker) = self.worker.take() else { return };
        if !self.ended && !worker.is_finished() && !self.wake_worker() {
            return;
        }
        if worker.join().is_err() {
            debug!("accept loop panicked");
        }
    }
}

/// Binds `port` and starts accepting: the stream of every connection made to it.
pub fn connection_stream(port: u16) -> Result<ConnectionStream, SockError> {
    ConnectionSource::bind(port)?.start()
}
