use std::fmt;
use std::thread::{self, JoinHandle};

use tracing::{debug, info};

use crate::codec::Tokens;
use crate::connection::ByteStream;
use crate::protocol::{SockError, Token};
use crate::stream::Multicast;
use crate::transport::ConnectionIo;

/// A connection's token stream together with its subscribers, ready to be driven.
pub struct Pipeline<C: ConnectionIo> {
    id: u64,
    source: Tokens<ByteStream<C>>,
    multicast: Multicast<Token>,
}

impl<C: ConnectionIo> fmt::Debug for Pipeline<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline").field("connection", &self.id).field("multicast", &self.multicast).finish_non_exhaustive()
    }
}

impl<C: ConnectionIo> Pipeline<C> {
    pub(crate) fn new(id: u64, source: Tokens<ByteStream<C>>, multicast: Multicast<Token>) -> Self {
        Self { id, source, multicast }
    }

    pub fn connection_id(&self) -> u64 {
        self.id
    }

    /// Drives the read loop on the current thread until every subscriber is done.
    pub fn run(self) -> Result<(), SockError> {
        let Self { id, source, multicast } = self;
        debug!(connection = id, subscribers = multicast.len(), "pipeline started");

        let result = multicast.drive(source);
        match &result {
            Ok(()) => debug!(connection = id, "pipeline finished"),
            Err(e) => info!(connection = id, cause = %e, "pipeline stopped"),
        }
        result
    }

    /// Runs the pipeline on a new `sock-conn-<id>` worker.
    pub fn spawn(self) -> Result<JoinHandle<Result<(), SockError>>, SockError> {
        thread::Builder::new().name(format!("sock-conn-{}", self.id)).spawn(move || self.run()).map_err(SockError::io)
    }
}
