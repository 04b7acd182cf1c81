//! Accepted connections and the pipelines built on them.
//!
//! - [`ConnectionSource`]: accept loop turning a [`Transport`](crate::transport::Transport) into
//!   a stream of [`Connection`]s, or serving each one on its own worker
//! - [`Connection`]: one accepted peer; its [`ByteStream`] is the single read loop, while any
//!   number of [`ConnectionWriter`]s may respond concurrently
//! - [`Pipeline`]: the multicast of a connection's tokens to the header window and the tail
//!
//! End of input only shuts a connection's read side. It is closed when its byte stream fails,
//! when the header window tears it down, on an explicit `close`, or when the last owner of its
//! handle is dropped.

mod handle;

mod byte_stream;
pub use byte_stream::ByteStream;

#[allow(clippy::module_inception, reason = "the module is named after its main type")]
mod connection;
pub use connection::Connection;
pub use connection::ConnectionWriter;
pub use connection::RequestSplit;

mod pipeline;
pub use pipeline::Pipeline;

mod source;
pub use source::ConnectionSource;
pub use source::ConnectionStream;
pub use source::connection_stream;

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::VecDeque;
    use std::io;
    use std::net::SocketAddr;

    use crate::transport::MockConnectionIo;

    /// A peer whose reads replay `reads` in order and then report end of input.
    pub(crate) fn scripted(reads: Vec<io::Result<&'static [u8]>>) -> MockConnectionIo {
        let mut reads: VecDeque<_> = reads.into();
        let mut io = MockConnectionIo::new();
        io.expect_read().returning(move |buf| match reads.pop_front() {
            Some(Ok(chunk)) => {
                buf[..chunk.len()].copy_from_slice(chunk);
                Ok(chunk.len())
            }
            Some(Err(e)) => Err(e),
            None => Ok(0),
        });
        io
    }

    pub(crate) fn peer() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 40_000))
    }
}
