use std::fmt;
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;

use crate::codec::{Delimiter, Tokens, tokenize};
use crate::config::{DEFAULT_READ_BUFFER_SIZE, RequestConfig};
use crate::connection::handle::Handle;
use crate::connection::{ByteStream, Pipeline};
use crate::protocol::{HeaderRecord, SockError, Token};
use crate::stream::{EventStream, Multicast};
use crate::transport::ConnectionIo;
use crate::window::{HeaderWindow, PendingHeader, TailSplit, Teardown};

/// One accepted peer.
///
/// Reading goes through a single [`ByteStream`] (obtained by consuming the connection);
/// responding goes through [`ConnectionWriter`]s, which can be taken beforehand and used from any
/// thread.
pub struct Connection<C: ConnectionIo = TcpStream> {
    handle: Arc<Handle<C>>,
    peer: SocketAddr,
}

impl<C: ConnectionIo> fmt::Debug for Connection<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection").field("id", &self.handle.id()).field("peer", &self.peer).finish()
    }
}

/// The three consumers of a connection split by [`Connection::split`].
///
/// Nothing is read until `pipeline` is run or spawned.
#[derive(Debug)]
pub struct RequestSplit<C: ConnectionIo> {
    pub headers: PendingHeader,
    pub tail: EventStream<Token>,
    pub pipeline: Pipeline<C>,
}

impl<C: ConnectionIo> Connection<C> {
    pub(crate) fn new(io: C, peer: SocketAddr, id: u64) -> Self {
        Self { handle: Arc::new(Handle::new(io, id)), peer }
    }

    /// Identifier of the connection, unique per listener and starting at 1.
    pub fn id(&self) -> u64 {
        self.handle.id()
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn writer(&self) -> ConnectionWriter<C> {
        ConnectionWriter { handle: Arc::clone(&self.handle) }
    }

    pub fn write(&self, bytes: &[u8]) -> Result<(), SockError> {
        self.handle.write_all(bytes).map_err(SockError::io)
    }

    pub fn close(&self) -> Result<(), SockError> {
        self.handle.close().map_err(SockError::io)
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_closed()
    }

    pub fn bytes(self) -> ByteStream<C> {
        self.bytes_with_capacity(DEFAULT_READ_BUFFER_SIZE)
    }

    /// Like [`bytes`](Self::bytes) with reads of at most `capacity` bytes (at least 1).
    pub fn bytes_with_capacity(self, capacity: usize) -> ByteStream<C> {
        ByteStream::new(self.handle, capacity)
    }

    pub fn tokens(self, delimiter: Delimiter) -> Tokens<ByteStream<C>> {
        tokenize(self.bytes(), delimiter)
    }

    /// Builds the header window and the tail over one shared token stream.
    ///
    /// The window is attached first, so a header failure reaches the tail as `Failed` before
    /// any further token. It may tear the connection down on a malformed line or a timeout.
    pub fn split(self, config: &RequestConfig) -> RequestSplit<C> {
        let id = self.id();
        let (window, headers) = HeaderWindow::new(config.window());
        let window = window.with_teardown(Arc::clone(&self.handle) as Arc<dyn Teardown>);
        let (tail_split, tail) = TailSplit::new(window.boundary());

        let mut multicast = Multicast::new();
        multicast.subscribe(window).subscribe(tail_split);

        let bytes = self.bytes_with_capacity(config.read_buffer_size());
        let pipeline = Pipeline::new(id, tokenize(bytes, config.delimiter().clone()), multicast);
        RequestSplit { headers, tail, pipeline }
    }

    /// Reads until the header window closes and returns its record, on the calling thread.
    ///
    /// `Ok(None)` when the peer closed before sending a request line. Tokens read past the
    /// terminator are discarded; the connection stays open for writers.
    pub fn headers(&self, config: &RequestConfig) -> Result<Option<HeaderRecord>, SockError> {
        let (window, headers) = HeaderWindow::new(config.window());
        let window = window.with_teardown(Arc::clone(&self.handle) as Arc<dyn Teardown>);

        let mut multicast = Multicast::new();
        multicast.subscribe(window);

        let bytes = ByteStream::new(Arc::clone(&self.handle), config.read_buffer_size());
        let pipeline = Pipeline::new(self.id(), tokenize(bytes, config.delimiter().clone()), multicast);
        // the window reports its own failure through `headers`
        let _ = pipeline.run();
        headers.wait()
    }
}

/// Write half of a [`Connection`]; clones share the same peer.
pub struct ConnectionWriter<C: ConnectionIo = TcpStream> {
    handle: Arc<Handle<C>>,
}

impl<C: ConnectionIo> Clone for ConnectionWriter<C> {
    fn clone(&self) -> Self {
        Self { handle: Arc::clone(&self.handle) }
    }
}

impl<C: ConnectionIo> fmt::Debug for ConnectionWriter<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionWriter").field("connection", &self.handle.id()).finish()
    }
}

impl<C: ConnectionIo> ConnectionWriter<C> {
    pub fn id(&self) -> u64 {
        self.handle.id()
    }

    /// Writes all of `bytes`; concurrent writes never interleave.
    pub fn write(&self, bytes: &[u8]) -> Result<(), SockError> {
        self.handle.write_all(bytes).map_err(SockError::io)
    }

    pub fn close(&self) -> Result<(), SockError> {
        self.handle.close().map_err(SockError::io)
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::test_support::{peer, scripted};
    use crate::protocol::StreamEvent;
    use crate::transport::MockConnectionIo;
    use http::Method;
    use indoc::indoc;
    use std::io;
    use std::thread;
    use std::time::Duration;

    fn texts(tokens: Vec<Token>) -> Vec<String> {
        tokens.iter().map(|token| token.text().into_owned()).collect()
    }

    #[test]
    fn splits_headers_from_tail() {
        let mut io = scripted(vec![Ok(&b"GET /path HTTP/1.1\r\nHost: example.com\r\n\r\n"[..]), Ok(&b"payload"[..])]);
        io.expect_shutdown_read().times(1).returning(|| Ok(()));
        io.expect_close().times(1).returning(|| Ok(()));

        let connection = Connection::new(io, peer(), 1);
        let RequestSplit { headers, tail, pipeline } = connection.split(&RequestConfig::default());
        pipeline.run().unwrap();

        let record = headers.wait().unwrap().unwrap();
        assert_eq!(record.method(), &Method::GET);
        assert_eq!(record.target(), "/path");
        assert_eq!(record.get("Host"), Some("example.com"));
        assert_eq!(texts(tail.collect_data().unwrap()), vec!["payload"]);
    }

    #[test]
    fn tail_keeps_header_like_lines_after_terminator() {
        let request = indoc! {"
            POST /upload HTTP/1.1\r
            Content-Type: text/plain\r
            \r
            first line\r
            Fake: header\r
        "};
        let mut io = scripted(vec![Ok(request.as_bytes())]);
        io.expect_shutdown_read().returning(|| Ok(()));
        io.expect_close().returning(|| Ok(()));

        let RequestSplit { headers, tail, pipeline } = Connection::new(io, peer(), 1).split(&RequestConfig::default());
        pipeline.spawn().unwrap().join().unwrap().unwrap();

        let record = headers.wait().unwrap().unwrap();
        assert_eq!(record.headers().len(), 1);
        assert_eq!(texts(tail.collect_data().unwrap()), vec!["first line\r\n", "Fake: header\r\n"]);
    }

    #[test]
    fn lf_only_request_is_framed() {
        let mut io = scripted(vec![Ok(&b"POST /submit HTTP/1.1\nHost: example.com\nContent-Length: 7\n\npayload"[..])]);
        io.expect_shutdown_read().returning(|| Ok(()));
        io.expect_close().times(1).returning(|| Ok(()));

        let RequestSplit { headers, tail, pipeline } = Connection::new(io, peer(), 1).split(&RequestConfig::default());
        pipeline.run().unwrap();

        let record = headers.wait().unwrap().unwrap();
        assert_eq!(record.method(), &Method::POST);
        assert_eq!(record.get("Host"), Some("example.com"));
        assert_eq!(record.get("Content-Length"), Some("7"));
        assert_eq!(texts(tail.collect_data().unwrap()), vec!["payload"]);
    }

    #[test]
    fn crlf_request_over_several_reads() {
        let mut io = scripted(vec![
            Ok(&b"GET / HTTP/1.1\r\nAccept: */*\r\n"[..]),
            Ok(&b"\r\n"[..]),
            Ok(&b"after\r\n"[..]),
        ]);
        io.expect_shutdown_read().returning(|| Ok(()));
        io.expect_close().times(1).returning(|| Ok(()));

        let RequestSplit { headers, tail, pipeline } = Connection::new(io, peer(), 1).split(&RequestConfig::default());
        pipeline.run().unwrap();

        let record = headers.wait().unwrap().unwrap();
        assert_eq!(record.get("Accept"), Some("*/*"));
        assert_eq!(texts(tail.collect_data().unwrap()), vec!["after\r\n"]);
    }

    #[test]
    fn unlisted_version_is_kept_verbatim() {
        let mut io = scripted(vec![Ok(&b"GET /legacy HTTP/1.2\r\nHost: a\r\n\r\n"[..])]);
        io.expect_shutdown_read().returning(|| Ok(()));
        io.expect_close().times(1).returning(|| Ok(()));

        let connection = Connection::new(io, peer(), 1);
        let record = connection.headers(&RequestConfig::default()).unwrap().unwrap();
        assert_eq!(record.version(), "HTTP/1.2");
        assert_eq!(record.http_version(), None);
        assert_eq!(record.target(), "/legacy");
    }

    #[test]
    fn malformed_header_tears_connection_down() {
        let mut io = scripted(vec![Ok(&b"GET / HTTP/1.1\r\n:::\r\n\r\nbody"[..])]);
        io.expect_close().times(1).returning(|| Ok(()));

        let connection = Connection::new(io, peer(), 1);
        let writer = connection.writer();
        let RequestSplit { headers, tail, pipeline } = connection.split(&RequestConfig::default());

        assert!(matches!(pipeline.run(), Err(SockError::MalformedHeaderLine { .. })));
        assert!(matches!(headers.wait(), Err(SockError::MalformedHeaderLine { .. })));
        assert!(matches!(tail.collect_data(), Err(SockError::MalformedHeaderLine { .. })));
        assert!(writer.is_closed());
    }

    #[test]
    fn header_timeout_fails_every_consumer() {
        let mut io = MockConnectionIo::new();
        let mut reads = 0;
        io.expect_read().returning(move |buf| {
            reads += 1;
            if reads > 1 {
                // an idle peer: nothing more arrives before the window gives up
                thread::sleep(Duration::from_millis(300));
                return Ok(0);
            }
            let chunk = b"GET / HTTP/1.1\r\nHost: a\r\n";
            buf[..chunk.len()].copy_from_slice(chunk);
            Ok(chunk.len())
        });
        io.expect_shutdown_read().returning(|| Ok(()));
        io.expect_close().times(1).returning(|| Ok(()));

        let config = RequestConfig::new().with_header_timeout(Duration::from_millis(50));
        let RequestSplit { headers, tail, pipeline } = Connection::new(io, peer(), 1).split(&config);
        let worker = pipeline.spawn().unwrap();

        assert!(matches!(headers.wait(), Err(SockError::HeaderTimeout { .. })));
        assert!(matches!(tail.collect_data(), Err(SockError::HeaderTimeout { .. })));
        assert!(matches!(worker.join().unwrap(), Err(SockError::HeaderTimeout { .. })));
    }

    #[test]
    fn empty_connection_has_no_header() {
        let mut io = scripted(vec![]);
        io.expect_shutdown_read().times(1).returning(|| Ok(()));
        io.expect_close().times(1).returning(|| Ok(()));

        let RequestSplit { headers, tail, pipeline } = Connection::new(io, peer(), 1).split(&RequestConfig::default());
        pipeline.run().unwrap();

        assert!(headers.wait().unwrap().is_none());
        assert!(tail.collect_data().unwrap().is_empty());
    }

    #[test]
    fn headers_leaves_connection_writable() {
        let mut io = scripted(vec![Ok(&b"GET /hello HTTP/1.1\r\nAccept: */*\r\n\r\n"[..])]);
        io.expect_write_all().times(1).withf(|bytes| bytes.starts_with(b"HTTP/1.1 200")).returning(|_| Ok(()));
        io.expect_shutdown_read().returning(|| Ok(()));
        io.expect_close().times(1).returning(|| Ok(()));

        let connection = Connection::new(io, peer(), 1);
        let record = connection.headers(&RequestConfig::default()).unwrap().unwrap();
        assert_eq!(record.target(), "/hello");

        connection.write(b"HTTP/1.1 200 OK\r\n\r\n").unwrap();
        drop(connection);
    }

    #[test]
    fn writers_outlive_the_read_loop() {
        let mut io = scripted(vec![Ok(&b"stream of bytes"[..])]);
        io.expect_write_all().times(2).returning(|_| Ok(()));
        io.expect_close().times(1).returning(|| Ok(()));

        let connection = Connection::new(io, peer(), 9);
        let writer = connection.writer();
        let other = writer.clone();

        let mut bytes = connection.bytes();
        assert!(matches!(bytes.next(), Some(StreamEvent::Data(_))));
        drop(bytes);

        writer.write(b"one").unwrap();
        thread::spawn(move || other.write(b"two").unwrap()).join().unwrap();
        assert!(!writer.is_closed());
    }

    #[test]
    fn write_after_close_is_refused() {
        let mut io = MockConnectionIo::new();
        io.expect_write_all().never();
        io.expect_close().times(1).returning(|| Ok(()));

        let connection = Connection::new(io, peer(), 1);
        connection.close().unwrap();
        connection.close().unwrap();

        let error = connection.write(b"late").unwrap_err();
        assert!(matches!(error, SockError::Io { source } if source.kind() == io::ErrorKind::NotConnected));
    }
}
