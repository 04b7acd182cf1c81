use std::io;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors reported by listeners, connections and the header window.
///
/// Cloneable so one failure can be delivered to every consumer of a multicast stream; I/O
/// causes are shared behind an `Arc`.
#[derive(Error, Debug, Clone)]
pub enum SockError {
    #[error("bind error: {source}")]
    Bind { source: Arc<io::Error> },

    #[error("accept error: {source}")]
    Accept { source: Arc<io::Error> },

    #[error("io error: {source}")]
    Io { source: Arc<io::Error> },

    #[error("malformed header line: {line:?}")]
    MalformedHeaderLine { line: String },

    #[error("header terminator not received within {timeout:?}")]
    HeaderTimeout { timeout: Duration },

    #[error("request line not received within {timeout:?}")]
    RequestLineTimeout { timeout: Duration },

    #[error("connection closed before the header terminator")]
    IncompleteHeader,

    #[error("invalid delimiter: {reason}")]
    InvalidDelimiter { reason: String },
}

impl SockError {
    pub fn bind(e: io::Error) -> Self {
        Self::Bind { source: Arc::new(e) }
    }

    pub fn accept(e: io::Error) -> Self {
        Self::Accept { source: Arc::new(e) }
    }

    pub fn io(e: io::Error) -> Self {
        Self::Io { source: Arc::new(e) }
    }

    pub fn malformed_header_line<S: ToString>(line: S) -> Self {
        Self::MalformedHeaderLine { line: line.to_string() }
    }

    pub fn header_timeout(timeout: Duration) -> Self {
        Self::HeaderTimeout { timeout }
    }

    pub fn request_line_timeout(timeout: Duration) -> Self {
        Self::RequestLineTimeout { timeout }
    }

    pub fn invalid_delimiter<S: ToString>(reason: S) -> Self {
        Self::InvalidDelimiter { reason: reason.to_string() }
    }

    /// Returns true for failures that end the whole listener rather than a single connection.
    pub fn is_listener_scoped(&self) -> bool {
        matches!(self, Self::Bind { .. } | Self::Accept { .. })
    }

    /// Returns true for the two window timeouts.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::HeaderTimeout { .. } | Self::RequestLineTimeout { .. })
    }
}

impl From<io::Error> for SockError {
    fn from(e: io::Error) -> Self {
        Self::io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_of_errors() {
        assert!(SockError::bind(io::Error::from(io::ErrorKind::AddrInUse)).is_listener_scoped());
        assert!(SockError::accept(io::Error::from(io::ErrorKind::ConnectionAborted)).is_listener_scoped());
        assert!(!SockError::io(io::Error::from(io::ErrorKind::BrokenPipe)).is_listener_scoped());
        assert!(!SockError::malformed_header_line("oops").is_listener_scoped());
        assert!(SockError::header_timeout(Duration::from_millis(200)).is_timeout());
    }

    #[test]
    fn clone_keeps_io_cause() {
        let error = SockError::io(io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer"));
        let cloned = error.clone();
        assert_eq!(error.to_string(), cloned.to_string());
        assert_eq!(cloned.to_string(), "io error: reset by peer");
    }
}
