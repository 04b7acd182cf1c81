//! Tunables of a connection pipeline.
//!
//! ```
//! use std::time::Duration;
//! use micro_sock::config::RequestConfig;
//!
//! let config = RequestConfig::new()
//!     .with_read_buffer_size(4 * 1024)
//!     .with_header_timeout(Duration::from_millis(500))
//!     .with_idle_timeout(Some(Duration::from_secs(5)));
//! assert_eq!(config.read_buffer_size(), 4 * 1024);
//! assert_eq!(config.window().header_timeout(), Duration::from_millis(500));
//! ```

use std::time::Duration;

use crate::codec::Delimiter;

/// Size of a single blocking read when none is configured.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 1024;

/// Time allowed between the request-start token and the header terminator.
pub const DEFAULT_HEADER_TIMEOUT: Duration = Duration::from_millis(200);

/// Timeouts of the header window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowConfig {
    header_timeout: Duration,
    idle_timeout: Option<Duration>,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self { header_timeout: DEFAULT_HEADER_TIMEOUT, idle_timeout: None }
    }
}

impl WindowConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header_timeout(mut self, timeout: Duration) -> Self {
        self.header_timeout = timeout;
        self
    }

    /// Bounds the wait for a request-start token. `None`, the default, waits forever.
    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn header_timeout(&self) -> Duration {
        self.header_timeout
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout
    }
}

/// Everything [`Connection::split`](crate::connection::Connection::split) needs.
#[derive(Debug, Clone)]
pub struct RequestConfig {
    delimiter: Delimiter,
    read_buffer_size: usize,
    window: WindowConfig,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self { delimiter: Delimiter::line(), read_buffer_size: DEFAULT_READ_BUFFER_SIZE, window: WindowConfig::default() }
    }
}

impl RequestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: Delimiter) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Zero is raised to one byte.
    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.max(1);
        self
    }

    pub fn with_header_timeout(mut self, timeout: Duration) -> Self {
        self.window = self.window.with_header_timeout(timeout);
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.window = self.window.with_idle_timeout(timeout);
        self
    }

    pub fn with_window(mut self, window: WindowConfig) -> Self {
        self.window = window;
        self
    }

    pub fn delimiter(&self) -> &Delimiter {
        &self.delimiter
    }

    pub fn read_buffer_size(&self) -> usize {
        self.read_buffer_size
    }

    pub fn window(&self) -> &WindowConfig {
        &self.window
    }
}
