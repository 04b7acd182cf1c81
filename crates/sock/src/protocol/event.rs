use crate::protocol::SockError;

/// One event of a connection, byte or token stream.
///
/// `Completed` and `Failed` are terminal: no `Data` follows either of them.
#[derive(Debug, Clone)]
pub enum StreamEvent<T> {
    /// The next item of the stream
    Data(T),
    /// The producer finished normally
    Completed,
    /// The producer stopped because of an error
    Failed(SockError),
}

impl<T> StreamEvent<T> {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamEvent::Data(_))
    }

    #[inline]
    pub fn is_data(&self) -> bool {
        matches!(self, StreamEvent::Data(_))
    }

    pub fn as_data(&self) -> Option<&T> {
        match self {
            StreamEvent::Data(item) => Some(item),
            _ => None,
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            StreamEvent::Data(item) => Some(item),
            _ => None,
        }
    }

    /// Maps the data payload, leaving terminal events untouched.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> StreamEvent<U> {
        match self {
            StreamEvent::Data(item) => StreamEvent::Data(f(item)),
            StreamEvent::Completed => StreamEvent::Completed,
            StreamEvent::Failed(e) => StreamEvent::Failed(e),
        }
    }
}
