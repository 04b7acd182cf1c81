use std::sync::{Arc, OnceLock};

use crate::protocol::{StreamEvent, Token};
use crate::stream::{self, Demand, EventSink, EventStream, Subscriber};

/// The header boundary: the index of the terminator token, set at most once.
#[derive(Debug, Clone, Default)]
pub struct Boundary {
    index: Arc<OnceLock<u64>>,
}

impl Boundary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the boundary; later calls are ignored.
    pub fn fire(&self, index: u64) {
        let _ = self.index.set(index);
    }

    pub fn fired(&self) -> Option<u64> {
        self.index.get().copied()
    }

    /// True for tokens that arrived after the boundary token.
    pub fn admits(&self, token: &Token) -> bool {
        self.fired().is_some_and(|boundary| token.index() > boundary)
    }
}

/// Republishes the tokens that follow the header boundary.
///
/// Suppresses every token until the boundary fires, then forwards the rest and the terminal
/// event. Detaches once its output stream is dropped.
#[derive(Debug)]
pub struct TailSplit {
    boundary: Boundary,
    sink: EventSink<Token>,
}

impl TailSplit {
    pub fn new(boundary: Boundary) -> (Self, EventStream<Token>) {
        let (sink, stream) = stream::channel();
        (Self { boundary, sink }, stream)
    }
}

impl Subscriber<Token> for TailSplit {
    fn on_event(&mut self, event: &StreamEvent<Token>) -> Demand {
        match event {
            StreamEvent::Data(token) => {
                if !self.boundary.admits(token) || self.sink.next(token.clone()) {
                    Demand::More
                } else {
                    Demand::Done
                }
            }
            StreamEvent::Completed => {
                self.sink.complete();
                Demand::Done
            }
            StreamEvent::Failed(e) => {
                self.sink.fail(e.clone());
                Demand::Done
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn token(index: u64, text: &'static str) -> Token {
        Token::new(index, Bytes::from_static(text.as_bytes()))
    }

    #[test]
    fn nothing_passes_before_the_boundary() {
        let boundary = Boundary::new();
        let (mut tail, stream) = TailSplit::new(boundary.clone());

        for i in 0..3 {
            assert!(matches!(tail.on_event(&StreamEvent::Data(token(i, "header"))), Demand::More));
        }
        assert!(matches!(tail.on_event(&StreamEvent::Completed), Demand::Done));

        assert!(stream.collect_data().unwrap().is_empty());
    }

    #[test]
    fn everything_after_the_boundary_passes() {
        let boundary = Boundary::new();
        let (mut tail, stream) = TailSplit::new(boundary.clone());

        tail.on_event(&StreamEvent::Data(token(0, "GET / HTTP/1.1")));
        tail.on_event(&StreamEvent::Data(token(1, "\r")));
        boundary.fire(1);
        tail.on_event(&StreamEvent::Data(token(2, "body")));
        tail.on_event(&StreamEvent::Data(token(3, "more")));
        tail.on_event(&StreamEvent::Completed);

        let texts: Vec<_> = stream.collect_data().unwrap().iter().map(|token| token.text().into_owned()).collect();
        assert_eq!(texts, vec!["body", "more"]);
    }

    #[test]
    fn boundary_fires_once() {
        let boundary = Boundary::new();
        boundary.fire(4);
        boundary.fire(9);
        assert_eq!(boundary.fired(), Some(4));
        assert!(boundary.admits(&token(5, "x")));
        assert!(!boundary.admits(&token(4, "x")));
    }

    #[test]
    fn failure_is_forwarded() {
        let (mut tail, stream) = TailSplit::new(Boundary::new());
        tail.on_event(&StreamEvent::Failed(crate::protocol::SockError::IncompleteHeader));
        assert!(matches!(stream.collect_data(), Err(crate::protocol::SockError::IncompleteHeader)));
    }

    #[test]
    fn detaches_when_output_is_dropped() {
        let boundary = Boundary::new();
        boundary.fire(0);
        let (mut tail, stream) = TailSplit::new(boundary);
        drop(stream);
        assert!(matches!(tail.on_event(&StreamEvent::Data(token(1, "x"))), Demand::Done));
    }
}
