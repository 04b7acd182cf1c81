use std::fmt;

use tracing::trace;

use crate::protocol::{SockError, StreamEvent};

/// What a subscriber wants after handling an event.
#[derive(Debug)]
pub enum Demand {
    /// Keep delivering events
    More,
    /// Detach this subscriber, the others keep going
    Done,
    /// Stop the whole stream; the remaining subscribers receive `Failed` with this error
    Abort(SockError),
}

/// A consumer attached to a [`Multicast`].
pub trait Subscriber<T>: Send {
    /// Called once before the first event is pulled.
    fn on_start(&mut self) -> Demand {
        Demand::More
    }

    fn on_event(&mut self, event: &StreamEvent<T>) -> Demand;
}

impl<T, F> Subscriber<T> for F
where
    F: FnMut(&StreamEvent<T>) -> Demand + Send,
{
    fn on_event(&mut self, event: &StreamEvent<T>) -> Demand {
        self(event)
    }
}

/// Fan-out of a single upstream to several independent subscribers.
///
/// The upstream is pulled exactly once per event; all subscribers observe the same sequence,
/// in registration order for each event.
pub struct Multicast<T> {
    subscribers: Vec<Box<dyn Subscriber<T>>>,
}

impl<T> fmt::Debug for Multicast<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Multicast").field("subscribers", &self.subscribers.len()).finish()
    }
}

impl<T> Default for Multicast<T> {
    fn default() -> Self {
        Self { subscribers: Vec::new() }
    }
}

impl<T> Multicast<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<S>(&mut self, subscriber: S) -> &mut Self
    where
        S: Subscriber<T> + 'static,
    {
        self.subscribers.push(Box::new(subscriber));
        self
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Pulls `source` until it ends, fails, a subscriber aborts, or no subscriber is left.
    ///
    /// Returns the error that ended the stream, if any.
    pub fn drive<I>(mut self, source: I) -> Result<(), SockError>
    where
        I: IntoIterator<Item = StreamEvent<T>>,
    {
        if let Some(e) = self.start() {
            self.abort(e.clone());
            return Err(e);
        }

        for event in source {
            if let Some(e) = self.publish(&event) {
                self.abort(e.clone());
                return Err(e);
            }

            match event {
                StreamEvent::Data(_) => {}
                StreamEvent::Completed => return Ok(()),
                StreamEvent::Failed(e) => return Err(e),
            }

            if self.subscribers.is_empty() {
                trace!("every subscriber detached, stop pulling upstream");
                return Ok(());
            }
        }

        Ok(())
    }

    fn start(&mut self) -> Option<SockError> {
        let mut index = 0;
        while index < self.subscribers.len() {
            match self.subscribers[index].on_start() {
                Demand::More => index += 1,
                Demand::Done => {
                    self.subscribers.remove(index);
                }
                Demand::Abort(e) => {
                    self.subscribers.remove(index);
                    return Some(e);
                }
            }
        }
        None
    }

    fn publish(&mut self, event: &StreamEvent<T>) -> Option<SockError> {
        let mut index = 0;
        while index < self.subscribers.len() {
            match self.subscribers[index].on_event(event) {
                Demand::More => index += 1,
                Demand::Done => {
                    self.subscribers.remove(index);
                }
                Demand::Abort(e) => {
                    self.subscribers.remove(index);
                    return Some(e);
                }
            }
        }
        None
    }

    fn abort(&mut self, error: SockError) {
        let failed = StreamEvent::Failed(error);
        for subscriber in &mut self.subscribers {
            subscriber.on_event(&failed);
        }
        self.subscribers.clear();
    }
}
