use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded, unbounded};

use crate::protocol::{SockError, StreamEvent};

/// Creates an unbounded sink/stream pair.
pub fn channel<T>() -> (EventSink<T>, EventStream<T>) {
    let (sender, receiver) = unbounded();
    (EventSink::new(sender), EventStream::new(receiver))
}

/// Creates a zero-capacity pair: every `next` blocks until the consumer takes the item.
pub fn rendezvous<T>() -> (EventSink<T>, EventStream<T>) {
    let (sender, receiver) = bounded(0);
    (EventSink::new(sender), EventStream::new(receiver))
}

/// Producer half of an [`EventStream`]; accepts at most one terminal event.
#[derive(Debug)]
pub struct EventSink<T> {
    sender: Sender<StreamEvent<T>>,
    terminated: bool,
}

impl<T> EventSink<T> {
    fn new(sender: Sender<StreamEvent<T>>) -> Self {
        Self { sender, terminated: false }
    }

    /// Emits a data event. Returns false once the sink is terminated or the stream is dropped.
    pub fn next(&mut self, item: T) -> bool {
        self.send(StreamEvent::Data(item))
    }

    pub fn complete(&mut self) -> bool {
        self.send(StreamEvent::Completed)
    }

    pub fn fail(&mut self, error: SockError) -> bool {
        self.send(StreamEvent::Failed(error))
    }

    pub fn send(&mut self, event: StreamEvent<T>) -> bool {
        if self.terminated {
            return false;
        }
        self.terminated = event.is_terminal();
        self.sender.send(event).is_ok()
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }
}

/// Consumer half: a blocking iterator that ends after the first terminal event.
///
/// A sink dropped without a terminal event ends the iterator without one.
#[derive(Debug)]
pub struct EventStream<T> {
    receiver: Receiver<StreamEvent<T>>,
    finished: bool,
}

impl<T> EventStream<T> {
    fn new(receiver: Receiver<StreamEvent<T>>) -> Self {
        Self { receiver, finished: false }
    }

    /// Waits at most `timeout` for the next event.
    ///
    /// `Ok(None)` means the stream has ended.
    pub fn next_timeout(&mut self, timeout: Duration) -> Result<Option<StreamEvent<T>>, RecvTimeoutError> {
        if self.finished {
            return Ok(None);
        }
        match self.receiver.recv_timeout(timeout) {
            Ok(event) => Ok(Some(self.observe(event))),
            Err(RecvTimeoutError::Disconnected) => {
                self.finished = true;
                Ok(None)
            }
            Err(e @ RecvTimeoutError::Timeout) => Err(e),
        }
    }

    /// Drains the stream, returning every data item or the failure that ended it.
    pub fn collect_data(self) -> Result<Vec<T>, SockError> {
        let mut items = Vec::new();
        for event in self {
            match event {
                StreamEvent::Data(item) => items.push(item),
                StreamEvent::Completed => break,
                StreamEvent::Failed(e) => return Err(e),
            }
        }
        Ok(items)
    }

    fn observe(&mut self, event: StreamEvent<T>) -> StreamEvent<T> {
        self.finished = event.is_terminal();
        event
    }
}

impl<T> Iterator for EventStream<T> {
    type Item = StreamEvent<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.receiver.recv() {
            Ok(event) => Some(self.observe(event)),
            Err(_) => {
                self.finished = true;
                None
            }
        }
    }
}
