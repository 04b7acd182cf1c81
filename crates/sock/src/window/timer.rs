use std::io;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, Sender, bounded};

/// Cancels its timer when dropped.
#[derive(Debug)]
pub(crate) struct TimerGuard {
    cancel: Option<Sender<()>>,
}

impl TimerGuard {
    pub(crate) fn cancel(&mut self) {
        // dropping the sender disconnects the channel the timer waits on
        self.cancel.take();
    }
}

impl Drop for TimerGuard {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Runs `on_fire` on a `sock-timer` worker after `after`, unless the guard is dropped first.
///
/// Cancellation only stops a timer that has not fired yet; `on_fire` must re-check whatever
/// state it is about to change.
pub(crate) fn arm<F>(after: Duration, on_fire: F) -> io::Result<TimerGuard>
where
    F: FnOnce() + Send + 'static,
{
    let (cancel, cancelled) = bounded::<()>(1);
    thread::Builder::new().name("sock-timer".into()).spawn(move || {
        if let Err(RecvTimeoutError::Timeout) = cancelled.recv_timeout(after) {
            on_fire();
        }
    })?;
    Ok(TimerGuard { cancel: Some(cancel) })
}
