use std::fmt;
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TryRecvError, bounded};
use tracing::{debug, trace, warn};

use crate::codec::grammar;
use crate::config::WindowConfig;
use crate::protocol::{HeaderRecord, SockError, StreamEvent, Token};
use crate::stream::{Demand, Subscriber};
use crate::window::Boundary;
use crate::window::timer::{self, TimerGuard};

/// Tears the underlying connection down so a blocked read loop returns.
pub(crate) trait Teardown: Send + Sync {
    fn teardown(&self);
}

/// Lifecycle of a [`HeaderWindow`]; `Closed` is terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowState {
    /// Waiting for a request-start token
    Idle,
    /// Folding header lines into the partial record
    Open(HeaderRecord),
    /// Terminator seen, timed out or failed; nothing is folded any more
    Closed,
}

/// Outcome of pushing one token into the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Token discarded while idle
    Waiting,
    /// Token was the request line, the window is open
    Opened,
    /// Token was a header line
    Folded,
    /// The window is closed, the record (if any) has been handed out
    Finished,
}

type HeaderResult = Result<HeaderRecord, SockError>;

/// State shared with the timer worker; every transition happens under this one lock.
#[derive(Debug)]
struct Shared {
    state: WindowState,
    failure: Option<SockError>,
    result: Option<Sender<HeaderResult>>,
}

impl Shared {
    fn emit(&mut self, record: HeaderRecord) {
        self.state = WindowState::Closed;
        if let Some(result) = self.result.take() {
            let _ = result.send(Ok(record));
        }
    }

    fn fail(&mut self, error: SockError) {
        self.state = WindowState::Closed;
        self.failure = Some(error.clone());
        if let Some(result) = self.result.take() {
            let _ = result.send(Err(error));
        }
    }

    fn abandon(&mut self) {
        self.state = WindowState::Closed;
        self.result.take();
    }
}

/// Detects the request-start token, folds header lines until the terminator, and emits the
/// resulting [`HeaderRecord`] exactly once.
///
/// Opening the window arms a timer of [`WindowConfig::header_timeout`]; reaching the
/// terminator cancels it. Whichever of the two takes the state lock first wins, the other
/// becomes a no-op. A malformed header line or a timeout closes the window with an error and
/// tears the connection down.
pub struct HeaderWindow {
    shared: Arc<Mutex<Shared>>,
    config: WindowConfig,
    boundary: Boundary,
    teardown: Option<Arc<dyn Teardown>>,
    timer: Option<TimerGuard>,
}

impl fmt::Debug for HeaderWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeaderWindow")
            .field("state", &lock(&self.shared).state)
            .field("config", &self.config)
            .field("boundary", &self.boundary)
            .finish_non_exhaustive()
    }
}

impl HeaderWindow {
    pub fn new(config: &WindowConfig) -> (Self, PendingHeader) {
        let (sender, receiver) = bounded(1);
        let shared = Shared { state: WindowState::Idle, failure: None, result: Some(sender) };
        let window =
            Self { shared: Arc::new(Mutex::new(shared)), config: *config, boundary: Boundary::new(), teardown: None, timer: None };
        (window, PendingHeader { receiver })
    }

    pub(crate) fn with_teardown(mut self, teardown: Arc<dyn Teardown>) -> Self {
        self.teardown = Some(teardown);
        self
    }

    /// Fired with the terminator token's index when the window closes normally.
    pub fn boundary(&self) -> Boundary {
        self.boundary.clone()
    }

    pub fn state(&self) -> WindowState {
        lock(&self.shared).state.clone()
    }

    /// Arms the idle timer when [`WindowConfig::idle_timeout`] is set.
    pub fn start(&mut self) -> Result<(), SockError> {
        let Some(timeout) = self.config.idle_timeout() else {
            return Ok(());
        };
        if lock(&self.shared).state != WindowState::Idle {
            return Ok(());
        }

        let guard = self.arm(timeout, |state| *state == WindowState::Idle, SockError::request_line_timeout(timeout))?;
        self.timer = Some(guard);
        Ok(())
    }

    /// Feeds one token through the state machine.
    pub fn push(&mut self, token: &Token) -> Result<Progress, SockError> {
        let mut shared = lock(&self.shared);
        if let Some(failure) = &shared.failure {
            return Err(failure.clone());
        }

        match mem::replace(&mut shared.state, WindowState::Closed) {
            WindowState::Closed => Ok(Progress::Finished),

            WindowState::Idle => {
                let Some(line) = grammar::parse_request_line(token.as_bytes()) else {
                    trace!(index = token.index(), "discard token before request line");
                    shared.state = WindowState::Idle;
                    return Ok(Progress::Waiting);
                };

                debug!(method = %line.method, target = %line.target, "header window opened");
                shared.state = WindowState::Open(HeaderRecord::open(line));
                drop(shared);

                let timeout = self.config.header_timeout();
                // replacing the guard cancels the idle timer
                match self.arm(timeout, |state| matches!(state, WindowState::Open(_)), SockError::header_timeout(timeout)) {
                    Ok(guard) => {
                        self.timer = Some(guard);
                        Ok(Progress::Opened)
                    }
                    Err(e) => {
                        self.timer = None;
                        lock(&self.shared).fail(e.clone());
                        self.tear_down();
                        Err(e)
                    }
                }
            }

            WindowState::Open(mut record) => {
                let bytes = token.as_bytes();
                if grammar::is_terminator(bytes) {
                    shared.emit(record);
                    drop(shared);
                    self.timer = None;
                    self.boundary.fire(token.index());
                    debug!(index = token.index(), "header window closed");
                    Ok(Progress::Finished)
                } else if let Some((name, value)) = grammar::parse_header_line(bytes) {
                    trace!(name = %name, "fold header line");
                    record.insert(name, value);
                    shared.state = WindowState::Open(record);
                    Ok(Progress::Folded)
                } else {
                    let error = SockError::malformed_header_line(token.text());
                    warn!(cause = %error, "reject header window");
                    shared.fail(error.clone());
                    drop(shared);
                    self.timer = None;
                    self.tear_down();
                    Err(error)
                }
            }
        }
    }

    fn arm(&self, after: Duration, pending: fn(&WindowState) -> bool, error: SockError) -> Result<TimerGuard, SockError> {
        let shared = Arc::clone(&self.shared);
        let teardown = self.teardown.clone();
        timer::arm(after, move || {
            let mut shared = lock(&shared);
            if !pending(&shared.state) {
                return;
            }
            warn!(cause = %error, "header window timed out");
            shared.fail(error);
            drop(shared);
            if let Some(teardown) = teardown {
                teardown.teardown();
            }
        })
        .map_err(SockError::io)
    }

    fn tear_down(&self) {
        if let Some(teardown) = &self.teardown {
            teardown.teardown();
        }
    }

    /// Upstream ended; `upstream` is its failure, if any.
    fn finish(&mut self, upstream: Option<SockError>) -> Demand {
        self.timer = None;
        let mut shared = lock(&self.shared);

        // a timed out window reports its own failure rather than the shutdown it caused
        if let Some(failure) = &shared.failure {
            return Demand::Abort(failure.clone());
        }

        let open = matches!(shared.state, WindowState::Open(_));
        match upstream {
            _ if shared.state == WindowState::Closed => {}
            Some(e) => shared.fail(e),
            None if open => {
                warn!("connection closed inside the header window");
                shared.fail(SockError::IncompleteHeader);
            }
            None => shared.abandon(),
        }
        Demand::Done
    }
}

impl Subscriber<Token> for HeaderWindow {
    fn on_start(&mut self) -> Demand {
        match self.start() {
            Ok(()) => Demand::More,
            Err(e) => Demand::Abort(e),
        }
    }

    fn on_event(&mut self, event: &StreamEvent<Token>) -> Demand {
        match event {
            StreamEvent::Data(token) => match self.push(token) {
                Ok(Progress::Finished) => Demand::Done,
                Ok(_) => Demand::More,
                Err(e) => Demand::Abort(e),
            },
            StreamEvent::Completed => self.finish(None),
            StreamEvent::Failed(e) => self.finish(Some(e.clone())),
        }
    }
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The single [`HeaderRecord`] a [`HeaderWindow`] will produce.
#[derive(Debug)]
pub struct PendingHeader {
    receiver: Receiver<HeaderResult>,
}

impl PendingHeader {
    /// Blocks until the window closes.
    ///
    /// `Ok(None)` means the stream ended before any request-start token arrived.
    pub fn wait(self) -> Result<Option<HeaderRecord>, SockError> {
        match self.receiver.recv() {
            Ok(result) => result.map(Some),
            Err(_) => Ok(None),
        }
    }

    /// Non-blocking variant of [`wait`](Self::wait); `None` while the window is still
    /// undecided. The result is handed out once.
    pub fn try_wait(&self) -> Option<Result<Option<HeaderRecord>, SockError>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result.map(Some)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Ok(None)),
        }
    }
}
