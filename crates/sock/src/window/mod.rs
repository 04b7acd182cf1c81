//! Request-header framing on top of a multicast token stream.
//!
//! [`HeaderWindow`] is the `Idle -> Open -> Closed` state machine that folds header lines into a
//! [`HeaderRecord`](crate::protocol::HeaderRecord) and hands it out once through a
//! [`PendingHeader`]. When it closes it fires a [`Boundary`]; [`TailSplit`] republishes only the
//! tokens after that boundary, for whoever consumes the rest of the connection.

mod timer;

mod header_window;
pub use header_window::HeaderWindow;
pub use header_window::PendingHeader;
pub use header_window::Progress;
pub(crate) use header_window::Teardown;
pub use header_window::WindowState;

mod tail_split;
pub use tail_split::Boundary;
pub use tail_split::TailSplit;
