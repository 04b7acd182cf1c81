//! Thread-based event streams.
//!
//! A stream is a blocking [`EventStream`] fed by an [`EventSink`] living on some worker
//! thread. [`Multicast`] is the fan-out primitive: one upstream pulled once, each event handed
//! to every attached [`Subscriber`] in the same order.

mod channel;
pub use channel::EventSink;
pub use channel::EventStream;
pub use channel::channel;
pub use channel::rendezvous;

mod multicast;
pub use multicast::Demand;
pub use multicast::Multicast;
pub use multicast::Subscriber;
