//! Blocking connection streams with line tokenizing and request-header framing
//!
//! This crate accepts TCP connections and exposes each one as a set of independent event
//! streams: the raw bytes, the tokens found between delimiters, the record of the first request
//! header, and the tokens that follow that header. Everything runs on plain threads over
//! `std::net` sockets.
//!
//! # Features
//!
//! - Connection stream fed by an accept loop on its own worker thread
//! - Zero-copy tokenizing on a literal or regular-expression delimiter
//! - Header window that folds `Name: value` lines into a [`protocol::HeaderRecord`], bounded by a
//!   timeout
//! - Tail stream with every token after the header terminator
//! - Single read loop per connection shared by all consumers through a multicast
//! - End of input only shuts the read side, so a peer that half-closed still gets its response
//!
//! # Example
//!
//! ```no_run
//! use micro_sock::config::RequestConfig;
//! use micro_sock::connection::{ConnectionSource, RequestSplit};
//! use tracing::{error, info, warn, Level};
//! use tracing_subscriber::FmtSubscriber;
//!
//! let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
//! tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
//!
//! let source = match ConnectionSource::bind(8080) {
//!     Ok(source) => source,
//!     Err(e) => {
//!         error!(cause = %e, "bind server error");
//!         return;
//!     }
//! };
//!
//! let error = source.serve(|connection| {
//!     let writer = connection.writer();
//!     let RequestSplit { headers, tail, pipeline } = connection.split(&RequestConfig::default());
//!     let worker = match pipeline.spawn() {
//!         Ok(worker) => worker,
//!         Err(e) => {
//!             warn!(cause = %e, "failed to start pipeline");
//!             return;
//!         }
//!     };
//!
//!     match headers.wait() {
//!         Ok(Some(record)) => {
//!             info!(method = %record.method(), target = record.target(), "receive request header");
//!             let _ = writer.write(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n");
//!         }
//!         Ok(None) => info!("peer closed before sending a request"),
//!         Err(e) => warn!(cause = %e, "no request header"),
//!     }
//!
//!     for token in tail.filter_map(|event| event.into_data()) {
//!         info!(token = %token.text(), "receive tail token");
//!     }
//!     let _ = worker.join();
//! });
//! error!(cause = %error, "stop serving");
//! ```
//!
//! # Architecture
//!
//! - [`transport`]: the blocking socket seam (`accept`, `wake`, `read`, `write_all`,
//!   `shutdown_read`, `close`)
//! - [`connection`]: connection source, connections, byte streams and pipelines
//! - [`codec`]: delimiter tokenizing and the request-header grammar
//! - [`window`]: the header window state machine and the tail split
//! - [`stream`]: sink/stream channels and the multicast
//! - [`protocol`]: events, tokens, header records and errors
//! - [`config`]: buffer size, delimiter and timeouts
//!
//! # Threads
//!
//! - `sock-accept`: the accept loop behind [`connection_stream`], stopped when its
//!   [`ConnectionStream`](connection::ConnectionStream) is dropped
//! - `sock-conn-<id>`: one per connection pipeline
//! - `sock-timer`: one per armed header or idle timeout
//!
//! # Limitations
//!
//! - Only the first request header of a connection is framed
//! - A delimiter split across two reads is not reassembled
//! - Header lines are not length-limited other than by the header timeout

pub mod codec;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod stream;
pub mod transport;
pub mod window;

pub use connection::connection_stream;
