//! Data types shared by every stage of a connection pipeline.
//!
//! - [`StreamEvent`]: the `Data | Completed | Failed` envelope carried by byte, token and
//!   connection streams alike
//! - [`Token`]: a non-empty piece of a byte stream produced by the line tokenizer
//! - [`HeaderRecord`]: the request line and header fields folded by the header window
//! - [`SockError`]: every failure the pipeline can report, listener-scoped or connection-scoped

mod error;
pub use error::SockError;

mod event;
pub use event::StreamEvent;

mod token;
pub use token::Token;

mod header_record;
pub use header_record::HeaderRecord;
pub(crate) use header_record::RequestLine;
