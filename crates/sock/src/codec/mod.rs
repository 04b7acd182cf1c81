//! Splitting byte streams into tokens and recognising the request-header grammar.
//!
//! - [`LineTokenizer`] / [`Tokens`]: split each chunk on a [`Delimiter`] and emit the
//!   non-empty fragments as [`Token`](crate::protocol::Token)s
//! - `grammar`: the request-start, header-line and terminator token grammars used by the
//!   header window
//!
//! Chunks are split independently: a delimiter straddling two reads is not reassembled.

mod line_tokenizer;
pub use line_tokenizer::Delimiter;
pub use line_tokenizer::LineTokenizer;
pub use line_tokenizer::Tokens;
pub use line_tokenizer::tokenize;

pub(crate) mod grammar;
