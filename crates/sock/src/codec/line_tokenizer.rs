use std::collections::VecDeque;
use std::fmt;

use bytes::Bytes;
use memchr::{memchr_iter, memmem};
use regex::bytes::Regex;
use tracing::trace;

use crate::protocol::{SockError, StreamEvent, Token};

/// What a chunk is split on.
#[derive(Clone)]
pub enum Delimiter {
    /// Cuts after every `\n`; each token keeps its line break, so a blank line is a token of its own
    Line,
    /// An exact byte sequence, searched with `memchr::memmem`
    Literal(Vec<u8>),
    /// A regular expression over bytes
    Pattern(Regex),
}

impl Delimiter {
    /// The line-keeping delimiter used for header framing: `"Host: a\r\n"` stays whole and the
    /// blank line ending a header arrives as `"\r\n"` or `"\n"`.
    pub fn line() -> Self {
        Self::Line
    }

    pub fn literal<B: AsRef<[u8]>>(delimiter: B) -> Result<Self, SockError> {
        let delimiter = delimiter.as_ref();
        if delimiter.is_empty() {
            return Err(SockError::invalid_delimiter("empty literal"));
        }
        Ok(Self::Literal(delimiter.to_vec()))
    }

    /// A pattern that can match the empty string is rejected, it would split between every byte.
    pub fn pattern(pattern: &str) -> Result<Self, SockError> {
        let regex = Regex::new(pattern).map_err(SockError::invalid_delimiter)?;
        if regex.is_match(b"") {
            return Err(SockError::invalid_delimiter(format!("pattern {pattern:?} matches the empty string")));
        }
        Ok(Self::Pattern(regex))
    }

    /// Byte ranges of the fragments between delimiter matches, empty ones included.
    fn fragments(&self, chunk: &[u8]) -> Vec<(usize, usize)> {
        let mut fragments = Vec::new();
        let mut start = 0;
        match self {
            Delimiter::Line => {
                for found in memchr_iter(b'\n', chunk) {
                    fragments.push((start, found + 1));
                    start = found + 1;
                }
            }
            Delimiter::Literal(needle) => {
                // non-overlapping, left to right
                for found in memmem::find_iter(chunk, needle) {
                    fragments.push((start, found));
                    start = found + needle.len();
                }
            }
            Delimiter::Pattern(regex) => {
                for found in regex.find_iter(chunk) {
                    fragments.push((start, found.start()));
                    start = found.end();
                }
            }
        }
        fragments.push((start, chunk.len()));
        fragments
    }
}

impl Default for Delimiter {
    fn default() -> Self {
        Self::line()
    }
}

impl fmt::Debug for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delimiter::Line => f.write_str("Line"),
            Delimiter::Literal(bytes) => f.debug_tuple("Literal").field(&String::from_utf8_lossy(bytes)).finish(),
            Delimiter::Pattern(regex) => f.debug_tuple("Pattern").field(&regex.as_str()).finish(),
        }
    }
}

/// Splits chunks into tokens, numbering them in arrival order.
#[derive(Debug, Clone)]
pub struct LineTokenizer {
    delimiter: Delimiter,
    next_index: u64,
}

impl LineTokenizer {
    pub fn new(delimiter: Delimiter) -> Self {
        Self { delimiter, next_index: 0 }
    }

    pub fn delimiter(&self) -> &Delimiter {
        &self.delimiter
    }

    /// Splits one chunk, appending its non-empty fragments to `tokens` in split order.
    pub fn tokenize_chunk(&mut self, chunk: &Bytes, tokens: &mut VecDeque<Token>) {
        for (start, end) in self.delimiter.fragments(chunk) {
            if start == end {
                continue;
            }
            tokens.push_back(Token::new(self.next_index, chunk.slice(start..end)));
            self.next_index += 1;
        }
        trace!(chunk_size = chunk.len(), tokens = self.next_index, "tokenized chunk");
    }
}

/// Token stream over an upstream of byte chunks; terminal events pass through unchanged.
#[derive(Debug)]
pub struct Tokens<I> {
    upstream: I,
    tokenizer: LineTokenizer,
    pending: VecDeque<Token>,
    finished: bool,
}

impl<I> Tokens<I> {
    pub fn new(upstream: I, delimiter: Delimiter) -> Self {
        Self { upstream, tokenizer: LineTokenizer::new(delimiter), pending: VecDeque::new(), finished: false }
    }

    pub fn into_inner(self) -> I {
        self.upstream
    }
}

impl<I> Iterator for Tokens<I>
where
    I: Iterator<Item = StreamEvent<Bytes>>,
{
    type Item = StreamEvent<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Some(StreamEvent::Data(token));
            }
            if self.finished {
                return None;
            }

            match self.upstream.next() {
                Some(StreamEvent::Data(chunk)) => self.tokenizer.tokenize_chunk(&chunk, &mut self.pending),
                Some(StreamEvent::Completed) => {
                    self.finished = true;
                    return Some(StreamEvent::Completed);
                }
                Some(StreamEvent::Failed(e)) => {
                    self.finished = true;
                    return Some(StreamEvent::Failed(e));
                }
                None => {
                    self.finished = true;
                    return None;
                }
            }
        }
    }
}

/// Tokenizes an upstream of byte chunks.
pub fn tokenize<I>(upstream: I, delimiter: Delimiter) -> Tokens<I::IntoIter>
where
    I: IntoIterator<Item = StreamEvent<Bytes>>,
{
    Tokens::new(upstream.into_iter(), delimiter)
}
