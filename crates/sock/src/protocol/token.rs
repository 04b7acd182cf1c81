use std::borrow::Cow;
use std::str::Utf8Error;

use bytes::Bytes;

/// A non-empty piece of a connection's byte stream, cut out by the line tokenizer.
///
/// The bytes are a zero-copy slice of the chunk they were read in. `index` is the position of
/// the token within its stream, starting at 0, so consumers of a multicast token stream can
/// agree on "before" and "after" without sharing delivery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    index: u64,
    bytes: Bytes,
}

impl Token {
    pub(crate) fn new(index: u64, bytes: Bytes) -> Self {
        debug_assert!(!bytes.is_empty(), "tokens are never empty");
        Self { index, bytes }
    }

    #[inline]
    pub fn index(&self) -> u64 {
        self.index
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false, kept for API symmetry with `len`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn to_str(&self) -> Result<&str, Utf8Error> {
        std::str::from_utf8(&self.bytes)
    }

    /// Lossy UTF-8 view of the token text.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }
}

impl AsRef<[u8]> for Token {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}
