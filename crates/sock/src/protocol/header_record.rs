//! The record folded by the header window.
//!
//! Header names are kept exactly as received (no case folding) and a repeated name replaces the
//! previous value.

use std::collections::HashMap;

use http::{Method, Version};

/// Parsed request-start token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RequestLine {
    pub(crate) method: Method,
    pub(crate) target: String,
    pub(crate) version: String,
}

/// Request line plus header fields of the first request on a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderRecord {
    method: Method,
    target: String,
    version: String,
    headers: HashMap<String, String>,
}

impl HeaderRecord {
    /// Starts a record from the request-start token; the method is never changed afterwards.
    pub(crate) fn open(line: RequestLine) -> Self {
        Self { method: line.method, target: line.target, version: line.version, headers: HashMap::new() }
    }

    /// Sets `name` to `value`, returning the value it replaced.
    pub(crate) fn insert(&mut self, name: String, value: String) -> Option<String> {
        self.headers.insert(name, value)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// The version token as received, e.g. `HTTP/1.1`.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The version as an [`http::Version`], `None` for versions it cannot represent.
    pub fn http_version(&self) -> Option<Version> {
        match self.version.as_str() {
            "HTTP/0.9" => Some(Version::HTTP_09),
            "HTTP/1.0" => Some(Version::HTTP_10),
            "HTTP/1.1" => Some(Version::HTTP_11),
            "HTTP/2" | "HTTP/2.0" => Some(Version::HTTP_2),
            "HTTP/3" | "HTTP/3.0" => Some(Version::HTTP_3),
            _ => None,
        }
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Case-sensitive lookup of a header value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn into_headers(self) -> HashMap<String, String> {
        self.headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with_version(version: &str) -> HeaderRecord {
        HeaderRecord::open(RequestLine { method: Method::GET, target: "/".into(), version: version.into() })
    }

    fn record() -> HeaderRecord {
        record_with_version("HTTP/1.1")
    }

    #[test]
    fn last_write_wins() {
        let mut record = record();
        assert_eq!(record.insert("Accept".into(), "text/html".into()), None);
        assert_eq!(record.insert("Accept".into(), "*/*".into()), Some("text/html".into()));
        assert_eq!(record.get("Accept"), Some("*/*"));
        assert_eq!(record.headers().len(), 1);
    }

    #[test]
    fn names_are_case_sensitive() {
        let mut record = record();
        record.insert("Host".into(), "a".into());
        record.insert("host".into(), "b".into());
        assert_eq!(record.get("Host"), Some("a"));
        assert_eq!(record.get("host"), Some("b"));
        assert_eq!(record.get("HOST"), None);
        assert_eq!(record.method(), &Method::GET);
    }

    #[test]
    fn unknown_versions_keep_their_text() {
        assert_eq!(record().http_version(), Some(Version::HTTP_11));
        assert_eq!(record_with_version("HTTP/2").http_version(), Some(Version::HTTP_2));

        let record = record_with_version("HTTP/1.2");
        assert_eq!(record.version(), "HTTP/1.2");
        assert_eq!(record.http_version(), None);
    }
}
