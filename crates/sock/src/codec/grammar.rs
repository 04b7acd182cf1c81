//! Token grammars of the header window.
//!
//! Tokens produced with [`Delimiter::line`](crate::codec::Delimiter::line) keep their line break,
//! so trailing CR/LF bytes are ignored when matching request and header lines, and a blank line
//! arrives as the terminator token `"\r\n"` or `"\n"`.

use http::Method;

use crate::protocol::RequestLine;

/// `VERB SP target SP VERSION`, e.g. `GET /index.html HTTP/1.1`.
pub(crate) fn parse_request_line(token: &[u8]) -> Option<RequestLine> {
    let line = trim_line_end(token);
    let mut fields = line.split(u8::is_ascii_whitespace).filter(|field| !field.is_empty());

    let (verb, target, version) = (fields.next()?, fields.next()?, fields.next()?);
    if fields.next().is_some() || !is_verb(verb) {
        return None;
    }

    if !is_version(version) {
        return None;
    }
    let version = std::str::from_utf8(version).ok()?.to_owned();
    let method = Method::from_bytes(verb).ok()?;
    let target = std::str::from_utf8(target).ok()?.to_owned();

    Some(RequestLine { method, target, version })
}

/// `Name: value` where the name is made of ASCII letters and hyphens.
pub(crate) fn parse_header_line(token: &[u8]) -> Option<(String, String)> {
    let line = trim_line_end(token);
    let colon = line.iter().position(|b| *b == b':')?;
    let (name, value) = (&line[..colon], &line[colon + 1..]);

    if name.is_empty() || !name.iter().all(|b| b.is_ascii_alphabetic() || *b == b'-') {
        return None;
    }

    let name = std::str::from_utf8(name).ok()?;
    let value = std::str::from_utf8(value.trim_ascii()).ok()?;
    Some((name.to_owned(), value.to_owned()))
}

/// One or two line breaks and nothing else; `\r\n` counts as a single break.
pub(crate) fn is_terminator(token: &[u8]) -> bool {
    if token.is_empty() || !token.iter().all(|b| matches!(b, b'\r' | b'\n')) {
        return false;
    }

    let mut breaks = 0;
    let mut rest = token;
    while !rest.is_empty() {
        rest = match rest {
            [b'\r', b'\n', tail @ ..] => tail,
            [_, tail @ ..] => tail,
            [] => rest,
        };
        breaks += 1;
    }
    breaks <= 2
}

fn trim_line_end(token: &[u8]) -> &[u8] {
    let end = token.iter().rposition(|b| !matches!(b, b'\r' | b'\n')).map_or(0, |i| i + 1);
    &token[..end]
}

fn is_verb(field: &[u8]) -> bool {
    field.first().is_some_and(u8::is_ascii_uppercase) && field.iter().all(|b| b.is_ascii_uppercase() || *b == b'-')
}

/// `HTTP/x` or `HTTP/x.y` with single digits.
fn is_version(field: &[u8]) -> bool {
    match field {
        [b'H', b'T', b'T', b'P', b'/', major] => major.is_ascii_digit(),
        [b'H', b'T', b'T', b'P', b'/', major, b'.', minor] => major.is_ascii_digit() && minor.is_ascii_digit(),
        _ => false,
    }
}
