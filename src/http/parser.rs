use bytes::{Bytes, BytesMut};
use std::collections::HashMap;

use crate::http::request::{Method, Request};

/// Largest header block accepted before the request is rejected.
pub const MAX_HEADER_BYTES: usize = 8 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("malformed request line")]
    InvalidRequest,
    #[error("unsupported method")]
    InvalidMethod,
    #[error("malformed header")]
    InvalidHeader,
    #[error("invalid Content-Length")]
    InvalidContentLength,
    #[error("header block too large")]
    HeadersTooLarge,
    #[error("incomplete request")]
    Incomplete,
}

impl ParseError {
    /// Short stable identifier, suitable for log lines.
    pub fn name(&self) -> &'static str {
        match self {
            ParseError::InvalidRequest => "invalid_request",
            ParseError::InvalidMethod => "invalid_method",
            ParseError::InvalidHeader => "invalid_header",
            ParseError::InvalidContentLength => "invalid_content_length",
            ParseError::HeadersTooLarge => "headers_too_large",
            ParseError::Incomplete => "incomplete",
        }
    }
}

/// Parses one request from the front of `buf`.
///
/// Returns the request and the number of bytes it occupied, or
/// [`ParseError::Incomplete`] when more input is needed.
pub fn parse_http_request(buf: &[u8]) -> Result<(Request, usize), ParseError> {
    // Look for header/body separator
    let headers_end = match find_headers_end(buf) {
        Some(end) if end > MAX_HEADER_BYTES => return Err(ParseError::HeadersTooLarge),
        Some(end) => end,
        None if buf.len() > MAX_HEADER_BYTES => return Err(ParseError::HeadersTooLarge),
        None => return Err(ParseError::Incomplete),
    };
    let header_bytes = &buf[..headers_end];
    let body_bytes = &buf[headers_end + 4..];

    let headers_str = std::str::from_utf8(header_bytes).map_err(|_| ParseError::InvalidRequest)?;

    let mut lines = headers_str.split("\r\n");

    // Request line
    let request_line = lines.next().ok_or(ParseError::InvalidRequest)?;
    let mut parts = request_line.split_whitespace();

    let method_str = parts.next().ok_or(ParseError::InvalidRequest)?;
    let path = parts.next().ok_or(ParseError::InvalidRequest)?;
    let version = parts.next().ok_or(ParseError::InvalidRequest)?;

    if parts.next().is_some() || !version.starts_with("HTTP/") {
        return Err(ParseError::InvalidRequest);
    }

    let method = Method::from_str(method_str).ok_or(ParseError::InvalidMethod)?;

    // Headers
    let mut headers = HashMap::new();
    let mut content_length = 0;

    for line in lines {
        if line.is_empty() {
            continue;
        }

        let (key, value) = line.split_once(':').ok_or(ParseError::InvalidHeader)?;
        let key = key.trim();
        let value = value.trim();

        if key.is_empty() {
            return Err(ParseError::InvalidHeader);
        }

        if key.eq_ignore_ascii_case("Content-Length") {
            content_length = value
                .parse::<usize>()
                .map_err(|_| ParseError::InvalidContentLength)?;
        }

        headers.insert(key.to_string(), value.to_string());
    }

    // Body
    if body_bytes.len() < content_length {
        return Err(ParseError::Incomplete);
    }

    let body = body_bytes[..content_length].to_vec();

    let request = Request {
        method,
        path: path.to_string(),
        version: version.to_string(),
        headers,
        body,
    };

    let total_consumed = headers_end + 4 + content_length;
    Ok((request, total_consumed))
}

fn find_headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

#[derive(Debug)]
enum State {
    Reading,
    Complete(Request),
    Failed(ParseError),
}

/// Incremental request accumulator.
///
/// Bytes are fed as they arrive from the socket; once a full request is
/// buffered the parser reports completion and stops consuming input.
/// Whatever arrived after that request is returned by [`finish`](Self::finish).
#[derive(Debug)]
pub struct RequestParser {
    buffer: BytesMut,
    state: State,
}

impl RequestParser {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(1024),
            state: State::Reading,
        }
    }

    /// Appends bytes and re-evaluates the buffer.
    ///
    /// Input after completion or failure is buffered but not parsed.
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);

        if !matches!(self.state, State::Reading) {
            return;
        }

        match parse_http_request(&self.buffer) {
            Ok((request, consumed)) => {
                let _ = self.buffer.split_to(consumed);
                self.state = State::Complete(request);
            }
            Err(ParseError::Incomplete) => {}
            Err(e) => self.state = State::Failed(e),
        }
    }

    /// True until the first byte has been fed.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty() && matches!(self.state, State::Reading)
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.state, State::Complete(_))
    }

    pub fn has_error(&self) -> bool {
        matches!(self.state, State::Failed(_))
    }

    pub fn error(&self) -> Option<&ParseError> {
        match &self.state {
            State::Failed(e) => Some(e),
            _ => None,
        }
    }

    pub fn error_name(&self) -> Option<&'static str> {
        self.error().map(ParseError::name)
    }

    /// Consumes a completed parser, yielding the request and any bytes that
    /// followed it. Returns `None` if no request was completed.
    pub fn finish(self) -> Option<(Request, Bytes)> {
        match self.state {
            State::Complete(request) => Some((request, self.buffer.freeze())),
            _ => None,
        }
    }
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::new()
    }
}
