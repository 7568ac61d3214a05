use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::error::canonical_reason;

/// Maximum inline headers before heap allocation
pub const MAX_INLINE_HEADERS: usize = 16;

/// Header storage; names keep the case they were set with and are compared
/// case-insensitively
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

pub(crate) fn find_header<'a>(headers: &'a HeaderVec, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

pub(crate) fn replace_header(headers: &mut HeaderVec, name: &str, value: String) {
    headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    headers.push((Arc::from(name), value));
}

pub(crate) const DEFAULT_PROTOCOL: &str = "HTTP/1.1";

/// A response produced by the dispatcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code (200, 404, 500, etc.)
    pub status: u16,
    /// Protocol of the status line, taken from the request
    pub protocol: String,
    pub headers: HeaderVec,
    /// Serialized body, empty when nothing was sent
    pub body: String,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status: 200,
            protocol: DEFAULT_PROTOCOL.to_string(),
            headers: HeaderVec::new(),
            body: String::new(),
        }
    }
}

impl Response {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Response answering a request made over `protocol`
    #[must_use]
    pub fn for_protocol(protocol: &str) -> Self {
        Self {
            protocol: protocol.to_string(),
            ..Self::default()
        }
    }

    /// Canonical reason phrase of the current status
    #[must_use]
    pub fn reason(&self) -> &'static str {
        canonical_reason(self.status)
    }

    /// `"HTTP/1.1 404 Not Found"`
    #[must_use]
    pub fn status_line(&self, protocol: &str) -> String {
        format!("{} {} {}", protocol, self.status, self.reason())
    }

    pub fn set_status(&mut self, status: u16) {
        self.status = status;
    }

    /// Get a header by name
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    #[must_use]
    pub fn has_header(&self, name: &str) -> bool {
        self.get_header(name).is_some()
    }

    /// Add or replace a header
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        replace_header(&mut self.headers, name, value.into());
    }

    pub fn remove_header(&mut self, name: &str) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    }
}

impl fmt::Display for Response {
    /// Renders the response the way it goes on the wire
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\r\n", self.status_line(&self.protocol))?;
        for (name, value) in &self.headers {
            write!(f, "{}: {}\r\n", name, value)?;
        }
        write!(f, "\r\n{}", self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_line() {
        let mut res = Response::new();
        assert_eq!(res.status_line("HTTP/1.1"), "HTTP/1.1 200 OK");
        res.set_status(404);
        assert_eq!(res.status_line("HTTP/1.0"), "HTTP/1.0 404 Not Found");
    }

    #[test]
    fn test_display_uses_response_protocol() {
        let mut res = Response::for_protocol("HTTP/1.0");
        res.set_status(404);
        res.set_header("Content-Type", "application/json");
        res.body = "{}".to_string();
        assert_eq!(
            res.to_string(),
            "HTTP/1.0 404 Not Found\r\nContent-Type: application/json\r\n\r\n{}"
        );
        assert!(Response::new().to_string().starts_with("HTTP/1.1 200 OK\r\n"));
    }

    #[test]
    fn test_headers_case_insensitive() {
        let mut res = Response::new();
        res.set_header("Content-Type", "application/json");
        res.set_header("content-type", "application/xml");
        assert_eq!(res.headers.len(), 1);
        assert_eq!(res.get_header("CONTENT-TYPE"), Some("application/xml"));
        res.remove_header("Content-Type");
        assert!(!res.has_header("content-type"));
    }
}
