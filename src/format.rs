//! Output formats and response format resolution.
//!
//! A client can ask for a format in two ways:
//!
//! 1. With a dot suffix in the URL: `/controller/action.json`
//! 2. With an `Accept` header
//!
//! When both are present the URL suffix wins.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::negotiation::sort_by_priority;

/// Matches the first `.ext` that is followed by the end of the URI or the
/// start of the query string
static FORMAT_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.(\w+)(?:$|\?)").expect("valid format suffix regex"));

/// Response formats the serializer can produce
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Plain,
    Html,
    #[default]
    Json,
    Jsonp,
    Xml,
}

impl Format {
    pub const ALL: [Format; 5] = [
        Format::Plain,
        Format::Html,
        Format::Json,
        Format::Jsonp,
        Format::Xml,
    ];

    /// Canonical MIME type, also used as the `Content-Type` value
    #[must_use]
    pub fn mime(self) -> &'static str {
        match self {
            Format::Plain => "text/plain",
            Format::Html => "text/html",
            Format::Json => "application/json",
            Format::Jsonp => "application/json-p",
            Format::Xml => "application/xml",
        }
    }

    /// URL suffix that selects this format, if any
    #[must_use]
    pub fn abbreviation(self) -> Option<&'static str> {
        match self {
            Format::Html => Some("html"),
            Format::Json => Some("json"),
            Format::Xml => Some("xml"),
            Format::Plain | Format::Jsonp => None,
        }
    }

    #[must_use]
    pub fn from_mime(mime: &str) -> Option<Format> {
        Self::ALL.into_iter().find(|f| f.mime() == mime)
    }

    #[must_use]
    pub fn is_supported(mime: &str) -> bool {
        Self::from_mime(mime).is_some()
    }

    #[must_use]
    pub fn from_abbreviation(abbreviation: &str) -> Option<Format> {
        Self::ALL
            .into_iter()
            .find(|f| f.abbreviation() == Some(abbreviation))
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

/// Decide the response format for a request.
///
/// # Arguments
///
/// * `uri` - Raw request URI, query string included
/// * `accept` - Value of the `Accept` header, if sent
/// * `default` - Format used when neither the header nor the URI decide
///
/// # Example
///
/// ```rust
/// use restserver::format::{resolve_format, Format};
///
/// assert_eq!(resolve_format("/controller/action.xml", Some("text/plain"), Format::Json), Format::Xml);
/// assert_eq!(resolve_format("/controller/action", Some("text/html"), Format::Json), Format::Html);
/// ```
#[must_use]
pub fn resolve_format(uri: &str, accept: Option<&str>, default: Format) -> Format {
    let mut format = default;

    if let Some(accept) = accept {
        if let Some(negotiated) = sort_by_priority(accept)
            .tokens()
            .find_map(Format::from_mime)
        {
            format = negotiated;
        }
    }

    let suffix = FORMAT_SUFFIX
        .captures(uri)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_ascii_lowercase());

    if let Some(overridden) = suffix.as_deref().and_then(Format::from_abbreviation) {
        format = overridden;
    }

    format
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_abbreviation() {
        assert_eq!(Format::from_abbreviation("json"), Some(Format::Json));
        assert_eq!(Format::from_abbreviation("non-existent"), None);
    }

    #[test]
    fn test_is_supported() {
        assert!(Format::is_supported("application/json"));
        assert!(!Format::is_supported("non/existent"));
    }

    #[test]
    fn test_resolve_from_uri_suffix() {
        let cases = [
            ("/controller/action.format", Format::Json),
            ("/controller/action", Format::Json),
            ("/controller/action.html", Format::Html),
            ("/controller/action.json", Format::Json),
            ("/controller/action.xml", Format::Xml),
        ];
        for (uri, expected) in cases {
            assert_eq!(
                resolve_format(uri, None, Format::Json),
                expected,
                "format mismatch for {}",
                uri
            );
        }
    }

    #[test]
    fn test_resolve_from_accept_header() {
        let cases = [
            ("application/json", Format::Json),
            ("application/json;q=1,application/xml;q=.5", Format::Json),
            ("application/json,application/xml;q=.5", Format::Json),
            ("application/json,application/xml", Format::Json),
            ("application/json-p", Format::Jsonp),
            ("text/html", Format::Html),
            ("text/plain", Format::Plain),
            ("application/xml", Format::Xml),
        ];
        for (accept, expected) in cases {
            assert_eq!(
                resolve_format("/controller/action", Some(accept), Format::Json),
                expected,
                "format mismatch for Accept: {}",
                accept
            );
        }
    }

    #[test]
    fn test_uri_suffix_overrides_accept_and_default() {
        assert_eq!(
            resolve_format("/controller/action.xml", Some("text/plain"), Format::Json),
            Format::Xml
        );
        assert_eq!(
            resolve_format("/controller/action.json", None, Format::Xml),
            Format::Json
        );
    }

    #[test]
    fn test_suffix_before_query_string() {
        assert_eq!(
            resolve_format("/controller.text/action.json?key=/value.xml", None, Format::Json),
            Format::Json
        );
    }

    #[test]
    fn test_question_mark_in_the_middle() {
        assert_eq!(
            resolve_format("/controller.text?/action.txt?key=/value.xml", None, Format::Json),
            Format::Json
        );
    }

    #[test]
    fn test_unknown_accept_keeps_default() {
        assert_eq!(
            resolve_format("/a", Some("image/png,*/*;q=0.1"), Format::Xml),
            Format::Xml
        );
    }
}
