use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use once_cell::sync::Lazy;
use once_cell::unsync::OnceCell;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

use super::response::{find_header, replace_header, HeaderVec, DEFAULT_PROTOCOL};
use crate::error::RestError;
use crate::format::{resolve_format, Format};

static TRAILING_FORMAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.\w+$").expect("valid trailing format regex"));

static CONTENT_TYPE_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r";\s*").expect("valid content type separator regex"));

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
const JSON: &str = "application/json";

/// An inbound HTTP request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    /// Raw request target, query string included
    pub uri: String,
    /// Protocol used in the response status line
    pub protocol: String,
    pub headers: HeaderVec,
    pub body: Vec<u8>,
}

impl Request {
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            protocol: DEFAULT_PROTOCOL.to_string(),
            headers: HeaderVec::new(),
            body: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        replace_header(&mut self.headers, name, value.into());
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    /// Get a header by name (case-insensitive)
    #[inline]
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Decoded query string parameters, last occurrence wins
    #[must_use]
    pub fn query_params(&self) -> HashMap<String, String> {
        parse_query_params(&self.uri)
    }

    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<String> {
        let (_, query) = self.uri.split_once('?')?;
        url::form_urlencoded::parse(query.as_bytes())
            .filter(|(k, _)| k == name)
            .last()
            .map(|(_, v)| v.into_owned())
    }
}

/// Parse query string parameters from a request target
///
/// # Example
///
/// ```rust
/// use restserver::server::parse_query_params;
///
/// let params = parse_query_params("/users?limit=10&name=a%20b");
/// assert_eq!(params["limit"], "10");
/// assert_eq!(params["name"], "a b");
/// ```
#[must_use]
pub fn parse_query_params(uri: &str) -> HashMap<String, String> {
    match uri.split_once('?') {
        Some((_, query)) => url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect(),
        None => HashMap::new(),
    }
}

/// Reduce a request target to the path the route table matches against.
///
/// The query string, one leading slash, one trailing slash and a trailing
/// `.ext` format suffix are removed.
///
/// ```rust
/// use restserver::server::normalize_path;
///
/// assert_eq!(normalize_path("/api/users/7.json?x=1"), "api/users/7");
/// assert_eq!(normalize_path("/api/users/"), "api/users");
/// ```
#[must_use]
pub fn normalize_path(uri: &str) -> String {
    let without_query = uri.split_once('?').map_or(uri, |(path, _)| path);
    let path = without_query.strip_prefix('/').unwrap_or(without_query);
    let path = path.strip_suffix('/').unwrap_or(path);
    TRAILING_FORMAT.replace(path, "").into_owned()
}

/// Whether the request body is parsed for `method`
#[must_use]
pub fn carries_body(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::POST | Method::PUT)
}

/// Parse a request body according to its `Content-Type`.
///
/// - `application/x-www-form-urlencoded`: an object of decoded `key=value`
///   pairs; entries without a key are skipped
/// - `application/json`, missing or empty: JSON, null when invalid or empty
///
/// # Errors
///
/// Any other content type is rejected with a 500.
pub fn parse_body(content_type: Option<&str>, body: &[u8]) -> Result<Value, RestError> {
    let content_type = content_type.map(str::trim).filter(|ct| !ct.is_empty());

    let Some(content_type) = content_type else {
        return Ok(parse_json(body));
    };

    let mut is_form = false;
    let mut is_json = false;
    for component in CONTENT_TYPE_SEPARATOR.split(content_type) {
        is_form |= component == FORM_URLENCODED;
        is_json |= component == JSON;
    }

    if is_form {
        Ok(parse_form(body))
    } else if is_json {
        Ok(parse_json(body))
    } else {
        Err(RestError::new(
            500,
            format!("Content-Type \"{}\" not supported", content_type),
        ))
    }
}

fn parse_json(body: &[u8]) -> Value {
    if body.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(body).unwrap_or_else(|e| {
        debug!(error = %e, "Request body is not valid JSON");
        Value::Null
    })
}

fn parse_form(body: &[u8]) -> Value {
    let raw = String::from_utf8_lossy(body);
    let mut output = Map::new();
    for entry in raw.split('&') {
        if entry.find('=').is_some_and(|idx| idx > 0) {
            let mut parts = entry.split('=');
            let key = parts.next().unwrap_or_default();
            let value = parts.next().unwrap_or_default();
            output.insert(decode_component(key), Value::String(decode_component(value)));
        }
    }
    Value::Object(output)
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

/// Per-request view used by the dispatcher and handed to handlers.
///
/// Path, format and body are each derived once and then reused.
pub struct RequestContext<'a> {
    request: &'a Request,
    default_format: Format,
    path: OnceCell<String>,
    format: OnceCell<Format>,
    body: OnceCell<Result<Option<Value>, RestError>>,
    params: OnceCell<Vec<(Arc<str>, String)>>,
}

impl<'a> RequestContext<'a> {
    #[must_use]
    pub fn new(request: &'a Request, default_format: Format) -> Self {
        Self {
            request,
            default_format,
            path: OnceCell::new(),
            format: OnceCell::new(),
            body: OnceCell::new(),
            params: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn request(&self) -> &'a Request {
        self.request
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.request.method
    }

    #[must_use]
    pub fn uri(&self) -> &str {
        &self.request.uri
    }

    /// Normalized path, see [`normalize_path`]
    pub fn path(&self) -> &str {
        self.path.get_or_init(|| normalize_path(&self.request.uri))
    }

    /// Negotiated response format
    pub fn format(&self) -> Format {
        *self.format.get_or_init(|| {
            resolve_format(
                &self.request.uri,
                self.request.header("accept"),
                self.default_format,
            )
        })
    }

    /// Parsed body; `Ok(None)` for methods that do not carry one.
    ///
    /// # Errors
    ///
    /// The content type is not supported.
    pub fn body(&self) -> Result<Option<&Value>, RestError> {
        self.body
            .get_or_init(|| {
                if carries_body(&self.request.method) {
                    parse_body(self.request.header("content-type"), &self.request.body).map(Some)
                } else {
                    Ok(None)
                }
            })
            .as_ref()
            .map(Option::as_ref)
            .map_err(Clone::clone)
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.request.header(name)
    }

    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.request.query_param(name)
    }

    /// Path parameters captured by the matched route
    #[must_use]
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.params
            .get()?
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    pub(crate) fn set_path_params(&self, params: impl IntoIterator<Item = (Arc<str>, String)>) {
        let _ = self.params.set(params.into_iter().collect());
    }
}
