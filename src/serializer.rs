//! Rendering handler results as JSON, JSONP or XML.

use std::fmt::Write;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::RestError;
use crate::format::Format;
use crate::server::Response;

static CALLBACK_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9_]*$").expect("valid callback regex"));

/// Prolog written before every XML document
pub const XML_PROLOG: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" ?>\n";

/// A result that produces no body: null, `""`, `[]` or `{}`
#[must_use]
pub fn is_empty_result(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Compact JSON
#[must_use]
pub fn to_json(value: &Value) -> String {
    value.to_string()
}

/// `callback(json)`
///
/// # Errors
///
/// `400 No callback given.` when the callback is missing or is not a plain
/// identifier.
pub fn to_jsonp(value: &Value, callback: Option<&str>) -> Result<String, RestError> {
    match callback {
        Some(name) if CALLBACK_NAME.is_match(name) => Ok(format!("{}({})", name, to_json(value))),
        _ => Err(RestError::new(400, "No callback given.")),
    }
}

/// Full XML document: prolog plus `<result>` root
///
/// ```rust
/// use restserver::serializer::to_xml;
/// use serde_json::json;
///
/// assert_eq!(
///     to_xml(&json!({"key1": "value1"})),
///     "<?xml version=\"1.0\" encoding=\"UTF-8\" ?>\n<result><key1>value1</key1></result>"
/// );
/// ```
#[must_use]
pub fn to_xml(value: &Value) -> String {
    format!("{}<result>{}</result>", XML_PROLOG, xml_fragment(value))
}

/// XML for the content of the root element
///
/// Object keys become element names; array items and numeric keys become
/// `<item index="N">`. Keys that are not valid element names are written as
/// `<item key="...">`.
#[must_use]
pub fn xml_fragment(value: &Value) -> String {
    let mut out = String::new();
    write_xml(&mut out, value);
    out
}

fn write_xml(out: &mut String, value: &Value) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if key.bytes().all(|b| b.is_ascii_digit()) && !key.is_empty() {
                    write_element(out, "item", Some(("index", key)), child);
                } else if is_element_name(key) {
                    write_element(out, key, None, child);
                } else {
                    write_element(out, "item", Some(("key", key)), child);
                }
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                write_element(out, "item", Some(("index", &index.to_string())), child);
            }
        }
        scalar => out.push_str(&escape(&scalar_text(scalar))),
    }
}

fn write_element(out: &mut String, name: &str, attr: Option<(&str, &str)>, child: &Value) {
    out.push('<');
    out.push_str(name);
    if let Some((attr_name, attr_value)) = attr {
        let _ = write!(out, " {}=\"{}\"", attr_name, escape(attr_value));
    }
    out.push('>');
    write_xml(out, child);
    let _ = write!(out, "</{}>", name);
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => String::new(),
    }
}

fn is_element_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    !name.to_ascii_lowercase().starts_with("xml")
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Render `value` in `format`. Plain and HTML get JSON.
///
/// # Errors
///
/// JSONP without a valid callback.
pub fn render(value: &Value, format: Format, callback: Option<&str>) -> Result<String, RestError> {
    match format {
        Format::Xml => Ok(to_xml(value)),
        Format::Jsonp => to_jsonp(value, callback),
        Format::Json | Format::Plain | Format::Html => Ok(to_json(value)),
    }
}

/// Write `value` into `response` with the standard headers
///
/// # Errors
///
/// See [`render`]; the response is left untouched on error.
pub fn send(
    response: &mut Response,
    value: &Value,
    format: Format,
    callback: Option<&str>,
) -> Result<(), RestError> {
    let body = render(value, format, callback)?;
    response.set_header("Cache-Control", "no-cache, must-revalidate");
    response.set_header("Expires", "0");
    response.set_header("Content-Type", format.mime());
    response.body = body;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_results() {
        assert!(is_empty_result(&Value::Null));
        assert!(is_empty_result(&json!("")));
        assert!(is_empty_result(&json!([])));
        assert!(is_empty_result(&json!({})));
        assert!(!is_empty_result(&json!(0)));
        assert!(!is_empty_result(&json!(false)));
        assert!(!is_empty_result(&json!("0")));
    }

    #[test]
    fn test_jsonp() {
        let data = json!({"key1": "value1"});
        assert_eq!(
            to_jsonp(&data, Some("callback_function")).unwrap(),
            r#"callback_function({"key1":"value1"})"#
        );
    }

    #[test]
    fn test_jsonp_rejects_missing_or_invalid_callback() {
        let data = json!({"key1": "value1"});
        for callback in [None, Some(""), Some("1abc"), Some("alert(1)//")] {
            let err = to_jsonp(&data, callback).unwrap_err();
            assert_eq!(err.status(), 400);
            assert_eq!(err.message(), Some("No callback given."));
        }
    }

    #[test]
    fn test_xml_empty_array() {
        assert_eq!(xml_fragment(&json!([])), "");
    }

    #[test]
    fn test_xml_string_array() {
        assert_eq!(
            xml_fragment(&json!(["one", "two"])),
            r#"<item index="0">one</item><item index="1">two</item>"#
        );
    }

    #[test]
    fn test_xml_nested_object() {
        assert_eq!(
            xml_fragment(&json!({"key1": "value1", "key2": {"key3": "value2"}})),
            "<key1>value1</key1><key2><key3>value2</key3></key2>"
        );
    }

    #[test]
    fn test_xml_scalars_and_escaping() {
        assert_eq!(
            xml_fragment(&json!({"a": true, "b": null, "c": 1.5, "d": "<x & y>"})),
            "<a>true</a><b></b><c>1.5</c><d>&lt;x &amp; y&gt;</d>"
        );
    }

    #[test]
    fn test_xml_numeric_and_invalid_keys() {
        assert_eq!(
            xml_fragment(&json!({"0": "zero", "two words": "x"})),
            r#"<item index="0">zero</item><item key="two words">x</item>"#
        );
    }

    #[test]
    fn test_send_sets_standard_headers() {
        let mut response = Response::new();
        send(&mut response, &json!({"key1": "value1"}), Format::Xml, None).unwrap();
        assert_eq!(response.get_header("Cache-Control"), Some("no-cache, must-revalidate"));
        assert_eq!(response.get_header("Expires"), Some("0"));
        assert_eq!(response.get_header("Content-Type"), Some("application/xml"));
        assert!(response.body.starts_with(XML_PROLOG));
    }

    #[test]
    fn test_plain_and_html_render_json() {
        let data = json!([1, 2]);
        assert_eq!(render(&data, Format::Plain, None).unwrap(), "[1,2]");
        assert_eq!(render(&data, Format::Html, None).unwrap(), "[1,2]");
    }
}
