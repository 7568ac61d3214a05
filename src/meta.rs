//! Controller metadata: the structured replacement for routing annotations.
//!
//! Every controller is described by a [`ControllerMeta`] listing its methods.
//! A [`MethodMeta`] carries the formal parameters in declaration order and the
//! method's annotations. The `url` annotation holds one or more route
//! declarations of the form `METHOD /pattern`; every other annotation is a
//! flag (`noAuth`) or a value that is attached to the routes unchanged.
//!
//! Metadata can be built in code or loaded from a manifest file (see
//! [`crate::manifest`]).
//!
//! ```rust
//! use http::Method;
//! use restserver::meta::MethodMeta;
//! use serde_json::json;
//!
//! let meta = MethodMeta::new("unorderd")
//!     .url(Method::GET, "/unorderd")
//!     .url(Method::GET, "/unorderd/param1/$param1/param2/$param2")
//!     .param_with_default("param1", json!("default_value_1"))
//!     .param_with_default("param2", json!("default_value_2"));
//!
//! assert_eq!(meta.url_declarations().unwrap().len(), 2);
//! ```

use std::collections::BTreeMap;

use http::Method;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConfigError;

/// Annotation key holding route declarations
pub const URL_ANNOTATION: &str = "url";
/// Flag annotation that skips authorization
pub const NO_AUTH_ANNOTATION: &str = "noAuth";
/// Name of the parameter that receives the parsed request body
pub const DATA_PARAM: &str = "data";

static URL_DECLARATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(GET|POST|PUT|DELETE|HEAD|OPTIONS|PATCH)[ \t]+/?(\S*)")
        .expect("valid url declaration regex")
});

/// Value of a single annotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnnotationValue {
    /// Annotation written without a value
    Flag(bool),
    /// Scalar value, last occurrence wins
    Text(String),
    /// Accumulated values (always used for `url`)
    List(Vec<String>),
}

/// Annotations of one method, keyed by name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Annotations(BTreeMap<String, AnnotationValue>);

impl Annotations {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&AnnotationValue> {
        self.0.get(key)
    }

    /// True when the key is present as a flag or with any value
    #[must_use]
    pub fn is_set(&self, key: &str) -> bool {
        match self.0.get(key) {
            Some(AnnotationValue::Flag(flag)) => *flag,
            Some(AnnotationValue::Text(text)) => !text.is_empty(),
            Some(AnnotationValue::List(items)) => !items.is_empty(),
            None => false,
        }
    }

    /// Scalar value of a key
    #[must_use]
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(AnnotationValue::Text(text)) => Some(text),
            _ => None,
        }
    }

    /// Mark `key` as a flag
    pub fn set_flag(&mut self, key: impl Into<String>) {
        self.0.insert(key.into(), AnnotationValue::Flag(true));
    }

    /// Add a value. `url` accumulates, everything else is replaced.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if key == URL_ANNOTATION {
            match self.0.get_mut(&key) {
                Some(AnnotationValue::List(items)) => items.push(value),
                Some(AnnotationValue::Text(first)) => {
                    let first = std::mem::take(first);
                    self.0.insert(key, AnnotationValue::List(vec![first, value]));
                }
                _ => {
                    self.0.insert(key, AnnotationValue::List(vec![value]));
                }
            }
        } else {
            self.0.insert(key, AnnotationValue::Text(value));
        }
    }

    /// Raw `url` declarations in the order they were added
    #[must_use]
    pub fn urls(&self) -> &[String] {
        match self.0.get(URL_ANNOTATION) {
            Some(AnnotationValue::List(items)) => items,
            Some(AnnotationValue::Text(single)) => std::slice::from_ref(single),
            _ => &[],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AnnotationValue)> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// How the dispatcher fills a parameter position
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    /// Filled from a path capture, the request body or the declared default
    #[default]
    Value,
    /// Replaced with the negotiated [`Language`](crate::language::Language)
    Language,
}

/// One formal parameter of a controller method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormalParam {
    pub name: String,
    /// Declared default; `None` means the position is null when unbound
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub kind: ParamKind,
}

impl FormalParam {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
            kind: ParamKind::Value,
        }
    }

    /// Value used when nothing binds this position
    #[must_use]
    pub fn default_value(&self) -> Value {
        self.default.clone().unwrap_or(Value::Null)
    }
}

/// A parsed `url` annotation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlDecl {
    pub method: Method,
    /// Pattern without its leading slash
    pub pattern: String,
}

/// Metadata of one controller method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodMeta {
    pub name: String,
    #[serde(default)]
    pub params: Vec<FormalParam>,
    #[serde(default)]
    pub annotations: Annotations,
}

impl MethodMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            annotations: Annotations::new(),
        }
    }

    /// Declare a route for this method
    #[must_use]
    pub fn url(mut self, method: Method, pattern: &str) -> Self {
        self.annotations
            .insert(URL_ANNOTATION, format!("{} {}", method, pattern));
        self
    }

    /// Declare a parameter without a default
    #[must_use]
    pub fn param(mut self, name: &str) -> Self {
        self.params.push(FormalParam::new(name));
        self
    }

    #[must_use]
    pub fn param_with_default(mut self, name: &str, default: Value) -> Self {
        let mut param = FormalParam::new(name);
        param.default = Some(default);
        self.params.push(param);
        self
    }

    /// Declare a parameter that receives the negotiated language
    #[must_use]
    pub fn language_param(mut self, name: &str) -> Self {
        let mut param = FormalParam::new(name);
        param.kind = ParamKind::Language;
        self.params.push(param);
        self
    }

    #[must_use]
    pub fn flag(mut self, key: &str) -> Self {
        self.annotations.set_flag(key);
        self
    }

    #[must_use]
    pub fn annotation(mut self, key: &str, value: &str) -> Self {
        self.annotations.insert(key, value);
        self
    }

    /// Parse every `url` annotation.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidUrlDeclaration`] for a value that is not
    /// `METHOD /pattern` with a supported method.
    pub fn url_declarations(&self) -> Result<Vec<UrlDecl>, ConfigError> {
        self.annotations
            .urls()
            .iter()
            .map(|declaration| {
                let invalid = || ConfigError::InvalidUrlDeclaration {
                    method: self.name.clone(),
                    declaration: declaration.clone(),
                };
                let captures = URL_DECLARATION
                    .captures(declaration.trim())
                    .ok_or_else(invalid)?;
                let method = captures
                    .get(1)
                    .and_then(|m| Method::from_bytes(m.as_str().as_bytes()).ok())
                    .ok_or_else(invalid)?;
                let pattern = captures
                    .get(2)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default();
                Ok(UrlDecl { method, pattern })
            })
            .collect()
    }
}

/// Metadata of a controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerMeta {
    pub name: String,
    #[serde(default)]
    pub methods: Vec<MethodMeta>,
}

impl ControllerMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: Vec::new(),
        }
    }

    #[must_use]
    pub fn method(mut self, method: MethodMeta) -> Self {
        self.methods.push(method);
        self
    }

    #[must_use]
    pub fn find_method(&self, name: &str) -> Option<&MethodMeta> {
        self.methods.iter().find(|m| m.name == name)
    }
}
