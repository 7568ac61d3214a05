//! Route records and their compiled parameter bindings.

use std::fmt;

use http::Method;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::pattern::{is_parameterized, pattern_to_regex};
use crate::error::ConfigError;
use crate::meta::{Annotations, FormalParam, ParamKind, DATA_PARAM};

/// The methods a route can be declared for, in the order they are reported
/// in `Access-Control-Allow-Methods`.
pub static ROUTABLE_METHODS: [Method; 7] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::HEAD,
    Method::OPTIONS,
    Method::PATCH,
];

/// Controller and method a route invokes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandlerRef {
    pub controller: String,
    pub method: String,
}

impl HandlerRef {
    pub fn new(controller: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            controller: controller.into(),
            method: method.into(),
        }
    }
}

impl fmt::Display for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.controller, self.method)
    }
}

/// One entry of the route table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    #[serde(with = "method_serde")]
    pub method: Method,
    /// Full pattern: root + base path + declared pattern, without leading slash
    pub pattern: String,
    pub handler: HandlerRef,
    /// Formal parameters in declaration order
    pub params: Vec<FormalParam>,
    pub annotations: Annotations,
    #[serde(skip)]
    pub(crate) binding: Binding,
}

/// Matcher and parameter positions derived from a route's pattern and formal
/// parameters. Rebuilt after a route is read back from the cache.
#[derive(Debug, Clone, Default)]
pub(crate) struct Binding {
    pub(crate) matcher: Option<Regex>,
    /// Placeholder names in capture group order
    pub(crate) capture_names: Vec<String>,
    /// Parameter position for each capture group, `None` when the handler has
    /// no parameter of that name
    pub(crate) capture_slots: Vec<Option<usize>>,
    pub(crate) data_slot: Option<usize>,
    pub(crate) language_slots: Vec<usize>,
}

impl Route {
    /// Create a route and compile its binding.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidPattern`] when the pattern cannot be compiled.
    pub fn new(
        method: Method,
        pattern: impl Into<String>,
        handler: HandlerRef,
        params: Vec<FormalParam>,
        annotations: Annotations,
    ) -> Result<Self, ConfigError> {
        Self {
            method,
            pattern: pattern.into(),
            handler,
            params,
            annotations,
            binding: Binding::default(),
        }
        .compiled()
    }

    /// Compile the binding of a route built without one (e.g. deserialized).
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidPattern`] when the pattern cannot be compiled.
    pub fn compiled(mut self) -> Result<Self, ConfigError> {
        let position = |name: &str| self.params.iter().position(|p| p.name == name);

        let mut binding = Binding {
            data_slot: position(DATA_PARAM),
            language_slots: self
                .params
                .iter()
                .enumerate()
                .filter(|(_, p)| p.kind == ParamKind::Language)
                .map(|(i, _)| i)
                .collect(),
            ..Binding::default()
        };

        if is_parameterized(&self.pattern) {
            let (regex, names) =
                pattern_to_regex(&self.pattern).map_err(|e| ConfigError::InvalidPattern {
                    pattern: self.pattern.clone(),
                    reason: e.to_string(),
                })?;
            binding.capture_slots = names.iter().map(|n| position(n)).collect();
            binding.capture_names = names;
            binding.matcher = Some(regex);
        }

        self.binding = binding;
        Ok(self)
    }

    #[must_use]
    pub fn is_parameterized(&self) -> bool {
        self.binding.matcher.is_some()
    }

    /// Placeholder names in the order they appear in the pattern
    #[must_use]
    pub fn placeholder_names(&self) -> &[String] {
        &self.binding.capture_names
    }

    /// Positions that receive the negotiated language
    #[must_use]
    pub fn language_positions(&self) -> &[usize] {
        &self.binding.language_slots
    }

    /// Position of the `data` parameter, if declared
    #[must_use]
    pub fn data_position(&self) -> Option<usize> {
        self.binding.data_slot
    }

    /// True when the same method and pattern are registered
    #[must_use]
    pub fn same_key(&self, other: &Route) -> bool {
        self.method == other.method && self.pattern == other.pattern
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} /{} -> {}", self.method, self.pattern, self.handler)
    }
}

pub(crate) mod method_serde {
    use http::Method;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(method: &Method, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(method.as_str())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Method, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Method::from_bytes(raw.as_bytes()).map_err(D::Error::custom)
    }
}
