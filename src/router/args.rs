//! Positional handler arguments.

use serde_json::Value;
use smallvec::SmallVec;

use crate::language::Language;

/// Maximum number of handler arguments before heap allocation.
pub const MAX_INLINE_ARGS: usize = 8;

/// One positional argument
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Value(Value),
    Language(Language),
}

impl Default for Arg {
    fn default() -> Self {
        Arg::Value(Value::Null)
    }
}

/// Arguments in the order the handler declared its parameters.
///
/// The router fills every position with a captured path segment, the request
/// body or the declared default. Positions declared as
/// [`ParamKind::Language`](crate::meta::ParamKind::Language) are replaced with
/// the negotiated language by the dispatcher right before invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args(SmallVec<[Arg; MAX_INLINE_ARGS]>);

impl Args {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, arg: Arg) {
        self.0.push(arg);
    }

    /// Replace the argument at `index`, growing with nulls when needed
    pub fn set(&mut self, index: usize, arg: Arg) {
        if index >= self.0.len() {
            self.0.resize_with(index + 1, Arg::default);
        }
        self.0[index] = arg;
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Arg> {
        self.0.get(index)
    }

    /// JSON value at `index`; `None` for language arguments
    #[must_use]
    pub fn value(&self, index: usize) -> Option<&Value> {
        match self.0.get(index) {
            Some(Arg::Value(value)) => Some(value),
            _ => None,
        }
    }

    /// String value at `index`
    #[must_use]
    pub fn str(&self, index: usize) -> Option<&str> {
        self.value(index).and_then(Value::as_str)
    }

    #[must_use]
    pub fn language(&self, index: usize) -> Option<&Language> {
        match self.0.get(index) {
            Some(Arg::Language(language)) => Some(language),
            _ => None,
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arg> {
        self.0.iter()
    }

    /// JSON view of all arguments, languages rendered as their preferred tag
    #[must_use]
    pub fn to_values(&self) -> Vec<Value> {
        self.0
            .iter()
            .map(|arg| match arg {
                Arg::Value(value) => value.clone(),
                Arg::Language(language) => Value::String(language.preferred().to_string()),
            })
            .collect()
    }
}

impl FromIterator<Value> for Args {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self(iter.into_iter().map(Arg::Value).collect())
    }
}

impl<'a> IntoIterator for &'a Args {
    type Item = &'a Arg;
    type IntoIter = std::slice::Iter<'a, Arg>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
