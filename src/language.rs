//! Response language negotiation from the `Accept-Language` header.

use std::fmt;

use crate::negotiation::{sort_by_priority, PriorityList};

/// The outcome of negotiating the client's languages against the languages
/// the server supports.
///
/// Handlers receive this value for every parameter declared with
/// [`ParamKind::Language`](crate::meta::ParamKind::Language).
///
/// # Example
///
/// ```rust
/// use restserver::language::Language;
///
/// let lang = Language::new(
///     vec!["en".into(), "de".into()],
///     "en",
///     "de-DE,de;q=0.8,en-US;q=0.6,en;q=0.4",
/// );
/// assert_eq!(lang.preferred(), "de");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Language {
    supported: Vec<String>,
    default_language: String,
    client_accepted: PriorityList,
    negotiated: Vec<(String, f64)>,
}

impl Language {
    pub fn new(
        supported: Vec<String>,
        default_language: impl Into<String>,
        accept_language: &str,
    ) -> Self {
        let client_accepted = sort_by_priority(accept_language);

        let negotiated = client_accepted
            .iter()
            .filter(|pref| {
                supported
                    .iter()
                    .any(|s| s.eq_ignore_ascii_case(&pref.token))
            })
            .map(|pref| (pref.token.clone(), pref.quality))
            .collect();

        Self {
            supported,
            default_language: default_language.into(),
            client_accepted,
            negotiated,
        }
    }

    /// Best supported language, or the default if nothing matched
    #[must_use]
    pub fn preferred(&self) -> &str {
        self.negotiated
            .first()
            .map(|(token, _)| token.as_str())
            .unwrap_or(&self.default_language)
    }

    /// Client languages the server supports, in client priority order
    #[must_use]
    pub fn negotiated(&self) -> &[(String, f64)] {
        &self.negotiated
    }

    /// Everything the client listed, in priority order
    #[must_use]
    pub fn client_accepted(&self) -> &PriorityList {
        &self.client_accepted
    }

    #[must_use]
    pub fn supported(&self) -> &[String] {
        &self.supported
    }

    #[must_use]
    pub fn default_language(&self) -> &str {
        &self.default_language
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.preferred())
    }
}
