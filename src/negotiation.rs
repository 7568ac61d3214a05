//! Parsing of content negotiation headers such as `Accept` and
//! `Accept-Language`.
//!
//! A header value like `de-DE,de;q=0.8,en;q=0.4` is broken into
//! `(token, quality)` pairs and ordered by descending quality. Entries with the
//! same quality keep the order in which the client listed them, so
//! `a,x` always yields `[a, x]`.

/// One entry of a negotiation header
#[derive(Debug, Clone, PartialEq)]
pub struct Preference {
    /// Lower-cased token (MIME type, language tag, `*`, ...)
    pub token: String,
    /// Quality in the range the client sent, `1.0` when omitted
    pub quality: f64,
}

/// Preferences ordered by descending quality
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriorityList {
    entries: Vec<Preference>,
}

impl PriorityList {
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Preference> {
        self.entries.iter()
    }

    /// Highest ranked entry
    #[must_use]
    pub fn first(&self) -> Option<&Preference> {
        self.entries.first()
    }

    /// Quality of a token, if the client listed it
    #[must_use]
    pub fn quality(&self, token: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|p| p.token == token)
            .map(|p| p.quality)
    }

    /// Tokens in priority order
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|p| p.token.as_str())
    }
}

impl<'a> IntoIterator for &'a PriorityList {
    type Item = &'a Preference;
    type IntoIter = std::slice::Iter<'a, Preference>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Parse a negotiation header into a [`PriorityList`].
///
/// - the whole value is lower-cased
/// - a missing or unparsable `q` counts as `1.0`
/// - a token listed twice keeps its first position and its last quality
///
/// # Example
///
/// ```rust
/// use restserver::negotiation::sort_by_priority;
///
/// let list = sort_by_priority("de_DE;q=0.75,de;q=.6,en;q=.2");
/// let tokens: Vec<&str> = list.tokens().collect();
/// assert_eq!(tokens, vec!["de_de", "de", "en"]);
/// assert_eq!(list.quality("de"), Some(0.6));
/// ```
#[must_use]
pub fn sort_by_priority(header: &str) -> PriorityList {
    let header = header.trim();
    if header.is_empty() {
        return PriorityList::default();
    }

    let lowered = header.to_lowercase();
    let mut entries: Vec<Preference> = Vec::with_capacity(lowered.matches(',').count() + 1);

    for raw in lowered.split(',') {
        let mut parts = raw.trim().splitn(2, ";q=");
        let token = parts.next().unwrap_or("").trim();
        if token.is_empty() {
            continue;
        }
        let quality = parts
            .next()
            .and_then(|q| q.trim().parse::<f64>().ok())
            .filter(|q| q.is_finite())
            .unwrap_or(1.0);

        match entries.iter_mut().find(|p| p.token == token) {
            Some(existing) => existing.quality = quality,
            None => entries.push(Preference {
                token: token.to_string(),
                quality,
            }),
        }
    }

    // sort_by is stable: equal qualities keep the client's order
    entries.sort_by(|a, b| b.quality.total_cmp(&a.quality));

    PriorityList { entries }
}
