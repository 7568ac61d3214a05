//! Route pattern compilation.
//!
//! A pattern is a path relative to the server root in which `$name` matches a
//! single path segment and `$name...` matches the rest of the path, slashes
//! included. Everything else is literal text.

use regex::Regex;

/// One placeholder found in a pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub name: String,
    /// `$name...` form
    pub greedy: bool,
}

/// A pattern is parameterized when it contains a `$` at all; literal
/// patterns are compared with plain string equality.
#[must_use]
pub fn is_parameterized(pattern: &str) -> bool {
    pattern.contains('$')
}

/// Split a pattern into literal text and placeholders.
#[must_use]
pub fn placeholders(pattern: &str) -> Vec<Placeholder> {
    scan(pattern)
        .into_iter()
        .filter_map(|token| match token {
            Token::Placeholder(p) => Some(p),
            Token::Literal(_) => None,
        })
        .collect()
}

enum Token {
    Literal(String),
    Placeholder(Placeholder),
}

fn scan(pattern: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut rest = pattern;

    while let Some(idx) = rest.find('$') {
        literal.push_str(&rest[..idx]);
        let after = &rest[idx + 1..];
        let name_len = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(after.len());

        if name_len == 0 {
            // lone dollar sign
            literal.push('$');
            rest = after;
            continue;
        }

        if !literal.is_empty() {
            tokens.push(Token::Literal(std::mem::take(&mut literal)));
        }
        let name = &after[..name_len];
        let tail = &after[name_len..];
        let greedy = tail.starts_with("...");
        tokens.push(Token::Placeholder(Placeholder {
            name: name.to_string(),
            greedy,
        }));
        rest = if greedy { &tail[3..] } else { tail };
    }

    literal.push_str(rest);
    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }
    tokens
}

/// Compile a pattern into an anchored regex with one positional group per
/// placeholder, and return the placeholder names in group order.
///
/// # Example
///
/// ```rust
/// use restserver::router::pattern_to_regex;
///
/// let (re, names) = pattern_to_regex("users/$id/files/$path...").unwrap();
/// assert_eq!(names, vec!["id", "path"]);
/// assert!(re.is_match("users/7/files/a/b/c.txt"));
/// assert!(!re.is_match("users/7/8/files/a"));
/// ```
///
/// # Errors
///
/// Returns the regex compiler error when the resulting expression is
/// rejected (for instance when it exceeds the size limit).
pub fn pattern_to_regex(pattern: &str) -> Result<(Regex, Vec<String>), regex::Error> {
    let tokens = scan(pattern);
    let mut expr = String::with_capacity(pattern.len() + 16);
    let mut names = Vec::new();

    expr.push('^');
    for token in tokens {
        match token {
            Token::Literal(text) => expr.push_str(&regex::escape(&text)),
            Token::Placeholder(p) => {
                expr.push_str(if p.greedy { "(.+)" } else { "([^/]+)" });
                names.push(p.name);
            }
        }
    }
    expr.push('$');

    Ok((Regex::new(&expr)?, names))
}
