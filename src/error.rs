//! Error types.
//!
//! Two families exist and they never mix:
//!
//! - [`RestError`] is client facing. It carries an HTTP status code and an
//!   optional detail message and is always converted into a response by the
//!   [`Dispatcher`](crate::dispatcher::Dispatcher).
//! - [`ConfigError`] reports programming mistakes made while registering
//!   controllers. It is returned to the caller of the registration API and
//!   never reaches a client.

use std::fmt;

use http::StatusCode;

/// An error that is reported back to the client as an HTTP status.
///
/// # Example
///
/// ```rust
/// use restserver::error::RestError;
///
/// let err = RestError::new(404, "User not found");
/// assert_eq!(err.status(), 404);
/// assert_eq!(err.reason(), "Not Found");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestError {
    status: u16,
    message: Option<String>,
}

impl RestError {
    /// Create an error with a status code and a detail message
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: Some(message.into()),
        }
    }

    /// Create an error that only carries a status code
    #[must_use]
    pub fn status_only(status: u16) -> Self {
        Self {
            status,
            message: None,
        }
    }

    #[must_use]
    pub fn not_found() -> Self {
        Self::status_only(404)
    }

    #[must_use]
    pub fn unauthorized() -> Self {
        Self::new(401, "You are not authorized to access this resource.")
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Detail message, if one was given
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Canonical reason phrase for the status code (empty if unknown)
    #[must_use]
    pub fn reason(&self) -> &'static str {
        canonical_reason(self.status)
    }

    /// Message shown to the client.
    ///
    /// Outside debug mode only the reason phrase is exposed so handler
    /// internals do not leak.
    #[must_use]
    pub fn client_message(&self, debug: bool) -> String {
        match (&self.message, debug) {
            (Some(detail), true) if !detail.is_empty() => format!("{}: {}", self.reason(), detail),
            _ => self.reason().to_string(),
        }
    }
}

impl fmt::Display for RestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{} {}: {}", self.status, self.reason(), message),
            None => write!(f, "{} {}", self.status, self.reason()),
        }
    }
}

impl std::error::Error for RestError {}

/// Canonical reason phrase for a status code, empty for unknown codes
#[must_use]
pub fn canonical_reason(status: u16) -> &'static str {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("")
}

/// Registration error
///
/// Returned by [`Dispatcher::add_controller`](crate::dispatcher::Dispatcher::add_controller)
/// and the route table builder when the supplied metadata cannot be turned
/// into routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A `url` annotation does not have the form `METHOD /path`
    InvalidUrlDeclaration {
        /// Method the annotation belongs to
        method: String,
        /// The offending annotation value
        declaration: String,
    },
    /// A route pattern could not be compiled into a matcher
    InvalidPattern {
        /// The route pattern
        pattern: String,
        /// Compiler message
        reason: String,
    },
    /// A method declares routes but no handler function was bound to it
    MissingHandler {
        /// Controller name
        controller: String,
        /// Method name
        method: String,
    },
    /// A handler function was bound to a method the metadata does not know
    UnknownHandler {
        /// Controller name
        controller: String,
        /// Method name
        method: String,
    },
    /// A controller with the same name is already registered
    DuplicateController {
        /// Controller name
        controller: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidUrlDeclaration {
                method,
                declaration,
            } => write!(
                f,
                "Invalid url declaration '{}' on method '{}'. \
                Expected format: METHOD /path (e.g., GET /users/$id)",
                declaration, method
            ),
            ConfigError::InvalidPattern { pattern, reason } => {
                write!(f, "Route pattern '{}' cannot be compiled: {}", pattern, reason)
            }
            ConfigError::MissingHandler { controller, method } => write!(
                f,
                "Method '{}::{}' declares routes but has no handler bound",
                controller, method
            ),
            ConfigError::UnknownHandler { controller, method } => write!(
                f,
                "Handler bound to '{}::{}' but the controller has no such method",
                controller, method
            ),
            ConfigError::DuplicateController { controller } => {
                write!(f, "Controller '{}' is already registered", controller)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
