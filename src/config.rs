//! # Server Configuration
//!
//! [`ServerConfig`] collects every setting of a [`Dispatcher`](crate::dispatcher::Dispatcher).
//! It can be built in code, read from environment variables or loaded from a
//! YAML, JSON or TOML file.
//!
//! ## Environment Variables
//!
//! | Variable | Field |
//! |---|---|
//! | `RESTSRV_MODE` | `mode` (`debug` or `production`) |
//! | `RESTSRV_REALM` | `realm` |
//! | `RESTSRV_ROOT` | `root` |
//! | `RESTSRV_CACHE_DIR` | `cache_dir` |
//! | `RESTSRV_DEFAULT_FORMAT` | `default_format` (a MIME type such as `application/xml`) |
//! | `RESTSRV_DEFAULT_LANGUAGE` | `default_language` |
//! | `RESTSRV_SUPPORTED_LANGUAGES` | `supported_languages` (comma separated) |
//! | `RESTSRV_CORS_ALLOWED_ORIGINS` | `cors.allowed_origins` (comma separated) |
//! | `RESTSRV_CORS_ALLOWED_HEADERS` | `cors.allowed_headers` (comma separated) |
//! | `RESTSRV_CORS_MAX_AGE` | `cors.max_age` (seconds) |
//! | `RESTSRV_AUTH_CHALLENGE` | `auth_challenge` |
//!
//! ## Example File
//!
//! ```yaml
//! mode: production
//! root: api
//! cache_dir: /var/cache/restserver
//! default_format: json
//! supported_languages: [en, de]
//! cors:
//!   allowed_origins: ["*"]
//!   allowed_headers: [Content-Type, Authorization]
//!   max_age: 600
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::format::Format;

/// Operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Route table rebuilt on every start, error details exposed
    Debug,
    /// Route table cached, error details hidden
    Production,
}

impl Mode {
    /// Unknown values fall back to production
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "debug" => Mode::Debug,
            _ => Mode::Production,
        }
    }

    #[must_use]
    pub fn is_debug(self) -> bool {
        self == Mode::Debug
    }
}

/// CORS preflight settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Sent as `Access-Control-Allow-Origin`, joined with `, `
    pub allowed_origins: Vec<String>,
    /// Sent as `Access-Control-Allow-Headers`
    pub allowed_headers: Vec<String>,
    /// Sent as `Access-Control-Max-Age`, in seconds
    pub max_age: u32,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            allowed_headers: Vec::new(),
            max_age: 86_400,
        }
    }
}

/// Dispatcher settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub mode: Mode,
    /// Realm of the Basic authentication challenge
    pub realm: String,
    /// URL prefix prepended to every route
    pub root: String,
    /// Directory of the file route cache
    pub cache_dir: PathBuf,
    /// Format used when neither the URL nor `Accept` select one
    pub default_format: Format,
    pub default_language: String,
    pub supported_languages: Vec<String>,
    pub cors: CorsConfig,
    /// Send `WWW-Authenticate` when authorization fails
    pub auth_challenge: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Production,
            realm: "Rest Server".to_string(),
            root: String::new(),
            cache_dir: env::temp_dir(),
            default_format: Format::Json,
            default_language: "en".to_string(),
            supported_languages: Vec::new(),
            cors: CorsConfig::default(),
            auth_challenge: false,
        }
    }
}

fn list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl ServerConfig {
    /// Defaults for a mode
    #[must_use]
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Load configuration from environment variables; unset variables keep
    /// their defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Override fields from `RESTSRV_*` environment variables
    pub fn apply_env(&mut self) {
        if let Ok(mode) = env::var("RESTSRV_MODE") {
            self.mode = Mode::parse(&mode);
        }
        if let Ok(realm) = env::var("RESTSRV_REALM") {
            self.realm = realm;
        }
        if let Ok(root) = env::var("RESTSRV_ROOT") {
            self.root = root;
        }
        if let Ok(dir) = env::var("RESTSRV_CACHE_DIR") {
            self.cache_dir = PathBuf::from(dir);
        }
        if let Some(format) = env::var("RESTSRV_DEFAULT_FORMAT")
            .ok()
            .and_then(|mime| Format::from_mime(mime.trim()))
        {
            self.default_format = format;
        }
        if let Ok(language) = env::var("RESTSRV_DEFAULT_LANGUAGE") {
            self.default_language = language;
        }
        if let Ok(languages) = env::var("RESTSRV_SUPPORTED_LANGUAGES") {
            self.supported_languages = list(&languages);
        }
        if let Ok(origins) = env::var("RESTSRV_CORS_ALLOWED_ORIGINS") {
            self.cors.allowed_origins = list(&origins);
        }
        if let Ok(headers) = env::var("RESTSRV_CORS_ALLOWED_HEADERS") {
            self.cors.allowed_headers = list(&headers);
        }
        if let Some(max_age) = env::var("RESTSRV_CORS_MAX_AGE")
            .ok()
            .and_then(|s| s.trim().parse().ok())
        {
            self.cors.max_age = max_age;
        }
        if let Some(challenge) = env::var("RESTSRV_AUTH_CHALLENGE")
            .ok()
            .and_then(|s| s.trim().parse().ok())
        {
            self.auth_challenge = challenge;
        }
    }

    /// Load configuration from a YAML, JSON or TOML file
    ///
    /// # Errors
    ///
    /// The file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        read_document(path)
    }
}

/// Deserialize a YAML, JSON or TOML document, chosen by file extension
/// (YAML when the extension is unknown).
///
/// # Errors
///
/// The file cannot be read or does not match `T`.
pub fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse JSON {}", path.display())),
        "toml" => toml::from_str(&contents)
            .with_context(|| format!("Failed to parse TOML {}", path.display())),
        _ => serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML {}", path.display())),
    }
}
