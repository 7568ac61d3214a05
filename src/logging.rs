//! Structured logging setup.
//!
//! All components log through `tracing`. Binaries and embedding servers call
//! [`init_logging`] or [`init_logging_with_config`] once at startup to install
//! a subscriber; the library itself never installs one.
//!
//! ## Environment Variables
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `RESTSRV_LOG_LEVEL` | `info` | trace/debug/info/warn/error |
//! | `RESTSRV_LOG_FORMAT` | `json` | `json` or `pretty` |
//! | `RESTSRV_LOG_ASYNC` | `true` | write through a non-blocking buffered writer |
//! | `RESTSRV_LOG_BUFFER_SIZE` | `8192` | lines buffered by the async writer |
//! | `RESTSRV_LOG_TARGET_FILTER` | unset | extra comma separated filter directives |
//! | `RESTSRV_LOG_INCLUDE_LOCATION` | `false` | include file:line |
//!
//! `RUST_LOG`, when set, takes precedence over `RESTSRV_LOG_LEVEL`.

use std::env;

use anyhow::{Context, Result};
use tracing::{Level, Subscriber};
use tracing_appender::non_blocking::NonBlockingBuilder;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Log format: JSON for production, pretty-print for development
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level: trace/debug/info/warn/error
    pub log_level: String,
    pub format: LogFormat,
    /// Enable async buffered logging
    pub async_logging: bool,
    /// Lines buffered by the async writer
    pub buffer_size: usize,
    /// Additional filter directives (comma-separated)
    pub target_filter: Option<String>,
    /// Include file:line location (dev only)
    pub include_location: bool,
}

impl LogConfig {
    /// Parse configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            log_level: env::var("RESTSRV_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: LogFormat::parse(
                &env::var("RESTSRV_LOG_FORMAT").unwrap_or_else(|_| "json".to_string()),
            ),
            async_logging: env::var("RESTSRV_LOG_ASYNC")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(true),
            buffer_size: env::var("RESTSRV_LOG_BUFFER_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8192),
            target_filter: env::var("RESTSRV_LOG_TARGET_FILTER").ok(),
            include_location: env::var("RESTSRV_LOG_INCLUDE_LOCATION")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(false),
        }
    }

    /// Configuration for local development
    pub fn default_dev() -> Self {
        Self {
            log_level: "debug".to_string(),
            format: LogFormat::Pretty,
            async_logging: false,
            buffer_size: 1024,
            target_filter: None,
            include_location: true,
        }
    }

    /// Configuration for production
    pub fn default_prod() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Json,
            async_logging: true,
            buffer_size: 8192,
            target_filter: None,
            include_location: false,
        }
    }

    fn level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }

    fn env_filter(&self) -> Result<EnvFilter> {
        let mut env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level().as_str()));

        let directives = self.target_filter.iter().flat_map(|f| f.split(','));
        for filter in directives.map(str::trim).filter(|f| !f.is_empty()) {
            let directive = filter
                .parse::<Directive>()
                .with_context(|| format!("Invalid log filter directive: {filter}"))?;
            env_filter = env_filter.add_directive(directive);
        }
        Ok(env_filter)
    }
}

/// Formatting layer for the configured format, writing to `writer`
fn fmt_layer<S>(config: &LogConfig, writer: BoxMakeWriter) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a> + 'static,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_writer(writer);

    match config.format {
        LogFormat::Json => layer
            .json()
            .with_current_span(true)
            .with_thread_ids(true)
            .boxed(),
        LogFormat::Pretty => layer.pretty().boxed(),
    }
}

/// Initialize logging from the environment, overriding the level
///
/// # Errors
///
/// An invalid filter directive, or a global subscriber is already installed.
pub fn init_logging(log_level: &str) -> Result<()> {
    let mut config = LogConfig::from_env();
    config.log_level = log_level.to_string();
    init_logging_with_config(&config)
}

/// Initialize logging with a complete configuration.
///
/// Output goes to stderr so it never mixes with command output on stdout.
///
/// ```no_run
/// use restserver::logging::{init_logging_with_config, LogConfig};
///
/// init_logging_with_config(&LogConfig::from_env()).expect("Failed to initialize logging");
/// ```
///
/// # Errors
///
/// An invalid filter directive, or a global subscriber is already installed.
pub fn init_logging_with_config(config: &LogConfig) -> Result<()> {
    let filter = config.env_filter()?;

    let (writer, guard) = if config.async_logging {
        let (non_blocking, guard) = NonBlockingBuilder::default()
            .buffered_lines_limit(config.buffer_size)
            .finish(std::io::stderr());
        (BoxMakeWriter::new(non_blocking), Some(guard))
    } else {
        (BoxMakeWriter::new(std::io::stderr), None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer(config, writer))
        .try_init()
        .context("Failed to initialize logging")?;

    // keep the async writer alive for the lifetime of the process
    if let Some(guard) = guard {
        std::mem::forget(guard);
    }
    Ok(())
}
