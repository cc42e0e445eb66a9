//! Tracing subscriber setup.
//!
//! `BERGHAIN_LOG` holds an [`EnvFilter`] directive and falls back to
//! `RUST_LOG`, then to `info`. `BERGHAIN_LOG_FORMAT` picks `plain` or `json`.

use std::env;
use std::str::FromStr;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use tracing_subscriber::util::TryInitError;

/// Environment variable holding the filter directive.
pub const LOG_FILTER_ENV: &str = "BERGHAIN_LOG";

/// Environment variable selecting the output format.
pub const LOG_FORMAT_ENV: &str = "BERGHAIN_LOG_FORMAT";

const FALLBACK_FILTER_ENV: &str = "RUST_LOG";
const DEFAULT_FILTER: &str = "info";

/// Event output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human readable lines
    #[default]
    Plain,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" | "text" => Ok(Self::Plain),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format {other:?}")),
        }
    }
}

/// Subscriber settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// [`EnvFilter`] directive, e.g. `berghain=debug,warn`
    pub filter: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_owned(),
            format: LogFormat::Plain,
        }
    }
}

impl TracingConfig {
    /// Reads [`LOG_FILTER_ENV`] and [`LOG_FORMAT_ENV`] from the process
    /// environment. An unparseable format falls back to plain.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let filter = lookup(LOG_FILTER_ENV)
            .or_else(|| lookup(FALLBACK_FILTER_ENV))
            .filter(|directive| !directive.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_FILTER.to_owned());
        let format = lookup(LOG_FORMAT_ENV)
            .and_then(|value| value.parse().ok())
            .unwrap_or_default();
        Self { filter, format }
    }

    /// Overrides the filter directive.
    #[must_use]
    pub fn with_filter(mut self, directive: impl Into<String>) -> Self {
        self.filter = directive.into();
        self
    }

    /// Overrides the output format.
    #[must_use]
    pub const fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Parses the directive. Invalid directives degrade to the default.
    #[must_use]
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Installs the global tracing subscriber.
///
/// # Errors
///
/// Returns [`TryInitError`] when a global subscriber is already set.
pub fn init_tracing(config: &TracingConfig) -> Result<(), TryInitError> {
    let registry = tracing_subscriber::registry().with(config.env_filter());

    match config.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?,
        LogFormat::Plain => registry.with(tracing_subscriber::fmt::layer()).try_init()?,
    }

    tracing::info!(filter = %config.filter, format = ?config.format, "Tracing initialized");
    Ok(())
}
