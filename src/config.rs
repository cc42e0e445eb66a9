//! Configuration loading.
//!
//! `.env` is read first, then the environment, then the YAML file named by
//! `BERGHAIN_CONFIG`:
//!
//! ```yaml
//! secret: <base64, 32 bytes>
//! default:
//!   - { duration: 1m, type: none, countdown: 3 }
//!   - { duration: 30m, type: pow }
//! frontend:
//!   shop:
//!     - { duration: 5m, type: pow, countdown: 5 }
//! listen: tcp://127.0.0.1:9000
//! ```
//!
//! When loading from a file, `BERGHAIN_SECRET` overrides the `secret` key.
//! `listen` is carried for the process hosting the engine and is not used
//! by the engine itself.

use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::berghain::{Berghain, MAX_LEVELS};
use crate::clock::ApproximateClock;
use crate::frontend::{Frontend, Instance, DEFAULT_FRONTEND};
use crate::level::{Countdown, LevelConfig, ValidationType};
use crate::secret::Secret;

/// Environment variable naming the YAML file.
pub const CONFIG_PATH_ENV: &str = "BERGHAIN_CONFIG";

/// Environment variable overriding the secret.
pub const SECRET_ENV: &str = "BERGHAIN_SECRET";

/// YAML file used when [`CONFIG_PATH_ENV`] is unset.
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Configuration errors.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File that was read
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// YAML is not valid or has the wrong shape
    #[error("Invalid configuration document: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Missing required field
    #[error("Missing required configuration: {0}")]
    MissingRequired(&'static str),

    /// Secret is not valid base64
    #[error("Invalid secret: {0}")]
    InvalidSecret(String),

    /// Secret has the wrong length
    #[error("Invalid secret length: expected {expected} bytes, got {actual}")]
    InvalidSecretLength {
        /// Required length
        expected: usize,
        /// Decoded length
        actual: usize,
    },

    /// Duration could not be parsed or is zero
    #[error("Invalid duration {value:?}: {reason}")]
    InvalidDuration {
        /// Configured value
        value: String,
        /// Why it was rejected
        reason: String,
    },

    /// Validation type outside of `none` and `pow`
    #[error("Unknown validation type {0:?}")]
    UnknownValidationType(String),

    /// Countdown does not fit in one digit
    #[error("Invalid countdown {0}: must be at most 9")]
    InvalidCountdown(u8),

    /// Level table is empty
    #[error("At least one level is required")]
    NoLevels,

    /// Level table is longer than a level byte can address
    #[error("Too many levels: {0}, at most 255")]
    TooManyLevels(usize),

    /// Error inside one frontend's section
    #[error("Frontend {name:?}: {source}")]
    Frontend {
        /// Frontend name
        name: String,
        /// Underlying error
        source: Box<ConfigError>,
    },
}

impl ConfigError {
    fn in_frontend(self, name: &str) -> Self {
        Self::Frontend {
            name: name.to_owned(),
            source: Box::new(self),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    secret: Option<String>,
    default: Vec<RawLevel>,
    #[serde(default)]
    frontend: BTreeMap<String, Vec<RawLevel>>,
    #[serde(default)]
    listen: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawLevel {
    duration: String,
    #[serde(rename = "type")]
    validation_type: String,
    countdown: Option<u8>,
}

impl RawLevel {
    fn validate(&self) -> Result<LevelConfig, ConfigError> {
        let duration = humantime::parse_duration(self.duration.trim()).map_err(|e| {
            ConfigError::InvalidDuration {
                value: self.duration.clone(),
                reason: e.to_string(),
            }
        })?;
        if duration.is_zero() {
            return Err(ConfigError::InvalidDuration {
                value: self.duration.clone(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        let validation_type: ValidationType = self
            .validation_type
            .parse()
            .map_err(|_| ConfigError::UnknownValidationType(self.validation_type.clone()))?;

        let countdown = match self.countdown {
            None => Countdown::default(),
            Some(value) => Countdown::new(value).ok_or(ConfigError::InvalidCountdown(value))?,
        };

        Ok(LevelConfig::new(duration, validation_type).with_countdown(countdown))
    }
}

fn validate_levels(raw: &[RawLevel]) -> Result<Vec<LevelConfig>, ConfigError> {
    if raw.is_empty() {
        return Err(ConfigError::NoLevels);
    }
    if raw.len() > MAX_LEVELS {
        return Err(ConfigError::TooManyLevels(raw.len()));
    }
    raw.iter().map(RawLevel::validate).collect()
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Shared HMAC secret
    pub secret: Secret,
    /// Levels of the default frontend
    pub default: Vec<LevelConfig>,
    /// Levels of the named frontends
    pub frontends: BTreeMap<String, Vec<LevelConfig>>,
    /// Address the hosting process listens on, passed through verbatim
    pub listen: Option<String>,
}

impl Config {
    /// Loads `.env`, then the file named by [`CONFIG_PATH_ENV`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file is unreadable or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let path = env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_owned());
        Self::from_path(path)
    }

    /// Loads a YAML file. [`SECRET_ENV`] takes precedence over its
    /// `secret` key.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file is unreadable or invalid.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        let config = Self::parse(&text, env::var(SECRET_ENV).ok())?;
        info!(
            path = %path.display(),
            levels = config.default.len(),
            frontends = config.frontends.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Parses a YAML document. The environment is not consulted.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the document is invalid.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        Self::parse(text, None)
    }

    fn parse(text: &str, secret_override: Option<String>) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_yaml::from_str(text)?;

        let secret = match secret_override.or(raw.secret) {
            Some(encoded) => Secret::from_base64(&encoded)?,
            None => return Err(ConfigError::MissingRequired("secret")),
        };

        let default = validate_levels(&raw.default).map_err(|e| e.in_frontend(DEFAULT_FRONTEND))?;
        let frontends = raw
            .frontend
            .iter()
            .map(|(name, levels)| {
                validate_levels(levels)
                    .map(|levels| (name.clone(), levels))
                    .map_err(|e| e.in_frontend(name))
            })
            .collect::<Result<_, _>>()?;

        Ok(Self {
            secret,
            default,
            frontends,
            listen: raw.listen,
        })
    }

    /// Builds one engine per frontend. All share the secret and `clock`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a level table is rejected by the engine.
    pub fn build_instance(&self, clock: &Arc<ApproximateClock>) -> Result<Instance, ConfigError> {
        let default = Berghain::new(&self.secret, self.default.clone(), Arc::clone(clock))?;
        let mut instance = Instance::new(Frontend::new(DEFAULT_FRONTEND, default));
        for (name, levels) in &self.frontends {
            let engine = Berghain::new(&self.secret, levels.clone(), Arc::clone(clock))
                .map_err(|e| e.in_frontend(name))?;
            instance = instance.with_frontend(Frontend::new(name.clone(), engine));
        }
        Ok(instance)
    }
}
