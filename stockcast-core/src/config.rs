//! Application configuration.
//!
//! One `AppConfig` value is loaded at startup (TOML file plus environment
//! overrides) and handed to the source, store and forecaster constructors.

use crate::model::{BoostedParams, ForecastSettings, DEFAULT_LAGS};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ENV_API_KEY: &str = "STOCKCAST_API_KEY";
pub const ENV_API_KEY_FALLBACK: &str = "ALPHAVANTAGE_API_KEY";
pub const ENV_STORE_DIR: &str = "STOCKCAST_STORE_DIR";

/// Highest accepted `source.max_retries`.
pub const MAX_RETRIES_LIMIT: u32 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub source: SourceConfig,
    pub store: StoreConfig,
    pub forecast: ForecastConfig,
}

/// Price-data provider settings.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub api_key: String,
    pub base_url: String,
    pub output_size: OutputSize,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    /// Consecutive failures that open the circuit breaker.
    pub breaker_failure_threshold: u32,
    /// How long an open breaker refuses requests.
    pub breaker_cooldown_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://www.alphavantage.co".into(),
            output_size: OutputSize::Compact,
            timeout_secs: 30,
            max_retries: 3,
            retry_base_delay_ms: 500,
            breaker_failure_threshold: 3,
            breaker_cooldown_secs: 60,
        }
    }
}

impl fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = if self.api_key.is_empty() { "" } else { "<redacted>" };
        f.debug_struct("SourceConfig")
            .field("api_key", &key)
            .field("base_url", &self.base_url)
            .field("output_size", &self.output_size)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_base_delay_ms", &self.retry_base_delay_ms)
            .field("breaker_failure_threshold", &self.breaker_failure_threshold)
            .field("breaker_cooldown_secs", &self.breaker_cooldown_secs)
            .finish()
    }
}

/// Provider history depth: roughly the last 100 sessions, or everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputSize {
    #[default]
    Compact,
    Full,
}

impl OutputSize {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputSize::Compact => "compact",
            OutputSize::Full => "full",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { dir: PathBuf::from("data") }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    #[default]
    Boosted,
    Linear,
}

impl ModelKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ModelKind::Boosted => "boosted",
            ModelKind::Linear => "linear",
        }
    }
}

impl std::str::FromStr for ModelKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "boosted" => Ok(ModelKind::Boosted),
            "linear" => Ok(ModelKind::Linear),
            other => Err(ConfigError::Invalid(format!(
                "unknown model '{other}' (expected boosted or linear)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub lags: usize,
    pub horizon: usize,
    pub test_fraction: f64,
    pub seed: u64,
    pub model: ModelKind,
    pub boosted: BoostedParams,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        let settings = ForecastSettings::default();
        Self {
            lags: DEFAULT_LAGS,
            horizon: settings.horizon,
            test_fraction: settings.test_fraction,
            seed: settings.seed,
            model: ModelKind::default(),
            boosted: BoostedParams::default(),
        }
    }
}

impl ForecastConfig {
    pub fn settings(&self) -> ForecastSettings {
        ForecastSettings {
            horizon: self.horizon,
            test_fraction: self.test_fraction,
            seed: self.seed,
        }
    }
}

impl AppConfig {
    /// Parse TOML; absent keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    /// Defaults or `path`, then process environment overrides, then validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from `lookup` (environment variable name to value).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty(ENV_API_KEY).or_else(|| non_empty(ENV_API_KEY_FALLBACK)) {
            self.source.api_key = key;
        }
        if let Some(dir) = non_empty(ENV_STORE_DIR) {
            self.store.dir = PathBuf::from(dir);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let f = &self.forecast;
        if f.lags == 0 {
            return Err(ConfigError::Invalid("forecast.lags must be >= 1".into()));
        }
        if f.horizon == 0 {
            return Err(ConfigError::Invalid("forecast.horizon must be >= 1".into()));
        }
        if !(f.test_fraction > 0.0 && f.test_fraction < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "forecast.test_fraction must be in (0, 1), got {}",
                f.test_fraction
            )));
        }
        f.boosted
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("forecast.boosted: {e}")))?;
        let s = &self.source;
        if s.timeout_secs == 0 {
            return Err(ConfigError::Invalid("source.timeout_secs must be >= 1".into()));
        }
        if s.max_retries > MAX_RETRIES_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "source.max_retries must be <= {MAX_RETRIES_LIMIT}, got {}",
                s.max_retries
            )));
        }
        if s.breaker_failure_threshold == 0 {
            return Err(ConfigError::Invalid(
                "source.breaker_failure_threshold must be >= 1".into(),
            ));
        }
        Ok(())
    }
}
