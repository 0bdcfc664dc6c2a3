//! Configuration loading, validation, and management for Storyloom.
//!
//! Loads configuration from `~/.storyloom/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.storyloom/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Context assembly budgets
    #[serde(default)]
    pub context: ContextConfig,

    /// Context cache sizing
    #[serde(default)]
    pub cache: CacheConfig,

    /// Generation retry policy
    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Token budget for extraction and full context injection
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Stricter budget for latency-sensitive operations (critical chunks only)
    #[serde(default = "default_minimal_max_tokens")]
    pub minimal_max_tokens: usize,
}

fn default_max_tokens() -> usize {
    8000
}
fn default_minimal_max_tokens() -> usize {
    2000
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            minimal_max_tokens: default_minimal_max_tokens(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Time-to-live of a cached extraction, from creation
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_max_entries() -> usize {
    50
}
fn default_ttl_secs() -> u64 {
    300
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts per logical call, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Backoff growth per failed attempt
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Upper bound on a single call into the generator
    #[serde(default = "default_attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,
}

fn default_max_attempts() -> u32 {
    3
}
fn default_initial_delay_ms() -> u64 {
    1000
}
fn default_multiplier() -> f64 {
    2.0
}
fn default_max_delay_ms() -> u64 {
    10_000
}
fn default_attempt_timeout_secs() -> u64 {
    120
}

impl RetryConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            multiplier: default_multiplier(),
            max_delay_ms: default_max_delay_ms(),
            attempt_timeout_secs: default_attempt_timeout_secs(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from the default path (~/.storyloom/config.toml).
    ///
    /// Environment variables override file values:
    /// - `STORYLOOM_MAX_CONTEXT_TOKENS`
    /// - `STORYLOOM_CACHE_TTL_SECS`
    /// - `STORYLOOM_MAX_ATTEMPTS`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".storyloom")
    }

    /// Apply overrides from a key lookup (the process environment in `load`).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("STORYLOOM_MAX_CONTEXT_TOKENS") {
            self.context.max_tokens = parse_override("STORYLOOM_MAX_CONTEXT_TOKENS", &value)?;
        }
        if let Some(value) = lookup("STORYLOOM_CACHE_TTL_SECS") {
            self.cache.ttl_secs = parse_override("STORYLOOM_CACHE_TTL_SECS", &value)?;
        }
        if let Some(value) = lookup("STORYLOOM_MAX_ATTEMPTS") {
            self.retry.max_attempts = parse_override("STORYLOOM_MAX_ATTEMPTS", &value)?;
        }
        Ok(())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.context.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "context.max_tokens must be > 0".into(),
            ));
        }
        if self.context.minimal_max_tokens == 0
            || self.context.minimal_max_tokens > self.context.max_tokens
        {
            return Err(ConfigError::ValidationError(
                "context.minimal_max_tokens must be > 0 and <= context.max_tokens".into(),
            ));
        }
        if self.cache.max_entries == 0 {
            return Err(ConfigError::ValidationError(
                "cache.max_entries must be > 0".into(),
            ));
        }
        if self.cache.ttl_secs == 0 {
            return Err(ConfigError::ValidationError(
                "cache.ttl_secs must be > 0".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "retry.max_attempts must be >= 1".into(),
            ));
        }
        if !self.retry.multiplier.is_finite() || self.retry.multiplier < 1.0 {
            return Err(ConfigError::ValidationError(
                "retry.multiplier must be a finite number >= 1.0".into(),
            ));
        }
        if self.retry.max_delay_ms < self.retry.initial_delay_ms {
            return Err(ConfigError::ValidationError(
                "retry.max_delay_ms must be >= retry.initial_delay_ms".into(),
            ));
        }
        if self.retry.attempt_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "retry.attempt_timeout_secs must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn parse_override<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::ValidationError(format!("{key} has invalid value '{value}'")))
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
