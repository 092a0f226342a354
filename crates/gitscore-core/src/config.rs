use std::path::{Path, PathBuf};

use gitscore_api::{ClientConfig, RetryConfig};
use serde::{Deserialize, Serialize};

use crate::{scoring::ScoringConfig, Error, Result};

/// Main configuration structure
///
/// Loaded once at boot and immutable for the process lifetime. Bad scoring
/// configs are rejected here, before any request is served.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub github: GithubApiConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

impl Config {
    /// Load config from the default location, falling back to defaults when
    /// no file exists yet.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            // No config file? Use defaults
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to disk
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)))?;

        std::fs::write(&config_path, contents)?;
        Ok(())
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.scoring.validate()?;

        if self.github.base_url.trim().is_empty() {
            return Err(Error::Config("github.base_url must not be empty".into()));
        }
        if self.github.retry.max_attempts == 0 {
            return Err(Error::Config(
                "github.retry.max_attempts must be at least 1".into(),
            ));
        }
        if self.github.connect_timeout_ms == 0 || self.github.read_timeout_ms == 0 {
            return Err(Error::Config("github timeouts must be positive".into()));
        }

        Ok(())
    }

    /// Get the config file path
    /// Uses XDG on Linux/macOS, AppData on Windows
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("could not find config directory".into()))?
            .join("gitscore");

        Ok(config_dir.join("config.toml"))
    }
}

/// Settings for the upstream GitHub client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Connection timeout in ms; the client clamps this to a hard ceiling.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Read timeout in ms; also clamped to a hard ceiling.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Serve a tagged empty result when retries are exhausted, instead of
    /// failing the request.
    #[serde(default = "default_fallback_to_empty")]
    pub fallback_to_empty: bool,

    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    1000
}

fn default_read_timeout_ms() -> u64 {
    2500
}

fn default_fallback_to_empty() -> bool {
    true
}

impl Default for GithubApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            connect_timeout_ms: default_connect_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
            fallback_to_empty: default_fallback_to_empty(),
            retry: RetryPolicy::default(),
        }
    }
}

impl GithubApiConfig {
    /// Wire-level client settings derived from this config.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url.clone(),
            connect_timeout_ms: self.connect_timeout_ms,
            read_timeout_ms: self.read_timeout_ms,
            fallback_to_empty: self.fallback_to_empty,
            retry: RetryConfig {
                max_attempts: self.retry.max_attempts,
                backoff_base_ms: self.retry.backoff_delay_ms,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_backoff_delay_ms")]
    pub backoff_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_delay_ms() -> u64 {
    500
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_delay_ms: default_backoff_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache TTL in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,

    /// Maximum number of cached query results
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,
}

fn default_cache_ttl_secs() -> u64 {
    300 // repo search results go stale quickly
}

fn default_cache_max_entries() -> usize {
    256
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl_secs(),
            max_entries: default_cache_max_entries(),
        }
    }
}
