//! Configuration
//!
//! Loaded from TOML, with environment variable overrides applied on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;
use crate::rate_limiter::RateLimitPolicy;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub rate_limiter: RateLimiterConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum age of cached data before it is regenerated (default: 1 day)
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,

    /// Per-key TTLs, keyed by option name
    #[serde(default)]
    pub ttl_overrides: HashMap<String, u64>,

    /// Start with regeneration disabled
    #[serde(default)]
    pub refresh_disabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl(),
            ttl_overrides: HashMap::new(),
            refresh_disabled: false,
        }
    }
}

impl CacheConfig {
    /// TTL in seconds for a given key.
    pub fn ttl_for(&self, key: &str) -> u64 {
        self.ttl_overrides.get(key).copied().unwrap_or(self.ttl_secs)
    }

    pub fn with_ttl(mut self, key: impl Into<String>, ttl_secs: u64) -> Self {
        self.ttl_overrides.insert(key.into(), ttl_secs);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimiterConfig {
    /// Declined card attempts that trigger the limiter
    #[serde(default = "default_declined_threshold")]
    pub declined_card_threshold: usize,

    /// Counting window for declined attempts
    #[serde(default = "default_declined_window")]
    pub declined_card_window_secs: u64,

    /// How long checkout stays blocked once triggered (defaults to the window)
    #[serde(default)]
    pub declined_card_cooldown_secs: Option<u64>,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            declined_card_threshold: default_declined_threshold(),
            declined_card_window_secs: default_declined_window(),
            declined_card_cooldown_secs: None,
        }
    }
}

impl RateLimiterConfig {
    pub fn declined_card_policy(&self) -> RateLimitPolicy {
        let policy = RateLimitPolicy::new(
            self.declined_card_threshold,
            Duration::from_secs(self.declined_card_window_secs),
        );
        match self.declined_card_cooldown_secs {
            Some(secs) => policy.with_cooldown(Duration::from_secs(secs)),
            None => policy,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database holding cached options
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

// Defaults
fn default_cache_ttl() -> u64 { 24 * 60 * 60 } // 1 day
fn default_declined_threshold() -> usize { 5 }
fn default_declined_window() -> u64 { 10 * 60 } // 10 minutes
fn default_database_path() -> PathBuf { PathBuf::from("gateway-cache.db") }

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load from a TOML file. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Apply environment variable overrides. Unparseable values are ignored.
    pub fn apply_env(mut self) -> Self {
        if let Ok(val) = std::env::var("GATEWAY_CACHE_TTL_SECS") {
            if let Ok(secs) = val.parse::<u64>() {
                self.cache.ttl_secs = secs;
            }
        }

        if let Ok(val) = std::env::var("GATEWAY_CACHE_REFRESH_DISABLED") {
            if let Ok(disabled) = val.parse::<bool>() {
                self.cache.refresh_disabled = disabled;
            }
        }

        if let Ok(val) = std::env::var("GATEWAY_CACHE_DB") {
            if !val.is_empty() {
                self.storage.database_path = PathBuf::from(val);
            }
        }

        self
    }
}
