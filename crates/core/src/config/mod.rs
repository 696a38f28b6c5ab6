// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration
//!
//! Loaded from a TOML file; every section and key is optional and falls back
//! to the defaults below. Durations use humantime syntax (`"30s"`, `"1m"`).

use crate::earnings::AccrualRate;
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// File looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "accrue.toml";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.36";

/// Errors from loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub api: ApiConfig,
    pub paths: PathsConfig,
    pub timing: TimingConfig,
    pub retry: RetryConfig,
    pub accrual: AccrualConfig,
}

/// Remote service endpoint and request headers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiConfig {
    pub base_url: String,
    pub referer: String,
    pub user_agent: String,
    /// Upper bound on a single HTTP request
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://kaleidofinance.xyz/api/testnet".to_string(),
            referer: "https://kaleidofinance.xyz/testnet".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Filesystem locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Newline-delimited identity list
    pub wallets: PathBuf,
    /// Directory holding `session_<identity>.json` files
    pub sessions: PathBuf,
    /// Daemon log file
    pub log: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            wallets: PathBuf::from("wallets.txt"),
            sessions: PathBuf::from("."),
            log: PathBuf::from("accrued.log"),
        }
    }
}

/// Loop cadence and shutdown bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimingConfig {
    /// Delay between periodic balance updates
    #[serde(with = "humantime_serde")]
    pub update_interval: Duration,
    /// Extra pause after the remote side rejects an update
    #[serde(with = "humantime_serde")]
    pub error_cooldown: Duration,
    /// Delay before re-attempting a failed initialization
    #[serde(with = "humantime_serde")]
    pub init_retry_delay: Duration,
    /// Upper bound on waiting for all workers to settle
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            update_interval: Duration::from_secs(30),
            error_cooldown: Duration::from_secs(60),
            init_retry_delay: Duration::from_secs(10),
            shutdown_timeout: Duration::from_secs(60),
        }
    }
}

/// Remote call retry policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    pub max_attempts: u32,
    #[serde(with = "humantime_serde")]
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            base_delay: policy.base_delay,
        }
    }
}

/// Accrual parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AccrualConfig {
    pub hashrate: f64,
    pub unit_factor: f64,
}

impl Default for AccrualConfig {
    fn default() -> Self {
        let rate = AccrualRate::default();
        Self {
            hashrate: rate.hashrate,
            unit_factor: rate.unit_factor,
        }
    }
}

impl Config {
    /// Parse configuration from TOML text
    pub fn from_toml(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text, path)
    }

    /// Load from `explicit` if given, else `accrue.toml` under `dir` if it
    /// exists, else defaults
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let candidate = dir.join(DEFAULT_CONFIG_FILE);
        if candidate.exists() {
            return Self::load(&candidate);
        }
        Ok(Self::default())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("api.base_url is empty".to_string()));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if !(self.accrual.hashrate >= 0.0 && self.accrual.unit_factor >= 0.0) {
            return Err(ConfigError::Invalid(
                "accrual parameters must be non-negative".to_string(),
            ));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            base_delay: self.retry.base_delay,
        }
    }

    pub fn accrual_rate(&self) -> AccrualRate {
        AccrualRate {
            hashrate: self.accrual.hashrate,
            unit_factor: self.accrual.unit_factor,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
