//! TOML kiosk configuration
//!
//! A single optional config file shapes the demo binary: submission mode,
//! retry envelope, client network profile, backup storage location and log
//! defaults. CLI flags override the file; the file overrides built-in
//! defaults. Discovery follows the platform config directory
//! (`<config>/deskqueue/deskqueue.toml`) when no path is given.

use crate::core::retry::{Backoff, RetryPolicy};
use crate::queue::ClientProfile;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file {path} not found")]
    NotFound { path: String },

    #[error("Failed to read configuration file {path}: {source}")]
    Unreadable {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse configuration file {path}: {source}")]
    Invalid {
        path: String,
        source: toml::de::Error,
    },
}

/// How the binary presents submission results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubmissionMode {
    #[default]
    Kiosk,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackoffSetting {
    Fixed,
    Exponential,
}

/// Retry envelope knobs, mirrored into a `RetryPolicy`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: usize,
    pub base_delay_ms: u64,
    pub backoff: BackoffSetting,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            base_delay_ms: policy.base_delay.as_millis() as u64,
            backoff: BackoffSetting::Exponential,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub level: Option<String>,
    pub file: Option<PathBuf>,
    pub format: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct KioskConfig {
    pub mode: SubmissionMode,
    pub retry: RetrySettings,
    /// Mobile-grade connectivity: probe the store before each retry
    pub constrained_network: bool,
    /// Device-local backup file; platform default when absent
    pub backup_path: Option<PathBuf>,
    pub log: LogSettings,
}

impl KioskConfig {
    /// Load the config file, or defaults when none exists
    ///
    /// An explicitly given path must exist; the discovered default path is
    /// optional.
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match config_file {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound {
                        path: path.display().to_string(),
                    });
                }
                Some(path.to_path_buf())
            }
            None => Self::default_path().filter(|p| p.exists()),
        };

        match path {
            Some(path) => Self::parse(
                &std::fs::read_to_string(&path).map_err(|source| ConfigError::Unreadable {
                    path: path.display().to_string(),
                    source,
                })?,
                &path.display().to_string(),
            ),
            None => Ok(Self::default()),
        }
    }

    pub fn parse(contents: &str, origin: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Invalid {
            path: origin.to_string(),
            source,
        })
    }

    fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("deskqueue").join("deskqueue.toml"))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
            backoff: match self.retry.backoff {
                BackoffSetting::Fixed => Backoff::Fixed,
                BackoffSetting::Exponential => Backoff::Exponential,
            },
        }
    }

    pub fn client_profile(&self) -> ClientProfile {
        ClientProfile {
            constrained_network: self.constrained_network,
        }
    }
}
