//! Process configuration, read from an optional TOML file.
//!
//! Every key has a default, so an absent file or an empty one yields a
//! working local setup.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::app::{OrchestratorSettings, RetryPolicy};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config syntax: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CourierConfig {
    pub listen_addr: String,
    pub log_format: LogFormat,
    pub orchestrator: OrchestratorConfig,
    pub status: StatusConfig,
}

impl Default for CourierConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            log_format: LogFormat::Pretty,
            orchestrator: OrchestratorConfig::default(),
            status: StatusConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub call_timeout_ms: u64,
    pub background_budget_ms: u64,
    pub max_in_flight: usize,
    pub shutdown_grace_ms: u64,
    pub retry: RetryConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: 10_000,
            background_budget_ms: 60_000,
            max_in_flight: 64,
            shutdown_grace_ms: 5_000,
            retry: RetryConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    pub fn settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            call_timeout: Duration::from_millis(self.call_timeout_ms),
            background_budget: Duration::from_millis(self.background_budget_ms),
            max_in_flight: self.max_in_flight,
            retry: self.retry.policy(),
        }
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 500,
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::exponential(
            self.max_attempts,
            Duration::from_millis(self.base_delay_ms),
            self.multiplier,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    pub retention_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            retention_secs: 3_600,
            sweep_interval_secs: 60,
        }
    }
}

impl StatusConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl CourierConfig {
    /// Load from `path`, or return defaults when no path is given.
    /// The result is validated either way.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                debug!(path = %path.display(), "loading config");
                let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml_str(&raw)?
            }
            None => {
                debug!("no config file given, using defaults");
                Self::default()
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let o = &self.orchestrator;
        nonzero("orchestrator.call_timeout_ms", o.call_timeout_ms)?;
        nonzero("orchestrator.background_budget_ms", o.background_budget_ms)?;
        nonzero("orchestrator.max_in_flight", o.max_in_flight as u64)?;
        nonzero("orchestrator.retry.max_attempts", u64::from(o.retry.max_attempts))?;
        nonzero("status.retention_secs", self.status.retention_secs)?;
        nonzero("status.sweep_interval_secs", self.status.sweep_interval_secs)?;

        if !o.retry.multiplier.is_finite() || o.retry.multiplier < 1.0 {
            return Err(ConfigError::Invalid {
                key: "orchestrator.retry.multiplier",
                reason: format!("must be a finite number of at least 1.0, got {}", o.retry.multiplier),
            });
        }
        if self.status.retention() <= Duration::from_millis(o.background_budget_ms) {
            return Err(ConfigError::Invalid {
                key: "status.retention_secs",
                reason: "must be longer than the background budget".to_string(),
            });
        }
        Ok(())
    }
}

fn nonzero(key: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid {
            key,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}
