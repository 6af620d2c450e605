//! Session server configuration

use std::time::Duration;

use anyhow::{bail, Context, Result};
use watchwithfriends_shared_config::{parse_env, CommonConfig, ListenerConfig};

/// Log filter used when neither `RUST_LOG` nor `LOG_LEVEL` is set
pub const DEFAULT_LOG_FILTER: &str = "watchwithfriends_server=debug,tower_http=debug";

/// Default reconciliation period in seconds
pub const DEFAULT_RECONCILE_INTERVAL_SECS: u64 = 5;

/// Session server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Common configuration shared with other services
    pub common: CommonConfig,

    /// Period between time-correction broadcasts (default: 5s)
    pub reconcile_interval: Duration,

    /// CORS allowed origins (optional)
    pub cors_allowed_origins: Option<Vec<String>>,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// - `PORT`, `BIND_ADDRESS`, `ENVIRONMENT`: see [`CommonConfig`]
    /// - `RECONCILE_INTERVAL_SECS`: must be a positive integer
    /// - `CORS_ORIGINS`: comma-separated list of allowed origins
    /// - `RUST_LOG` or `LOG_LEVEL`: tracing filter, see [`Config::log_filter`]
    pub fn from_env() -> Result<Self> {
        let common = CommonConfig::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

        let reconcile_secs: u64 =
            parse_env("RECONCILE_INTERVAL_SECS", DEFAULT_RECONCILE_INTERVAL_SECS)
                .context("Invalid RECONCILE_INTERVAL_SECS value")?;
        if reconcile_secs == 0 {
            bail!("RECONCILE_INTERVAL_SECS must be greater than zero");
        }

        Ok(Self {
            common,
            reconcile_interval: Duration::from_secs(reconcile_secs),
            cors_allowed_origins: std::env::var("CORS_ORIGINS").ok().map(|s| {
                s.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            }),
        })
    }

    /// Log filter directive for the tracing subscriber
    pub fn log_filter(&self) -> &str {
        self.common
            .log_level
            .as_deref()
            .unwrap_or(DEFAULT_LOG_FILTER)
    }

    /// Get listener configuration
    pub fn listener(&self) -> &ListenerConfig {
        &self.common.listener
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.common.environment.is_production()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            common: CommonConfig::default(),
            reconcile_interval: Duration::from_secs(DEFAULT_RECONCILE_INTERVAL_SECS),
            cors_allowed_origins: None,
        }
    }
}
