//! Shared configuration types for Watch With Friends services
//!
//! This crate provides the configuration pieces every service binary needs:
//! the listener address, the environment mode and the log filter.

mod error;
mod listener;

pub use error::{ConfigError, ConfigResult};
pub use listener::{ListenerConfig, DEFAULT_PORT};

use std::env;

/// Common configuration shared between all services
#[derive(Debug, Clone, Default)]
pub struct CommonConfig {
    /// Listener configuration
    pub listener: ListenerConfig,

    /// Environment mode (development, staging, production)
    pub environment: Environment,

    /// Log filter directive (from RUST_LOG, else LOG_LEVEL); `None` lets
    /// each service pick its own default
    pub log_level: Option<String>,
}

/// Application environment mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl std::str::FromStr for Environment {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "staging" | "stage" => Self::Staging,
            _ => Self::Development,
        })
    }
}

impl Environment {
    /// Check if this is a production environment
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Staging => write!(f, "staging"),
            Self::Production => write!(f, "production"),
        }
    }
}

impl CommonConfig {
    /// Load common configuration from environment variables
    pub fn from_env() -> ConfigResult<Self> {
        Ok(Self {
            listener: ListenerConfig::from_env()?,
            environment: get_env_or_default("ENVIRONMENT", "development")
                .parse()
                .unwrap_or_default(),
            log_level: non_empty_env("RUST_LOG").or_else(|| non_empty_env("LOG_LEVEL")),
        })
    }
}

/// Environment variable value, treating empty or blank as unset
fn non_empty_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Helper function to get an optional environment variable with a default
pub fn get_env_or_default(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Helper function to parse an environment variable into a specific type
pub fn parse_env<T>(name: &str, default: T) -> ConfigResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(val) => val
            .trim()
            .parse()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), format!("{}", e))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_parsing() {
        assert_eq!(
            "production".parse::<Environment>().unwrap(),
            Environment::Production
        );
        assert_eq!(
            "prod".parse::<Environment>().unwrap(),
            Environment::Production
        );
        assert_eq!(
            "stage".parse::<Environment>().unwrap(),
            Environment::Staging
        );
        assert_eq!(
            "anything".parse::<Environment>().unwrap(),
            Environment::Development
        );
    }

    #[test]
    fn test_environment_display() {
        assert_eq!(format!("{}", Environment::Production), "production");
        assert_eq!(format!("{}", Environment::Staging), "staging");
        assert_eq!(format!("{}", Environment::Development), "development");
    }

    #[test]
    fn test_parse_env_default_and_override() {
        temp_env::with_var_unset("WWF_TEST_NUMBER", || {
            assert_eq!(parse_env("WWF_TEST_NUMBER", 7u64).unwrap(), 7);
        });
        temp_env::with_var("WWF_TEST_NUMBER", Some(" 42 "), || {
            assert_eq!(parse_env("WWF_TEST_NUMBER", 7u64).unwrap(), 42);
        });
        temp_env::with_var("WWF_TEST_NUMBER", Some("forty-two"), || {
            assert!(matches!(
                parse_env("WWF_TEST_NUMBER", 7u64),
                Err(ConfigError::InvalidValue(name, _)) if name == "WWF_TEST_NUMBER"
            ));
        });
    }

    #[test]
    fn test_common_config_log_level_fallback() {
        temp_env::with_vars(
            [
                ("RUST_LOG", None),
                ("LOG_LEVEL", Some("warn")),
                ("ENVIRONMENT", Some("production")),
            ],
            || {
                let config = CommonConfig::from_env().unwrap();
                assert_eq!(config.log_level.as_deref(), Some("warn"));
                assert!(config.environment.is_production());
            },
        );
    }

    #[test]
    fn test_rust_log_wins_and_blank_is_unset() {
        temp_env::with_vars(
            [("RUST_LOG", Some("trace")), ("LOG_LEVEL", Some("warn"))],
            || {
                let config = CommonConfig::from_env().unwrap();
                assert_eq!(config.log_level.as_deref(), Some("trace"));
            },
        );
        temp_env::with_vars([("RUST_LOG", Some("  ")), ("LOG_LEVEL", None)], || {
            let config = CommonConfig::from_env().unwrap();
            assert_eq!(config.log_level, None);
        });
    }
}
