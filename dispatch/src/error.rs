//! Dispatcher error types
//!
//! Only configuration problems originate in this crate. A failing tier
//! implementation surfaces its own error type unchanged from
//! [`TieredDispatcher::execute`](crate::TieredDispatcher::execute).

use std::path::PathBuf;
use thiserror::Error;

use crate::tier::Tier;

/// Result type alias for configuration and construction
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Invalid construction or configuration input
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Threshold is NaN or infinite
    #[error("Promotion threshold must be finite, got {value}")]
    NonFiniteThreshold { value: f64 },

    /// Threshold is zero or negative
    #[error("Promotion threshold must be positive, got {value}ms")]
    NonPositiveThreshold { value: f64 },

    /// Builder finished without an implementation for a tier
    #[error("No implementation supplied for the {tier} tier")]
    MissingImplementation { tier: Tier },

    /// Environment variable present but unparseable
    #[error("Invalid value for {var}: {value:?}")]
    InvalidEnvVar { var: String, value: String },

    /// Config file could not be read
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    /// Create an invalid environment variable error
    pub fn invalid_env(var: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidEnvVar {
            var: var.into(),
            value: value.into(),
        }
    }

    /// Create a missing implementation error
    pub fn missing(tier: Tier) -> Self {
        Self::MissingImplementation { tier }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ConfigError::NonPositiveThreshold { value: -1.0 };
        assert_eq!(err.to_string(), "Promotion threshold must be positive, got -1ms");

        let err = ConfigError::missing(Tier::Accelerated);
        assert_eq!(err.to_string(), "No implementation supplied for the accelerated tier");

        let err = ConfigError::invalid_env("TIER_PROMOTION_THRESHOLD_MS", "fast");
        assert!(err.to_string().contains("TIER_PROMOTION_THRESHOLD_MS"));
        assert!(err.to_string().contains("\"fast\""));
    }
}
