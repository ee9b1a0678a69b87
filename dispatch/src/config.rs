//! Dispatcher configuration
//!
//! Loaded from defaults, environment variables, or a TOML file, then
//! validated into a [`TierPolicy`].
//!
//! ```toml
//! promotion_threshold_ms = 2.0
//! min_calls_before_promotion = 10
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ConfigError, ConfigResult};
use crate::policy::{TierPolicy, DEFAULT_MIN_CALLS_BEFORE_PROMOTION};

/// Promotion threshold used when none is configured.
pub const DEFAULT_PROMOTION_THRESHOLD_MS: f64 = 5.0;

/// Environment variable overriding the promotion threshold.
pub const ENV_PROMOTION_THRESHOLD_MS: &str = "TIER_PROMOTION_THRESHOLD_MS";

/// Environment variable overriding the promotion call gate.
pub const ENV_MIN_CALLS_BEFORE_PROMOTION: &str = "TIER_MIN_CALLS_BEFORE_PROMOTION";

/// Unvalidated dispatcher settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatchConfig {
    /// Baseline calls slower than this (after the gate) trigger promotion.
    /// Accelerated calls slower than twice this trigger demotion.
    pub promotion_threshold_ms: f64,
    /// Calls that must complete before promotion is considered.
    pub min_calls_before_promotion: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            promotion_threshold_ms: DEFAULT_PROMOTION_THRESHOLD_MS,
            min_calls_before_promotion: DEFAULT_MIN_CALLS_BEFORE_PROMOTION,
        }
    }
}

impl DispatchConfig {
    /// Defaults overridden by environment variables.
    ///
    /// - `TIER_PROMOTION_THRESHOLD_MS`: float milliseconds (default: 5.0)
    /// - `TIER_MIN_CALLS_BEFORE_PROMOTION`: integer (default: 10)
    ///
    /// A variable that is set but unparseable is an error rather than a
    /// silent fallback.
    pub fn from_env() -> ConfigResult<Self> {
        Self::default().with_env_overrides()
    }

    /// Apply environment overrides on top of `self`.
    pub fn with_env_overrides(mut self) -> ConfigResult<Self> {
        if let Some(value) = env_var(ENV_PROMOTION_THRESHOLD_MS) {
            self.promotion_threshold_ms = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid_env(ENV_PROMOTION_THRESHOLD_MS, &value))?;
        }
        if let Some(value) = env_var(ENV_MIN_CALLS_BEFORE_PROMOTION) {
            self.min_calls_before_promotion = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid_env(ENV_MIN_CALLS_BEFORE_PROMOTION, &value))?;
        }
        Ok(self)
    }

    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Read and parse a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Validate into a policy.
    pub fn policy(&self) -> ConfigResult<TierPolicy> {
        Ok(TierPolicy::new(self.promotion_threshold_ms)?
            .with_min_calls_before_promotion(self.min_calls_before_promotion))
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    // Env vars are process-global; serialize the tests that touch them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Sets env vars and removes them on drop, even if an assertion fails.
    struct EnvVars(Vec<&'static str>);

    impl EnvVars {
        fn set(vars: &[(&'static str, &str)]) -> Self {
            for (name, value) in vars {
                std::env::set_var(name, value);
            }
            Self(vars.iter().map(|(name, _)| *name).collect())
        }
    }

    impl Drop for EnvVars {
        fn drop(&mut self) {
            for name in &self.0 {
                std::env::remove_var(name);
            }
        }
    }

    #[test]
    fn test_defaults() {
        let config = DispatchConfig::default();
        assert_eq!(config.promotion_threshold_ms, 5.0);
        assert_eq!(config.min_calls_before_promotion, 10);
        let policy = config.policy().unwrap();
        assert_eq!(policy.demotion_threshold_ms(), 10.0);
    }

    #[test]
    fn test_from_env_overrides() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _vars = EnvVars::set(&[
            (ENV_PROMOTION_THRESHOLD_MS, "2.5"),
            (ENV_MIN_CALLS_BEFORE_PROMOTION, "3"),
        ]);

        let config = DispatchConfig::from_env().unwrap();
        assert_eq!(config.promotion_threshold_ms, 2.5);
        assert_eq!(config.min_calls_before_promotion, 3);
    }

    #[test]
    fn test_from_env_rejects_garbage() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _vars = EnvVars::set(&[(ENV_MIN_CALLS_BEFORE_PROMOTION, "many")]);

        let err = DispatchConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar { ref var, .. } if var == ENV_MIN_CALLS_BEFORE_PROMOTION));
    }

    #[test]
    fn test_env_vars_removed_after_guard_drops() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        {
            let _vars = EnvVars::set(&[(ENV_PROMOTION_THRESHOLD_MS, "9.0")]);
            assert_eq!(DispatchConfig::from_env().unwrap().promotion_threshold_ms, 9.0);
        }
        assert!(std::env::var(ENV_PROMOTION_THRESHOLD_MS).is_err());
    }

    #[test]
    fn test_from_env_unset_uses_defaults() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        std::env::remove_var(ENV_PROMOTION_THRESHOLD_MS);
        std::env::remove_var(ENV_MIN_CALLS_BEFORE_PROMOTION);
        assert_eq!(DispatchConfig::from_env().unwrap(), DispatchConfig::default());
    }

    #[test]
    fn test_toml_partial() {
        let config = DispatchConfig::from_toml_str("promotion_threshold_ms = 2.0").unwrap();
        assert_eq!(config.promotion_threshold_ms, 2.0);
        assert_eq!(config.min_calls_before_promotion, 10);
    }

    #[test]
    fn test_toml_unknown_key_rejected() {
        assert!(DispatchConfig::from_toml_str("demotion_threshold_ms = 9.0").is_err());
    }

    #[test]
    fn test_toml_file_roundtrip_and_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "promotion_threshold_ms = 1.5\nmin_calls_before_promotion = 4").unwrap();
        let config = DispatchConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(config.promotion_threshold_ms, 1.5);
        assert_eq!(config.min_calls_before_promotion, 4);

        let missing = DispatchConfig::from_toml_file("/nonexistent/tiers.toml").unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));

        let mut bad = tempfile::NamedTempFile::new().unwrap();
        writeln!(bad, "promotion_threshold_ms = \"fast\"").unwrap();
        let err = DispatchConfig::from_toml_file(bad.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_policy_validation() {
        let config = DispatchConfig {
            promotion_threshold_ms: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            config.policy(),
            Err(ConfigError::NonPositiveThreshold { .. })
        ));
    }
}
