use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use tier_dispatch::DispatchConfig;

/// Promotion threshold for the probe when nothing else is configured.
/// Stricter than the library default so the demo workload promotes.
pub const PROBE_THRESHOLD_MS: f64 = 2.0;

/// Workload shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkloadConfig {
    /// Dataset is `0..dataset_size`.
    pub dataset_size: usize,
    /// Number of dispatcher calls.
    pub runs: u32,
    /// Artificial delay added to every baseline call.
    pub baseline_delay_ms: u64,
    /// Artificial delay added to every accelerated call.
    pub accelerated_delay_ms: u64,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            dataset_size: 100_000,
            runs: 15,
            baseline_delay_ms: 0,
            accelerated_delay_ms: 0,
        }
    }
}

impl WorkloadConfig {
    pub fn baseline_delay(&self) -> Duration {
        Duration::from_millis(self.baseline_delay_ms)
    }

    pub fn accelerated_delay(&self) -> Duration {
        Duration::from_millis(self.accelerated_delay_ms)
    }
}

/// Top-level probe configuration.
///
/// ```toml
/// [dispatcher]
/// promotion_threshold_ms = 2.0
///
/// [workload]
/// runs = 30
/// accelerated_delay_ms = 6
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProbeConfig {
    pub dispatcher: DispatchConfig,
    pub workload: WorkloadConfig,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            dispatcher: DispatchConfig {
                promotion_threshold_ms: PROBE_THRESHOLD_MS,
                ..DispatchConfig::default()
            },
            workload: WorkloadConfig::default(),
        }
    }
}

impl ProbeConfig {
    /// Load from a TOML file. Missing tables and keys take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read probe config {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse probe config {}", path.display()))
    }

    /// Parse a TOML document.
    ///
    /// Without a `[dispatcher]` table the probe threshold applies; keys
    /// omitted inside a `[dispatcher]` table take the library defaults.
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
