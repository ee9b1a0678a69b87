//! Tier policy: promotion and demotion rules with hysteresis
//!
//! The policy is a pure function of `(tier, invocation_count, latency)`.
//! No clock, no state: the dispatcher feeds it one measurement per completed
//! call and applies whatever transition it returns.
//!
//! ```text
//! Baseline ──(latency > T  and  count > min_calls)──▶ Accelerated
//!     ▲                                                   │
//!     └───────────────(latency > 2T)──────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::DispatchConfig;
use crate::error::{ConfigError, ConfigResult};
use crate::tier::{Tier, Transition};

/// Demotion threshold as a multiple of the promotion threshold.
pub const DEMOTION_RATIO: f64 = 2.0;

/// Invocations that must complete before promotion is considered.
pub const DEFAULT_MIN_CALLS_BEFORE_PROMOTION: u64 = 10;

/// Validated thresholds for tier transitions.
///
/// Deserializes through [`DispatchConfig`], so the threshold is validated
/// the same way as [`TierPolicy::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DispatchConfig")]
pub struct TierPolicy {
    promotion_threshold_ms: f64,
    min_calls_before_promotion: u64,
}

impl TierPolicy {
    /// Create a policy with the default promotion gate.
    ///
    /// Fails unless `promotion_threshold_ms` is finite and strictly positive.
    pub fn new(promotion_threshold_ms: f64) -> ConfigResult<Self> {
        if !promotion_threshold_ms.is_finite() {
            return Err(ConfigError::NonFiniteThreshold {
                value: promotion_threshold_ms,
            });
        }
        if promotion_threshold_ms <= 0.0 {
            return Err(ConfigError::NonPositiveThreshold {
                value: promotion_threshold_ms,
            });
        }
        Ok(Self {
            promotion_threshold_ms,
            min_calls_before_promotion: DEFAULT_MIN_CALLS_BEFORE_PROMOTION,
        })
    }

    /// Override the number of calls required before promotion.
    pub fn with_min_calls_before_promotion(mut self, calls: u64) -> Self {
        self.min_calls_before_promotion = calls;
        self
    }

    pub fn promotion_threshold_ms(&self) -> f64 {
        self.promotion_threshold_ms
    }

    pub fn demotion_threshold_ms(&self) -> f64 {
        self.promotion_threshold_ms * DEMOTION_RATIO
    }

    pub fn min_calls_before_promotion(&self) -> u64 {
        self.min_calls_before_promotion
    }

    /// Demotion threshold as a `Duration`.
    pub fn demotion_threshold(&self) -> Duration {
        ms_duration(self.demotion_threshold_ms())
    }

    /// Decide the transition, if any, after a completed call.
    ///
    /// `invocation_count` is the count *including* the call that produced
    /// `latency`. Both comparisons are strict.
    pub fn evaluate(
        &self,
        tier: Tier,
        invocation_count: u64,
        latency: Duration,
    ) -> Option<Transition> {
        let latency_ms = duration_ms(latency);
        match tier {
            Tier::Accelerated if latency_ms > self.demotion_threshold_ms() => {
                Some(Transition::demote())
            }
            Tier::Baseline
                if latency_ms > self.promotion_threshold_ms
                    && invocation_count > self.min_calls_before_promotion =>
            {
                Some(Transition::promote())
            }
            _ => None,
        }
    }
}

impl TryFrom<DispatchConfig> for TierPolicy {
    type Error = ConfigError;

    fn try_from(config: DispatchConfig) -> ConfigResult<Self> {
        config.policy()
    }
}

/// Fractional milliseconds of a duration.
pub fn duration_ms(duration: Duration) -> f64 {
    duration.as_nanos() as f64 / 1_000_000.0
}

fn ms_duration(ms: f64) -> Duration {
    Duration::from_nanos((ms * 1_000_000.0).round() as u64)
}
