//! Tier Dispatch Library
//!
//! Adaptive two-tier execution: a [`TieredDispatcher`] runs each call on a
//! baseline or an accelerated implementation of the same operation, times
//! it, and moves between tiers based on the measured latency.
//!
//! # Tier ladder
//!
//! ```text
//! Baseline (start)
//!     │
//!     ├─ call count > min_calls (10) AND latency > T → promote
//!     │
//!     ▼
//! Accelerated
//!     │
//!     ├─ latency in (T, 2T]  → stay (hysteresis band)
//!     ├─ latency > 2T        → demote to Baseline
//! ```
//!
//! # Usage
//!
//! ```rust
//! use std::convert::Infallible;
//! use tier_dispatch::{Tier, TieredDispatcher};
//!
//! let baseline = |xs: &[u64]| Ok::<u64, Infallible>(xs.iter().sum());
//! let accelerated = |xs: &[u64]| Ok::<u64, Infallible>(xs.iter().copied().sum());
//!
//! let mut dispatcher = TieredDispatcher::new(baseline, accelerated, 2.0)?;
//! let data: Vec<u64> = (0..1_000).collect();
//! let run = dispatcher.execute(data.as_slice()).unwrap();
//!
//! assert_eq!(run.result, 499_500);
//! assert_eq!(run.tier_used, Tier::Baseline);
//! # Ok::<(), tier_dispatch::ConfigError>(())
//! ```
//!
//! Deterministic tests inject a [`ScriptedClock`] through
//! [`DispatcherBuilder::clock`] instead of measuring real time.

pub mod clock;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod implementation;
pub mod policy;
pub mod sink;
pub mod tier;

// Re-export core dispatcher types
pub use dispatcher::{
    DispatcherBuilder, DispatcherStats, Execution, SharedDispatcher, TieredDispatcher,
};

// Re-export policy and tier types
pub use policy::{TierPolicy, DEFAULT_MIN_CALLS_BEFORE_PROMOTION, DEMOTION_RATIO};
pub use tier::{Tier, Transition, TransitionKind};

// Re-export capabilities
pub use clock::{Clock, ScriptedClock, SystemClock};
pub use implementation::Implementation;
pub use sink::{
    BroadcastSink, NoopSink, RecordingSink, TracingSink, TransitionEvent, TransitionSink,
};

// Re-export configuration and errors
pub use config::{DispatchConfig, DEFAULT_PROMOTION_THRESHOLD_MS};
pub use error::{ConfigError, ConfigResult};
