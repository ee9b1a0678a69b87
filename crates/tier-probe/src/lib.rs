//! Tier Probe
//!
//! Drives a [`tier_dispatch::TieredDispatcher`] over a filter workload and
//! reports per-run tiers, latencies and transitions.

pub mod config;
pub mod report;
pub mod runner;
pub mod workload;

pub use config::{ProbeConfig, WorkloadConfig, PROBE_THRESHOLD_MS};
pub use report::{ProbeReport, RunRecord};
pub use runner::run_workload;
pub use workload::{dataset, FilterKernel, KernelVariant};
