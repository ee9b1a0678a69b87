//! Probe results

use serde::{Deserialize, Serialize};

use tier_dispatch::{DispatcherStats, Execution, Tier, TransitionEvent, TransitionKind};

/// One dispatcher call as seen by the probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    /// 1-based run number
    pub run: u64,
    pub tier_used: Tier,
    pub latency_ms: f64,
    pub result: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<TransitionKind>,
}

impl RunRecord {
    pub fn from_execution(execution: &Execution<f64>) -> Self {
        Self {
            run: execution.invocation,
            tier_used: execution.tier_used,
            latency_ms: execution.latency_ms(),
            result: execution.result,
            transition: execution.transition,
        }
    }
}

/// Full probe output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeReport {
    pub runs: Vec<RunRecord>,
    pub stats: DispatcherStats,
    /// Events collected from the dispatcher's sink, in emission order
    pub transitions: Vec<TransitionEvent>,
}

impl ProbeReport {
    pub fn new(runs: Vec<RunRecord>, stats: DispatcherStats) -> Self {
        Self {
            runs,
            stats,
            transitions: Vec::new(),
        }
    }

    pub fn with_transitions(mut self, transitions: Vec<TransitionEvent>) -> Self {
        self.transitions = transitions;
        self
    }

    pub fn final_tier(&self) -> Tier {
        self.stats.tier
    }

    /// Number of runs served by `tier`.
    pub fn runs_on(&self, tier: Tier) -> usize {
        self.runs.iter().filter(|r| r.tier_used == tier).count()
    }

    /// Mean latency of the runs served by `tier`, if any ran there.
    pub fn mean_latency_ms(&self, tier: Tier) -> Option<f64> {
        let (sum, count) = self
            .runs
            .iter()
            .filter(|r| r.tier_used == tier)
            .fold((0.0, 0usize), |(sum, count), r| (sum + r.latency_ms, count + 1));
        (count > 0).then(|| sum / count as f64)
    }

    /// Run at which the first promotion happened.
    pub fn first_promotion(&self) -> Option<u64> {
        self.runs
            .iter()
            .find(|r| r.transition == Some(TransitionKind::Promote))
            .map(|r| r.run)
    }
}
