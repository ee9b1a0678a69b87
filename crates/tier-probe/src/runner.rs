//! Workload loop

use anyhow::{Context, Result};
use tracing::info;

use tier_dispatch::{Clock, TieredDispatcher, TransitionSink};

use crate::config::ProbeConfig;
use crate::report::{ProbeReport, RunRecord};
use crate::workload::{dataset, FilterKernel};

/// Run the configured workload through a fresh dispatcher.
///
/// Transition events go to `sink`; the returned report carries no
/// transitions of its own.
pub fn run_workload<C, S>(config: &ProbeConfig, clock: C, sink: S) -> Result<ProbeReport>
where
    C: Clock,
    S: TransitionSink,
{
    let policy = config
        .dispatcher
        .policy()
        .context("Invalid dispatcher configuration")?;
    let workload = &config.workload;

    let mut dispatcher = TieredDispatcher::builder()
        .baseline(FilterKernel::high_level().with_delay(workload.baseline_delay()))
        .accelerated(FilterKernel::optimized().with_delay(workload.accelerated_delay()))
        .policy(policy)
        .clock(clock)
        .sink(sink)
        .build()?;

    let data = dataset(workload.dataset_size);
    info!(
        dataset_size = data.len(),
        runs = workload.runs,
        threshold_ms = policy.promotion_threshold_ms(),
        min_calls = policy.min_calls_before_promotion(),
        "Starting tier probe"
    );

    let mut runs = Vec::with_capacity(workload.runs as usize);
    for _ in 0..workload.runs {
        let execution = dispatcher.execute(data.as_slice())?;
        info!(
            run = execution.invocation,
            tier = %execution.tier_used,
            latency_ms = execution.latency_ms(),
            result = execution.result,
            "Run complete"
        );
        runs.push(RunRecord::from_execution(&execution));
    }

    Ok(ProbeReport::new(runs, dispatcher.stats()))
}
