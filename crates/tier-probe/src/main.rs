use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use tier_dispatch::{
    BroadcastSink, SystemClock, Tier, TracingSink, TransitionEvent, TransitionKind,
    TransitionSink,
};
use tier_probe::{run_workload, ProbeConfig};

/// Profile a filter workload through the tiered dispatcher.
#[derive(Parser, Debug)]
#[command(name = "tier-probe", version, about)]
struct Args {
    /// TOML config file with `[dispatcher]` and `[workload]` tables
    #[arg(long)]
    config: Option<PathBuf>,

    /// Promotion threshold in milliseconds
    #[arg(long)]
    threshold_ms: Option<f64>,

    /// Calls that must complete before promotion is considered
    #[arg(long)]
    min_calls: Option<u64>,

    /// Number of dispatcher calls
    #[arg(long)]
    runs: Option<u32>,

    /// Dataset length
    #[arg(long)]
    dataset_size: Option<usize>,

    /// Artificial delay per baseline call, in milliseconds
    #[arg(long)]
    baseline_delay_ms: Option<u64>,

    /// Artificial delay per accelerated call, in milliseconds
    #[arg(long)]
    accelerated_delay_ms: Option<u64>,

    /// Print the full report as JSON on stdout
    #[arg(long)]
    json: bool,
}

impl Args {
    /// Config file (or defaults), then environment, then flags.
    fn resolve(&self) -> Result<ProbeConfig> {
        let mut config = match &self.config {
            Some(path) => ProbeConfig::load(path)?,
            None => ProbeConfig::default(),
        };
        config.dispatcher = config.dispatcher.with_env_overrides()?;

        if let Some(threshold) = self.threshold_ms {
            config.dispatcher.promotion_threshold_ms = threshold;
        }
        if let Some(calls) = self.min_calls {
            config.dispatcher.min_calls_before_promotion = calls;
        }
        if let Some(runs) = self.runs {
            config.workload.runs = runs;
        }
        if let Some(size) = self.dataset_size {
            config.workload.dataset_size = size;
        }
        if let Some(delay) = self.baseline_delay_ms {
            config.workload.baseline_delay_ms = delay;
        }
        if let Some(delay) = self.accelerated_delay_ms {
            config.workload.accelerated_delay_ms = delay;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tier_probe=info,tier_dispatch=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = args.resolve()?;

    let mut broadcast = BroadcastSink::new();
    let mut events = broadcast.subscribe();
    let collector = tokio::spawn(async move {
        let mut collected = Vec::new();
        loop {
            match events.recv().await {
                Ok(event) => collected.push(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Transition listener lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
        collected
    });

    // The dispatcher owns the sender; it is dropped when the workload ends,
    // which closes the channel for the collector.
    let workload_config = config.clone();
    let report = tokio::task::spawn_blocking(move || {
        let mut logger = TracingSink;
        let sink = move |event: &TransitionEvent| {
            logger.on_transition(event);
            broadcast.on_transition(event);
        };
        run_workload(&workload_config, SystemClock, sink)
    })
    .await??;

    let transitions = collector.await?;
    let report = report.with_transitions(transitions);

    let promotions = count(&report.transitions, TransitionKind::Promote);
    let demotions = count(&report.transitions, TransitionKind::Demote);
    info!(
        runs = report.runs.len(),
        baseline_runs = report.runs_on(Tier::Baseline),
        accelerated_runs = report.runs_on(Tier::Accelerated),
        baseline_mean_ms = report.mean_latency_ms(Tier::Baseline).unwrap_or_default(),
        accelerated_mean_ms = report.mean_latency_ms(Tier::Accelerated).unwrap_or_default(),
        promotions,
        demotions,
        final_tier = %report.final_tier(),
        "Tier probe finished"
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}

fn count(events: &[TransitionEvent], kind: TransitionKind) -> usize {
    events.iter().filter(|e| e.event == kind).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let args = Args::parse_from([
            "tier-probe",
            "--threshold-ms",
            "7.5",
            "--runs",
            "4",
            "--accelerated-delay-ms",
            "6",
        ]);
        let config = args.resolve().unwrap();
        assert_eq!(config.dispatcher.promotion_threshold_ms, 7.5);
        assert_eq!(config.workload.runs, 4);
        assert_eq!(config.workload.accelerated_delay_ms, 6);
        assert_eq!(config.workload.dataset_size, 100_000);
        assert!(!args.json);
    }

    #[test]
    fn test_missing_config_file_errors() {
        let args = Args::parse_from(["tier-probe", "--config", "/nonexistent/probe.toml"]);
        assert!(args.resolve().is_err());
    }
}
