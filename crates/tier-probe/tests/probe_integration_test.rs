//! Integration tests for the tier probe
//!
//! Runs the filter workload end to end with scripted latencies and with a
//! broadcast listener, the way the binary wires it.

use std::time::Duration;

use tier_dispatch::{
    BroadcastSink, ScriptedClock, Tier, TransitionEvent, TransitionKind, TransitionSink,
};
use tier_probe::{run_workload, ProbeConfig};

fn config(runs: u32) -> ProbeConfig {
    let mut config = ProbeConfig::default();
    config.workload.dataset_size = 10_000;
    config.workload.runs = runs;
    config
}

/// Promote at run 11, then demote when the accelerated path degrades
#[test]
fn test_promote_then_demote_through_broadcast() {
    let mut broadcast = BroadcastSink::new();
    let mut listener = broadcast.subscribe();

    let mut script = vec![Duration::from_millis(3); 11];
    script.extend([Duration::from_millis(1), Duration::from_millis(5)]);
    let clock = ScriptedClock::new(script).with_fallback(Duration::from_millis(1));

    let report = run_workload(&config(15), clock, move |event: &TransitionEvent| {
        broadcast.on_transition(event)
    })
    .unwrap();

    let mut events = Vec::new();
    while let Ok(event) = listener.try_recv() {
        events.push(event);
    }
    let kinds: Vec<_> = events.iter().map(|e| e.event).collect();
    assert_eq!(kinds, vec![TransitionKind::Promote, TransitionKind::Demote]);
    assert_eq!(events[0].invocation_count, 11);
    assert_eq!(events[1].invocation_count, 13);
    assert_eq!(events[1].latency_ms, 5.0);

    let tiers: Vec<_> = report.runs.iter().map(|r| r.tier_used).collect();
    assert_eq!(tiers[10], Tier::Baseline);
    assert_eq!(tiers[11], Tier::Accelerated);
    assert_eq!(tiers[12], Tier::Accelerated);
    assert_eq!(tiers[13], Tier::Baseline);
    assert_eq!(report.final_tier(), Tier::Baseline);

    let report = report.with_transitions(events);
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["transitions"][1]["event"], "demote");
    assert_eq!(json["stats"]["demotions"], 1);
}

/// Real clock: a baseline delay above the threshold promotes the workload
#[test]
fn test_delayed_baseline_promotes_with_system_clock() {
    let mut config = config(12);
    config.workload.dataset_size = 100;
    config.workload.baseline_delay_ms = 4;

    let mut events: Vec<TransitionEvent> = Vec::new();
    let report = run_workload(&config, tier_dispatch::SystemClock, |event: &TransitionEvent| {
        events.push(event.clone())
    })
    .unwrap();

    assert_eq!(report.first_promotion(), Some(11));
    assert_eq!(report.runs[11].tier_used, Tier::Accelerated);
    assert_eq!(events.len(), 1);
    assert!(events[0].latency_ms >= 4.0);
}

/// Config file drives the workload shape
#[test]
fn test_config_file_drives_runs() {
    use std::io::Write;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[dispatcher]\npromotion_threshold_ms = 2.0\nmin_calls_before_promotion = 2\n\n[workload]\nruns = 4\ndataset_size = 64"
    )
    .unwrap();
    let config = ProbeConfig::load(file.path()).unwrap();

    let report = run_workload(
        &config,
        ScriptedClock::constant(Duration::from_millis(3)),
        tier_dispatch::NoopSink,
    )
    .unwrap();
    assert_eq!(report.runs.len(), 4);
    assert_eq!(report.first_promotion(), Some(3));
    assert_eq!(report.runs[3].tier_used, Tier::Accelerated);
}
