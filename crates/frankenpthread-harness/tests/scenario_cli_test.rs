//! End-to-end checks of the harness library against a file log sink.

use std::sync::Arc;

use frankenpthread_core::structured_log::LogEntry;
use frankenpthread_core::time::SystemClock;
use frankenpthread_core::{Config, Context, LogLevel, LogSink, SpinPolicy};
use frankenpthread_harness::{RunSummary, Scenario, ScenarioParams};

fn temp_log(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("{name}-{}.jsonl", std::process::id()))
}

#[test]
fn jsonl_evidence_parses_and_matches_summary() {
    let path = temp_log("frankenpthread-harness-evidence");
    let sink = LogSink::to_file(&path, LogLevel::Info).unwrap();
    let config = Config::default().with_spin(SpinPolicy::Off);
    let ctx = Arc::new(Context::with_log(config, Arc::new(SystemClock::new()), sink));

    let params = ScenarioParams {
        threads: 4,
        iterations: 200,
    };
    let mut summary = RunSummary::new("integration");
    for scenario in [Scenario::MutexContention, Scenario::CondQueue, Scenario::Rendezvous] {
        summary.push(scenario.run(&ctx, &params).unwrap());
    }
    assert!(summary.all_passed(), "{summary:?}");

    let raw = std::fs::read_to_string(&path).unwrap();
    let entries: Vec<LogEntry> = raw
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    let finished: Vec<_> = entries
        .iter()
        .filter(|e| e.event == "scenario_finished")
        .collect();
    assert_eq!(finished.len(), 3);
    assert!(finished.iter().all(|e| e.level == LogLevel::Info));
    assert!(finished.iter().all(|e| e.latency_ns.is_some()));
    let _ = std::fs::remove_file(&path);
}

#[test]
fn spin_policy_does_not_change_outcomes() {
    for spin in [SpinPolicy::Off, SpinPolicy::Fixed(1_000)] {
        let ctx = Arc::new(Context::with_log(
            Config::default().with_spin(spin),
            Arc::new(SystemClock::new()),
            LogSink::disabled(),
        ));
        let report = Scenario::MutexContention
            .run(
                &ctx,
                &ScenarioParams {
                    threads: 6,
                    iterations: 500,
                },
            )
            .unwrap();
        assert_eq!(report.observed, 3_000);
        assert!(report.passed);
    }
}
