//! CLI entrypoint for the frankenpthread stress harness.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use frankenpthread_core::config::parse_log_level;
use frankenpthread_core::time::SystemClock;
use frankenpthread_core::{Config, Context, LogSink, SpinPolicy};
use frankenpthread_harness::{RunSummary, Scenario, ScenarioParams};

/// Stress tooling for frankenpthread.
#[derive(Debug, Parser)]
#[command(name = "frankenpthread-harness")]
#[command(about = "Stress scenarios for frankenpthread primitives")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List available scenarios.
    List,
    /// Run scenarios and emit JSONL evidence plus a JSON summary.
    Run {
        /// Scenario names (repeatable); all scenarios when omitted.
        #[arg(long = "scenario")]
        scenarios: Vec<String>,
        /// Worker threads per scenario.
        #[arg(long, default_value_t = 4)]
        threads: u32,
        /// Iterations per worker.
        #[arg(long, default_value_t = 1_000)]
        iterations: u32,
        /// Mutex spin policy (`auto`, `off`, or a count).
        #[arg(long, default_value = "auto")]
        spin: String,
        /// JSONL log path (stderr when omitted).
        #[arg(long)]
        log: Option<PathBuf>,
        /// Minimum log level (`trace` .. `error`, or `off`).
        #[arg(long, default_value = "info")]
        log_level: String,
        /// Summary JSON path (if omitted, prints to stdout).
        #[arg(long)]
        output: Option<PathBuf>,
        /// Campaign label recorded in the summary.
        #[arg(long, default_value = "stress")]
        campaign: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::List => {
            for scenario in Scenario::ALL {
                println!("{}", scenario.name());
            }
        }
        Command::Run {
            scenarios,
            threads,
            iterations,
            spin,
            log,
            log_level,
            output,
            campaign,
        } => {
            let selected = if scenarios.is_empty() {
                Scenario::ALL.to_vec()
            } else {
                scenarios
                    .iter()
                    .map(|name| {
                        Scenario::from_name(name).ok_or_else(|| format!("unknown scenario: {name}"))
                    })
                    .collect::<Result<Vec<_>, _>>()?
            };

            let level = parse_log_level(&log_level);
            let sink = match (&log, level) {
                (_, None) => LogSink::disabled(),
                (Some(path), Some(level)) => LogSink::to_file(path, level)?,
                (None, Some(level)) => LogSink::stderr(level),
            };
            let config = Config::default()
                .with_spin(SpinPolicy::from_str_loose(&spin))
                .with_log_level(level);
            let ctx = Arc::new(Context::with_log(config, Arc::new(SystemClock::new()), sink));

            let params = ScenarioParams {
                threads,
                iterations,
            };
            let mut summary = RunSummary::new(campaign);
            for scenario in selected {
                eprintln!("Running {} ({threads} threads x {iterations})", scenario.name());
                summary.push(scenario.run(&ctx, &params)?);
            }

            let json = summary.to_json_pretty()?;
            if let Some(path) = output {
                std::fs::write(&path, json)?;
                eprintln!("Summary written to {}", path.display());
            } else {
                println!("{json}");
            }
            eprintln!(
                "{} scenario(s): {} passed, {} failed",
                summary.total, summary.passed, summary.failed
            );
            if !summary.all_passed() {
                std::process::exit(1);
            }
        }
    }
    Ok(())
}
