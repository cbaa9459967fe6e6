//! `gazetrack` CLI: run simulated tracking scenarios, export and inspect
//! trace logs.

use anyhow::Result;
use clap::{Parser, Subcommand};
use sim::scenarios::{Scenario, ScenarioKind};
use sim::trace::{load_trace, save_trace};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "gazetrack", about = "Scan-and-track head control simulator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a named scenario in real time and output metrics.
    RunScenario {
        #[arg(value_enum)]
        scenario: ScenarioKind,
        /// Random seed for reproducibility
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Override the scenario's built-in duration (seconds)
        #[arg(long)]
        duration: Option<f64>,
        /// Output metrics to a JSON file
        #[arg(long)]
        output: Option<PathBuf>,
        /// Also save the full command/reaction trace
        #[arg(long)]
        save_trace: Option<PathBuf>,
    },
    /// Summarize a previously recorded trace log.
    Inspect {
        /// Path to trace JSON file
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::RunScenario {
            scenario,
            seed,
            duration,
            output,
            save_trace: trace_path,
        } => {
            run_scenario(scenario, seed, duration, output.as_deref(), trace_path.as_deref())?;
        }
        Commands::Inspect { input } => {
            inspect(&input)?;
        }
    }

    Ok(())
}

fn run_scenario(
    kind: ScenarioKind,
    seed: u64,
    duration: Option<f64>,
    output_path: Option<&std::path::Path>,
    trace_path: Option<&std::path::Path>,
) -> Result<()> {
    let mut scenario = Scenario::build(kind, seed);
    if let Some(duration_s) = duration {
        scenario.duration_s = duration_s;
    }

    // Ctrl-C ends the run early through the normal shutdown path, neutral
    // return included.
    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = Arc::clone(&stop);
    ctrlc::set_handler(move || handler_stop.store(true, Ordering::Relaxed))?;

    println!(
        "Running scenario '{}' (seed={}, duration={:.0}s)...",
        scenario.name, seed, scenario.duration_s
    );

    let report = sim::runner::run(scenario, stop)?;

    println!(
        "Done: {} ticks, {} reactions, final mode {:?}, elapsed={:.2}s",
        report.ticks,
        report.trace.reactions.len(),
        report.final_mode,
        report.elapsed_s,
    );
    for reaction in &report.trace.reactions {
        println!(
            "  t={:6.2}s  acquired '{}' (score {:.2})",
            reaction.time, reaction.label, reaction.score
        );
    }

    if let Some(path) = trace_path {
        save_trace(&report.trace, path)?;
        println!("Trace saved to {}", path.display());
    }

    if let Some(path) = output_path {
        let json = serde_json::json!({
            "scenario": report.name,
            "seed": report.seed,
            "elapsed_s": report.elapsed_s,
            "ticks": report.ticks,
            "reactions": report.trace.reactions.len(),
            "final_mode": format!("{:?}", report.final_mode),
        });
        std::fs::write(path, serde_json::to_string_pretty(&json)?)?;
        println!("Metrics saved to {}", path.display());
    }

    Ok(())
}

fn inspect(input: &std::path::Path) -> Result<()> {
    let log = load_trace(input)?;

    let peak_yaw = log
        .commands
        .iter()
        .map(|c| c.yaw.abs())
        .fold(0.0, f64::max);
    let peak_pitch = log
        .commands
        .iter()
        .map(|c| c.pitch.abs())
        .fold(0.0, f64::max);

    println!(
        "Trace '{}' (seed={}, duration={:.0}s): {} commands, {} reactions",
        log.scenario_name,
        log.seed,
        log.duration_s,
        log.commands.len(),
        log.reactions.len(),
    );
    println!(
        "Peak |yaw| {:.1}°, peak |pitch| {:.1}°",
        peak_yaw.to_degrees(),
        peak_pitch.to_degrees()
    );
    for reaction in &log.reactions {
        println!(
            "  t={:6.2}s  acquired '{}' (score {:.2})",
            reaction.time, reaction.label, reaction.score
        );
    }

    Ok(())
}
