//! `cuex`: run the cueing task against a simulated observer, or inspect
//! the staircase and trial timeline.

mod app;

use anyhow::Result;
use app::SimulateOptions;
use clap::{Parser, Subcommand};
use cuex_experiment::Outcome;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "cuex")]
#[command(about = "Cueing task with adaptive target duration", version)]
struct Cli {
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a whole session with a simulated participant
    Simulate {
        /// JSON config; missing fields use defaults
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(short, long, default_value_t = 1)]
        participant: u32,

        /// Seed for trial order and observer responses
        #[arg(long)]
        seed: Option<u64>,

        /// Where to write the trial records
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Wait out every interval on the wall clock
        #[arg(long)]
        realtime: bool,

        /// Error scale of the observer; below 1 is more accurate
        #[arg(long, default_value_t = 1.0, value_parser = parse_skill)]
        skill: f64,
    },

    /// Print the staircase decision for one block
    Evaluate {
        /// Current target duration in ms (33, 67, 100 or 150)
        #[arg(short, long)]
        duration: u64,

        /// Mean absolute discrimination error in degrees
        #[arg(short, long)]
        error: f64,
    },

    /// Print the event timeline of a sample trial
    Schedule {
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(long)]
        seed: Option<u64>,
    },
}

fn parse_skill(s: &str) -> Result<f64, String> {
    let skill: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if skill.is_finite() && skill >= 0.0 {
        Ok(skill)
    } else {
        Err(format!("expected a finite non-negative number, got {s}"))
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    fmt().with_env_filter(filter).with_target(false).init();

    match cli.command {
        Commands::Simulate {
            config,
            participant,
            seed,
            out,
            realtime,
            skill,
        } => {
            let summary = app::simulate(&SimulateOptions {
                config,
                participant,
                seed,
                out,
                realtime,
                skill,
            })?;
            Ok(match summary.outcome {
                Outcome::Aborted => ExitCode::from(2),
                Outcome::Completed | Outcome::Interrupted => ExitCode::SUCCESS,
            })
        }
        Commands::Evaluate { duration, error } => {
            app::evaluate(duration, error)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Schedule { config, seed } => {
            app::schedule(config.as_deref(), seed)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
