//! Command-line front end for the trial compiler.
//!
//! ```bash
//! # One trial, pretty-printed graph on stdout
//! trialc compile --config trial.json --calibration valves.json
//!
//! # Fifty planned trials, one graph per line
//! trialc session --settings session.json --trials 50 --seed 7
//!
//! # Compile and summarize without emitting the graph
//! trialc check --config trial.json
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use trialc_compiler::{compile_trial, CalibrationTable, TrialConfig};
use trialc_core::{AuxTimer, Punishment, StateName};

mod session;

/// Default valve rate when no calibration table is given, in seconds per µl.
const DEFAULT_OPEN_S_PER_UL: f64 = 0.05;

#[derive(Parser, Debug)]
#[command(name = "trialc")]
#[command(author, version, about = "Compiles two-alternative choice trials into engine state graphs", long_about = None)]
struct Cli {
    /// Logging verbosity level
    #[arg(short, long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile one trial and print its state graph
    Compile {
        /// Trial configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Valve calibration table (JSON)
        #[arg(long)]
        calibration: Option<PathBuf>,

        /// Print the graph on a single line
        #[arg(long)]
        compact: bool,
    },

    /// Plan and compile a run of trials, one graph per line
    Session {
        /// Session settings (JSON)
        #[arg(short, long)]
        settings: PathBuf,

        /// Valve calibration table (JSON)
        #[arg(long)]
        calibration: Option<PathBuf>,

        /// Number of trials to plan
        #[arg(short, long, default_value = "1")]
        trials: usize,

        /// Seed for the trial planner
        #[arg(long, default_value = "0")]
        seed: u64,
    },

    /// Compile one trial and summarize its timers
    Check {
        /// Trial configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Valve calibration table (JSON)
        #[arg(long)]
        calibration: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::from(cli.log_level))
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Compile {
            config,
            calibration,
            compact,
        } => {
            let trial: TrialConfig = read_json(&config)?;
            let valves = calibration_table(calibration.as_deref())?;
            let graph = compile_trial(&trial, &valves)
                .with_context(|| format!("compiling {}", config.display()))?;
            let json = if compact {
                serde_json::to_string(&graph)?
            } else {
                serde_json::to_string_pretty(&graph)?
            };
            println!("{json}");
        }
        Commands::Session {
            settings,
            calibration,
            trials,
            seed,
        } => {
            let session = read_json(&settings)?;
            let valves = calibration_table(calibration.as_deref())?;
            session::run(session, &valves, trials, seed)?;
        }
        Commands::Check {
            config,
            calibration,
        } => {
            let trial: TrialConfig = read_json(&config)?;
            let valves = calibration_table(calibration.as_deref())?;
            let graph = compile_trial(&trial, &valves)
                .with_context(|| format!("compiling {}", config.display()))?;

            let timer = |name: StateName| graph.state(name).map(|s| s.timer_s);
            info!(
                states = graph.len(),
                entry = %graph.entry(),
                correct_s = graph.aux_timers().duration_s(AuxTimer::Correct),
                incorrect_s = graph.aux_timers().duration_s(AuxTimer::Incorrect),
                "graph ok"
            );
            println!("states: {}", graph.len());
            println!("entry: {}", graph.entry());
            for aux in AuxTimer::BOTH {
                println!(
                    "GlobalTimer{}: {} s",
                    aux.index(),
                    graph.aux_timers().duration_s(aux)
                );
            }
            for punishment in Punishment::ALL {
                if let Some(penalty_s) = timer(StateName::Penalty(punishment)) {
                    println!("{punishment}: {penalty_s} s");
                }
            }
            if let Some(iti_s) = timer(StateName::InterTrialInterval) {
                println!("InterTrialInterval: {iti_s} s");
            }
        }
    }

    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn calibration_table(path: Option<&Path>) -> Result<CalibrationTable> {
    match path {
        Some(path) => read_json(path),
        None => Ok(CalibrationTable::flat(DEFAULT_OPEN_S_PER_UL)),
    }
}
