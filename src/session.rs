use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::{self, BufWriter, Write};
use tracing::info;
use trialc_compiler::{compile_trial, CalibrationTable, SessionSettings, TrialPlanner};

/// Plans and compiles `trials` trials, writing one graph per line to stdout.
///
/// No engine reports outcomes back here, so every trial is planned without a
/// previous outcome.
pub fn run(
    settings: SessionSettings,
    valves: &CalibrationTable,
    trials: usize,
    seed: u64,
) -> Result<()> {
    let mut planner = TrialPlanner::new(settings, StdRng::seed_from_u64(seed))
        .context("invalid session settings")?;
    let mut out = BufWriter::new(io::stdout().lock());

    for trial_number in 0..trials {
        let config = planner.next_trial(trial_number, None);
        let graph = compile_trial(&config, valves)
            .with_context(|| format!("compiling trial {trial_number}"))?;
        info!(
            trial = trial_number,
            rewarded = ?config.rewarded_side,
            decision_variable = ?config.decision_variable,
            catch = config.catch_trial,
            feedback_delay_s = config.feedback_delay_s,
            "session trial"
        );
        serde_json::to_writer(&mut out, &graph)?;
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}
