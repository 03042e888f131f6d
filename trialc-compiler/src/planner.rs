//! Session-level trial planning.
//!
//! Draws the per-trial inputs the compiler expects (rewarded side, catch flag,
//! feedback delay) from session settings. The compiler itself keeps no state
//! between trials; whatever carries over lives here and is fed by the caller.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;
use trialc_core::{ConfigurationError, Punishment, Side, TrialOutcome};

use crate::config::TrialConfig;

/// How the feedback delay changes from trial to trial.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FeedbackDelaySelection {
    /// Always the maximum delay.
    #[default]
    Fixed,
    /// Grows after completed feedback, shrinks after skipped feedback.
    AutoIncrement { step_s: f64 },
    /// Exponential with mean `tau_s`, truncated to the delay range.
    TruncatedExponential { tau_s: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionSettings {
    /// Fields every planned trial starts from.
    pub template: TrialConfig,
    pub left_probability: f64,
    /// Share of trials whose correct branch never times out, in percent.
    pub percent_catch: f64,
    pub feedback_delay_min_s: f64,
    pub feedback_delay_max_s: f64,
    pub feedback_delay_selection: FeedbackDelaySelection,
    /// Evidence magnitudes in [0, 1] for modalities decided by the decision
    /// variable. Zero evidence trials get an explicit side.
    pub difficulties: Vec<f64>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            template: TrialConfig::default(),
            left_probability: 0.5,
            percent_catch: 0.0,
            feedback_delay_min_s: 0.5,
            feedback_delay_max_s: 1.0,
            feedback_delay_selection: FeedbackDelaySelection::Fixed,
            difficulties: vec![1.0],
        }
    }
}

impl SessionSettings {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let proportion = |field, value: f64, max| {
            if value.is_finite() && (0.0..=max).contains(&value) {
                Ok(())
            } else {
                Err(ConfigurationError::InvalidProportion { field, value, max })
            }
        };
        let duration = |field, value: f64| {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(ConfigurationError::InvalidDuration { field, value })
            }
        };

        proportion("left_probability", self.left_probability, 1.0)?;
        proportion("percent_catch", self.percent_catch, 100.0)?;
        for &difficulty in &self.difficulties {
            proportion("difficulties", difficulty, 1.0)?;
        }
        duration("feedback_delay_min_s", self.feedback_delay_min_s)?;
        duration("feedback_delay_max_s", self.feedback_delay_max_s)?;
        if self.feedback_delay_min_s > self.feedback_delay_max_s {
            return Err(ConfigurationError::InvertedRange {
                low_field: "feedback_delay_min_s",
                low: self.feedback_delay_min_s,
                high_field: "feedback_delay_max_s",
                high: self.feedback_delay_max_s,
            });
        }
        match self.feedback_delay_selection {
            FeedbackDelaySelection::Fixed => Ok(()),
            FeedbackDelaySelection::AutoIncrement { step_s } => duration("step_s", step_s),
            FeedbackDelaySelection::TruncatedExponential { tau_s } if tau_s > 0.0 => {
                duration("tau_s", tau_s)
            }
            FeedbackDelaySelection::TruncatedExponential { tau_s } => {
                Err(ConfigurationError::InvalidDuration {
                    field: "tau_s",
                    value: tau_s,
                })
            }
        }
    }
}

/// Produces one `TrialConfig` per trial for the compiler.
pub struct TrialPlanner<R: Rng> {
    settings: SessionSettings,
    rng: R,
    auto_delay_s: f64,
}

impl<R: Rng> TrialPlanner<R> {
    pub fn new(settings: SessionSettings, rng: R) -> Result<Self, ConfigurationError> {
        settings.validate()?;
        let auto_delay_s = settings.feedback_delay_min_s;
        Ok(Self {
            settings,
            rng,
            auto_delay_s,
        })
    }

    /// Plans trial `trial_number`. `previous` is how the preceding trial
    /// ended, if there was one.
    pub fn next_trial(
        &mut self,
        trial_number: usize,
        previous: Option<TrialOutcome>,
    ) -> TrialConfig {
        let side = if self.rng.random_bool(self.settings.left_probability) {
            Side::Left
        } else {
            Side::Right
        };
        let catch_trial = self.rng.random_bool(self.settings.percent_catch / 100.0);
        let feedback_delay_s = self.feedback_delay_s(previous);

        let mut config = TrialConfig {
            trial_number,
            rewarded_side: Some(side),
            catch_trial,
            feedback_delay_s,
            ..self.settings.template.clone()
        };
        if !config.modality.assigns_outcome() {
            let magnitude = self.difficulty();
            let sign = match side {
                Side::Left => 1.0,
                Side::Right => -1.0,
            };
            config.decision_variable = Some(sign * magnitude);
            if magnitude > 0.0 {
                config.rewarded_side = None;
            }
        }

        debug!(
            trial = trial_number,
            side = %side,
            catch = catch_trial,
            feedback_delay_s,
            decision_variable = ?config.decision_variable,
            "planned trial"
        );
        config
    }

    fn difficulty(&mut self) -> f64 {
        match self.settings.difficulties.as_slice() {
            [] => 1.0,
            options => options[self.rng.random_range(0..options.len())],
        }
    }

    fn feedback_delay_s(&mut self, previous: Option<TrialOutcome>) -> f64 {
        let min = self.settings.feedback_delay_min_s;
        let max = self.settings.feedback_delay_max_s;
        match self.settings.feedback_delay_selection {
            FeedbackDelaySelection::Fixed => max,
            FeedbackDelaySelection::AutoIncrement { step_s } => {
                match previous {
                    Some(outcome) if outcome.completed_feedback() => self.auto_delay_s += step_s,
                    Some(TrialOutcome::Punished(Punishment::SkippedFeedback)) => {
                        self.auto_delay_s -= step_s
                    }
                    _ => {}
                }
                self.auto_delay_s = self.auto_delay_s.clamp(min, max);
                self.auto_delay_s
            }
            FeedbackDelaySelection::TruncatedExponential { tau_s } => {
                let u: f64 = self.rng.random();
                truncated_exponential(u, tau_s, min, max)
            }
        }
    }
}

/// Inverse CDF of an exponential with mean `tau_s` restricted to `[min, max]`.
fn truncated_exponential(u: f64, tau_s: f64, min: f64, max: f64) -> f64 {
    let low = (-min / tau_s).exp();
    let high = (-max / tau_s).exp();
    let x = -tau_s * (low - u * (low - high)).ln();
    x.clamp(min, max)
}
