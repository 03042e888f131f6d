use tracing::debug;
use trialc_core::{AuxTimers, Branch, CompileError, Punishment, Side};

use crate::config::{TimerArming, TrialConfig};
use crate::feedback::FeedbackStyle;
use crate::ports::PortMapping;
use crate::timing;
use crate::valve::ValveTime;

/// Concrete timer values for one trial, in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialDurations {
    pub stimulus_delay_s: f64,
    pub min_sample_s: f64,
    pub stimulus_remainder_s: f64,
    pub choice_deadline_s: f64,
    pub correct_feedback_delay_s: f64,
    pub incorrect_feedback_delay_s: f64,
    pub feedback_grace_s: f64,
    pub inter_trial_interval_s: f64,
    pub broke_fixation_penalty_s: f64,
    pub early_withdrawal_penalty_s: f64,
    pub incorrect_choice_penalty_s: f64,
    pub skipped_feedback_penalty_s: f64,
}

impl TrialDurations {
    pub fn feedback_delay_s(&self, rewarded: bool) -> f64 {
        if rewarded {
            self.correct_feedback_delay_s
        } else {
            self.incorrect_feedback_delay_s
        }
    }

    pub fn penalty_s(&self, punishment: Punishment) -> f64 {
        match punishment {
            Punishment::BrokeFixation => self.broke_fixation_penalty_s,
            Punishment::EarlyWithdrawal => self.early_withdrawal_penalty_s,
            Punishment::IncorrectChoice => self.incorrect_choice_penalty_s,
            Punishment::SkippedFeedback => self.skipped_feedback_penalty_s,
        }
    }

    pub fn aux_timers(&self) -> AuxTimers {
        AuxTimers {
            correct_s: self.correct_feedback_delay_s,
            incorrect_s: self.incorrect_feedback_delay_s,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackStyles {
    pub broke_fixation: FeedbackStyle,
    pub early_withdrawal: FeedbackStyle,
    pub incorrect_choice: FeedbackStyle,
    pub skipped_feedback: FeedbackStyle,
}

impl FeedbackStyles {
    pub fn style(&self, punishment: Punishment) -> FeedbackStyle {
        match punishment {
            Punishment::BrokeFixation => self.broke_fixation,
            Punishment::EarlyWithdrawal => self.early_withdrawal,
            Punishment::IncorrectChoice => self.incorrect_choice,
            Punishment::SkippedFeedback => self.skipped_feedback,
        }
    }
}

/// A trial with every parameter resolved to the value the program uses
#[derive(Debug, Clone, PartialEq)]
pub struct Trial {
    pub number: usize,
    pub rewarded_side: Side,
    pub catch_trial: bool,
    pub ports: PortMapping,
    pub durations: TrialDurations,
    pub styles: FeedbackStyles,
    pub reward_valve_s: f64,
    pub sync_output: bool,
    pub stimulus_after_poke_out: bool,
    pub side_port_lights: bool,
    pub timer_arming: TimerArming,
}

impl Trial {
    pub fn resolve<V: ValveTime + ?Sized>(
        config: &TrialConfig,
        valves: &V,
    ) -> Result<Self, CompileError> {
        let ports = PortMapping::from_code(config.ports_lmr)?;
        timing::validate_durations(config)?;
        let styles = FeedbackStyles {
            broke_fixation: FeedbackStyle::select(
                "broke_fixation_feedback",
                &config.broke_fixation_feedback,
            )?,
            early_withdrawal: FeedbackStyle::select(
                "early_withdrawal_feedback",
                &config.early_withdrawal_feedback,
            )?,
            incorrect_choice: FeedbackStyle::select(
                "incorrect_choice_feedback",
                &config.incorrect_choice_feedback,
            )?,
            skipped_feedback: FeedbackStyle::select(
                "skipped_feedback_feedback",
                &config.skipped_feedback_feedback,
            )?,
        };
        let rewarded_side = timing::rewarded_side(config)?;

        // Calibration is consulted for both sides on every trial.
        let mut reward_valve_s = 0.0;
        for side in Side::BOTH {
            let valve_s = valves.valve_time_s(config.reward_ul(side), ports.side(side))?;
            if side == rewarded_side {
                reward_valve_s = valve_s;
            }
        }

        let durations = TrialDurations {
            stimulus_delay_s: config.stimulus_delay_s,
            min_sample_s: config.min_sample_s,
            stimulus_remainder_s: timing::stimulus_remainder_s(config),
            choice_deadline_s: config.choice_deadline_s,
            correct_feedback_delay_s: timing::feedback_delay_s(config, true),
            incorrect_feedback_delay_s: timing::feedback_delay_s(config, false),
            feedback_grace_s: config.feedback_grace_s,
            inter_trial_interval_s: timing::inter_trial_interval_s(config),
            broke_fixation_penalty_s: config.broke_fixation_penalty_s,
            early_withdrawal_penalty_s: config.early_withdrawal_penalty_s,
            incorrect_choice_penalty_s: config.incorrect_choice_penalty_s,
            skipped_feedback_penalty_s: config.skipped_feedback_penalty_s,
        };
        debug!(
            trial = config.trial_number,
            side = %rewarded_side,
            correct_delay_s = durations.correct_feedback_delay_s,
            incorrect_delay_s = durations.incorrect_feedback_delay_s,
            reward_valve_s,
            "resolved trial timing"
        );

        Ok(Self {
            number: config.trial_number,
            rewarded_side,
            catch_trial: config.catch_trial,
            ports,
            durations,
            styles,
            reward_valve_s,
            sync_output: config.sync_output,
            stimulus_after_poke_out: config.stimulus_after_poke_out,
            side_port_lights: config.side_port_lights,
            timer_arming: config.timer_arming,
        })
    }

    pub fn branch(&self, side: Side) -> Branch {
        Branch {
            side,
            rewarded: side == self.rewarded_side,
        }
    }

    /// Sync pulse goes out on every unrewarded branch and on catch trials.
    pub fn sync_pulse(&self, branch: Branch) -> bool {
        self.sync_output && (!branch.rewarded || self.catch_trial)
    }
}
