use serde::{Deserialize, Serialize};
use trialc_core::{Modality, Side};

/// How the two feedback AuxTimers get armed between choice and feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerArming {
    /// Two zero-duration bridge states, one timer arm each, for engines that
    /// accept a single timer arm per state.
    #[default]
    Chained,
    /// One bridge state arming both timers.
    Atomic,
}

/// Everything the compiler needs to know about the upcoming trial.
///
/// Supplied fresh by the caller for every trial; the compiler keeps nothing
/// between trials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrialConfig {
    pub trial_number: usize,
    /// Left, center and right physical ports as three decimal digits.
    pub ports_lmr: u32,
    pub modality: Modality,
    pub rewarded_side: Option<Side>,
    /// Signed evidence for non-auditory modalities, positive favours left.
    pub decision_variable: Option<f64>,
    pub catch_trial: bool,
    /// Treat every error as a catch trial.
    pub catch_error: bool,
    pub left_reward_ul: f64,
    pub right_reward_ul: f64,

    pub stimulus_delay_s: f64,
    pub min_sample_s: f64,
    pub stimulus_duration_s: f64,
    pub choice_deadline_s: f64,
    pub feedback_delay_s: f64,
    pub feedback_grace_s: f64,
    pub inter_trial_interval_s: f64,
    pub broke_fixation_penalty_s: f64,
    pub early_withdrawal_penalty_s: f64,
    pub incorrect_choice_penalty_s: f64,
    pub skipped_feedback_penalty_s: f64,

    pub broke_fixation_feedback: String,
    pub early_withdrawal_feedback: String,
    pub incorrect_choice_feedback: String,
    pub skipped_feedback_feedback: String,

    pub sync_output: bool,
    pub stimulus_after_poke_out: bool,
    pub side_port_lights: bool,
    pub timer_arming: TimerArming,
}

impl Default for TrialConfig {
    fn default() -> Self {
        Self {
            trial_number: 0,
            ports_lmr: 123,
            modality: Modality::Auditory,
            rewarded_side: Some(Side::Left),
            decision_variable: None,
            catch_trial: false,
            catch_error: false,
            left_reward_ul: 2.0,
            right_reward_ul: 2.0,
            stimulus_delay_s: 0.1,
            min_sample_s: 0.3,
            stimulus_duration_s: 1.0,
            choice_deadline_s: 5.0,
            feedback_delay_s: 1.0,
            feedback_grace_s: 0.2,
            inter_trial_interval_s: 1.0,
            broke_fixation_penalty_s: 1.0,
            early_withdrawal_penalty_s: 1.0,
            incorrect_choice_penalty_s: 2.0,
            skipped_feedback_penalty_s: 1.0,
            broke_fixation_feedback: "tone".to_string(),
            early_withdrawal_feedback: "tone".to_string(),
            incorrect_choice_feedback: "tone".to_string(),
            skipped_feedback_feedback: "none".to_string(),
            sync_output: false,
            stimulus_after_poke_out: false,
            side_port_lights: true,
            timer_arming: TimerArming::Chained,
        }
    }
}

impl TrialConfig {
    pub fn reward_ul(&self, side: Side) -> f64 {
        match side {
            Side::Left => self.left_reward_ul,
            Side::Right => self.right_reward_ul,
        }
    }
}
