//! Outcome and timing resolution.

use tracing::warn;
use trialc_core::{ConfigurationError, DomainError, Side};

use crate::config::TrialConfig;

/// Feedback delay used on catch trials. Long enough that the subject's own
/// port exit, not the clock, ends the holding period.
pub const CATCH_FEEDBACK_DELAY_S: f64 = 20.0;

/// Floor applied to the configured inter-trial interval.
pub const MIN_INTER_TRIAL_INTERVAL_S: f64 = 0.5;

/// Debounce before the feedback countdown of a branch starts.
pub const FEEDBACK_START_DEBOUNCE_S: f64 = 0.05;

/// Decides which side pays out on this trial.
///
/// Auditory trials must name the side. The other modalities may name it too;
/// otherwise the sign of the decision variable decides, positive for left.
pub fn rewarded_side(config: &TrialConfig) -> Result<Side, DomainError> {
    if let Some(side) = config.rewarded_side {
        return Ok(side);
    }
    if config.modality.assigns_outcome() {
        return Err(DomainError::MissingRewardedSide {
            modality: config.modality,
        });
    }
    match config.decision_variable {
        Some(dv) if dv.is_finite() && dv > 0.0 => Ok(Side::Left),
        Some(dv) if dv.is_finite() && dv < 0.0 => Ok(Side::Right),
        value => Err(DomainError::UndecidedVariable {
            modality: config.modality,
            value,
        }),
    }
}

/// Feedback budget for the rewarded or the unrewarded branch.
pub fn feedback_delay_s(config: &TrialConfig, rewarded: bool) -> f64 {
    let catch = if rewarded {
        config.catch_trial
    } else {
        config.catch_error
    };
    if catch {
        CATCH_FEEDBACK_DELAY_S
    } else {
        config.feedback_delay_s
    }
}

pub fn inter_trial_interval_s(config: &TrialConfig) -> f64 {
    if config.inter_trial_interval_s < MIN_INTER_TRIAL_INTERVAL_S {
        warn!(
            configured = config.inter_trial_interval_s,
            floor = MIN_INTER_TRIAL_INTERVAL_S,
            "inter-trial interval raised to floor"
        );
    }
    config.inter_trial_interval_s.max(MIN_INTER_TRIAL_INTERVAL_S)
}

/// Time the stimulus keeps playing once the minimum sampling time is met.
pub fn stimulus_remainder_s(config: &TrialConfig) -> f64 {
    let remainder = config.stimulus_duration_s - config.min_sample_s;
    if remainder < 0.0 {
        warn!(
            stimulus_duration_s = config.stimulus_duration_s,
            min_sample_s = config.min_sample_s,
            "stimulus shorter than minimum sampling time"
        );
    }
    remainder.max(0.0)
}

/// Rejects negative, NaN and infinite durations.
pub fn validate_durations(config: &TrialConfig) -> Result<(), ConfigurationError> {
    let fields = [
        ("stimulus_delay_s", config.stimulus_delay_s),
        ("min_sample_s", config.min_sample_s),
        ("stimulus_duration_s", config.stimulus_duration_s),
        ("choice_deadline_s", config.choice_deadline_s),
        ("feedback_delay_s", config.feedback_delay_s),
        ("feedback_grace_s", config.feedback_grace_s),
        ("inter_trial_interval_s", config.inter_trial_interval_s),
        ("broke_fixation_penalty_s", config.broke_fixation_penalty_s),
        ("early_withdrawal_penalty_s", config.early_withdrawal_penalty_s),
        ("incorrect_choice_penalty_s", config.incorrect_choice_penalty_s),
        ("skipped_feedback_penalty_s", config.skipped_feedback_penalty_s),
    ];
    for (field, value) in fields {
        if !value.is_finite() || value < 0.0 {
            return Err(ConfigurationError::InvalidDuration { field, value });
        }
    }
    for side in Side::BOTH {
        let value = config.reward_ul(side);
        if !value.is_finite() || value < 0.0 {
            return Err(ConfigurationError::InvalidRewardMagnitude { side, value });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use trialc_core::Modality;

    #[test]
    fn auditory_trial_needs_a_side() {
        let config = TrialConfig {
            rewarded_side: None,
            decision_variable: Some(0.8),
            ..TrialConfig::default()
        };
        assert_eq!(
            rewarded_side(&config),
            Err(DomainError::MissingRewardedSide {
                modality: Modality::Auditory
            })
        );
    }

    #[test]
    fn decision_variable_sign_picks_the_side() {
        let mut config = TrialConfig {
            modality: Modality::RandomDots,
            rewarded_side: None,
            decision_variable: Some(-0.3),
            ..TrialConfig::default()
        };
        assert_eq!(rewarded_side(&config), Ok(Side::Right));
        config.decision_variable = Some(0.3);
        assert_eq!(rewarded_side(&config), Ok(Side::Left));
        config.decision_variable = Some(0.0);
        assert!(rewarded_side(&config).is_err());
        config.decision_variable = Some(f64::NAN);
        assert!(rewarded_side(&config).is_err());
        config.decision_variable = None;
        assert!(rewarded_side(&config).is_err());
    }

    #[test]
    fn explicit_side_wins_over_decision_variable() {
        let config = TrialConfig {
            modality: Modality::LightIntensity,
            rewarded_side: Some(Side::Right),
            decision_variable: Some(0.9),
            ..TrialConfig::default()
        };
        assert_eq!(rewarded_side(&config), Ok(Side::Right));
    }

    #[test]
    fn catch_trial_overrides_only_the_correct_branch() {
        let config = TrialConfig {
            catch_trial: true,
            feedback_delay_s: 1.3,
            ..TrialConfig::default()
        };
        assert_eq!(feedback_delay_s(&config, true), CATCH_FEEDBACK_DELAY_S);
        assert_eq!(feedback_delay_s(&config, false), 1.3);
    }

    #[test]
    fn catch_error_overrides_only_the_incorrect_branch() {
        let config = TrialConfig {
            catch_error: true,
            feedback_delay_s: 0.7,
            ..TrialConfig::default()
        };
        assert_eq!(feedback_delay_s(&config, true), 0.7);
        assert_eq!(feedback_delay_s(&config, false), CATCH_FEEDBACK_DELAY_S);
    }

    #[test]
    fn inter_trial_interval_is_floored() {
        for (configured, expected) in [(0.0, 0.5), (0.1, 0.5), (0.5, 0.5), (2.0, 2.0)] {
            let config = TrialConfig {
                inter_trial_interval_s: configured,
                ..TrialConfig::default()
            };
            assert_eq!(inter_trial_interval_s(&config), expected);
        }
    }

    #[test]
    fn negative_duration_is_rejected() {
        let config = TrialConfig {
            feedback_grace_s: -0.1,
            ..TrialConfig::default()
        };
        assert_eq!(
            validate_durations(&config),
            Err(ConfigurationError::InvalidDuration {
                field: "feedback_grace_s",
                value: -0.1
            })
        );
    }
}
