use trialc_core::{
    ConfigurationError, Event, OutputAction, PortRole, Punishment, State, StateName, Target,
};

use crate::ports::{FULL_INTENSITY, PortMapping};

/// Length of the all-ports light flash preceding a flash-style penalty.
pub const FLASH_DURATION_S: f64 = 0.1;

/// Marker code asking the sound server for the punishment tone.
pub const MARKER_PUNISHMENT_TONE: u8 = 2;

/// How a penalty is presented to the subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackStyle {
    Tone,
    SequentialFlash,
    Silent,
}

impl FeedbackStyle {
    /// Parses a selector value; `selector` names the config field for errors.
    pub fn select(selector: &'static str, value: &str) -> Result<Self, ConfigurationError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "tone" => Ok(FeedbackStyle::Tone),
            "flash" | "sequential-flash" | "led-flash" => Ok(FeedbackStyle::SequentialFlash),
            "none" => Ok(FeedbackStyle::Silent),
            _ => Err(ConfigurationError::UnknownFeedbackStyle {
                selector,
                value: value.to_string(),
            }),
        }
    }

    /// First state of the penalty sub-graph; what other states transition to.
    pub fn entry(self, punishment: Punishment) -> StateName {
        match self {
            FeedbackStyle::SequentialFlash => StateName::PenaltyFlash(punishment),
            FeedbackStyle::Tone | FeedbackStyle::Silent => StateName::Penalty(punishment),
        }
    }

    /// Builds the penalty sub-graph, ending in `next` after `penalty_s`.
    ///
    /// The entry state switches the stimulus off, whichever state the penalty
    /// was reached from.
    pub fn states(
        self,
        punishment: Punishment,
        penalty_s: f64,
        ports: &PortMapping,
        next: Target,
    ) -> Vec<State> {
        let stop = OutputAction::SetStimulus { on: false };
        let penalty = State::new(StateName::Penalty(punishment), penalty_s)
            .on(Event::TimerExpired, next);
        match self {
            FeedbackStyle::Tone => vec![
                penalty
                    .with_action(stop)
                    .with_action(OutputAction::EmitMarker {
                        code: MARKER_PUNISHMENT_TONE,
                    }),
            ],
            FeedbackStyle::SequentialFlash => {
                let flash = PortRole::ALL.iter().fold(
                    State::new(StateName::PenaltyFlash(punishment), FLASH_DURATION_S)
                        .with_action(stop),
                    |state, role| state.with_action(ports.light(*role, FULL_INTENSITY)),
                );
                vec![
                    flash.on(Event::TimerExpired, StateName::Penalty(punishment)),
                    penalty,
                ]
            }
            FeedbackStyle::Silent => vec![penalty.with_action(stop)],
        }
    }
}
