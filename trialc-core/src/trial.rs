use serde::{Deserialize, Serialize};
use std::fmt;

use crate::port::Side;

/// Trial outcomes that end in a penalty before the inter-trial interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Punishment {
    BrokeFixation,
    EarlyWithdrawal,
    IncorrectChoice,
    SkippedFeedback,
}

impl Punishment {
    pub const ALL: [Punishment; 4] = [
        Punishment::BrokeFixation,
        Punishment::EarlyWithdrawal,
        Punishment::IncorrectChoice,
        Punishment::SkippedFeedback,
    ];
}

impl fmt::Display for Punishment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Punishment::BrokeFixation => "BrokeFixation",
            Punishment::EarlyWithdrawal => "EarlyWithdrawal",
            Punishment::IncorrectChoice => "IncorrectChoice",
            Punishment::SkippedFeedback => "SkippedFeedback",
        })
    }
}

/// One side's feedback path: the chosen side and whether holding there pays out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Branch {
    pub side: Side,
    pub rewarded: bool,
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.rewarded { "Rewarded" } else { "Unrewarded" };
        write!(f, "{kind}{}", self.side)
    }
}

/// How a finished trial ended, as reported back by the trial runner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialOutcome {
    Rewarded,
    Punished(Punishment),
    MissedChoice,
}

impl TrialOutcome {
    /// True when the subject held through the whole feedback delay.
    pub fn completed_feedback(&self) -> bool {
        matches!(
            self,
            TrialOutcome::Rewarded | TrialOutcome::Punished(Punishment::IncorrectChoice)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_names_carry_reward_and_side() {
        let branch = Branch {
            side: Side::Right,
            rewarded: false,
        };
        assert_eq!(branch.to_string(), "UnrewardedRight");
    }

    #[test]
    fn skipped_feedback_is_not_completed() {
        assert!(TrialOutcome::Rewarded.completed_feedback());
        assert!(!TrialOutcome::Punished(Punishment::SkippedFeedback).completed_feedback());
        assert!(!TrialOutcome::MissedChoice.completed_feedback());
    }
}
