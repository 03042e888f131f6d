use serde::{Deserialize, Serialize};
use std::fmt;

/// Sensory modality carrying the trial's stimulus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    #[default]
    Auditory,
    LightIntensity,
    RandomDots,
}

impl Modality {
    /// Auditory trials get their correct side assigned up front; the visual
    /// modalities derive it from a continuous decision variable.
    pub fn assigns_outcome(&self) -> bool {
        matches!(self, Modality::Auditory)
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Modality::Auditory => "auditory",
            Modality::LightIntensity => "light-intensity",
            Modality::RandomDots => "random-dots",
        })
    }
}
