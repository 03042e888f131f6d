use serde::{Deserialize, Serialize};
use std::fmt;

/// Highest physical port channel exposed by the execution engine.
pub const MAX_PORT: u8 = 8;

/// A physical port channel, numbered from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct PortId(u8);

impl PortId {
    /// Returns `None` for channels outside `1..=MAX_PORT`.
    pub fn new(channel: u8) -> Option<Self> {
        (1..=MAX_PORT).contains(&channel).then_some(Self(channel))
    }

    pub fn channel(self) -> u8 {
        self.0
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Choice side of the two-alternative task
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Side::Left => "Left",
            Side::Right => "Right",
        })
    }
}

/// Logical role a physical port plays in the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortRole {
    Left,
    Center,
    Right,
}

impl PortRole {
    pub const ALL: [PortRole; 3] = [PortRole::Left, PortRole::Center, PortRole::Right];
}

impl From<Side> for PortRole {
    fn from(side: Side) -> Self {
        match side {
            Side::Left => PortRole::Left,
            Side::Right => PortRole::Right,
        }
    }
}

impl fmt::Display for PortRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PortRole::Left => "left",
            PortRole::Center => "center",
            PortRole::Right => "right",
        })
    }
}
