//! Error taxonomy for trial compilation.
//!
//! Every error aborts compilation before any graph leaves the compiler.

use thiserror::Error;

use crate::graph::{Event, StateName};
use crate::port::{PortId, PortRole, Side};
use crate::stimulus::Modality;

/// Invalid or contradictory static configuration
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("port code {code} must have exactly three digits, one per left/center/right role")]
    PortCodeDigits { code: u32 },

    #[error("{role} port {channel} is outside 1..={max}")]
    PortOutOfRange { role: PortRole, channel: u32, max: u8 },

    #[error("{first} and {second} roles share physical port {port}")]
    PortCollision {
        first: PortRole,
        second: PortRole,
        port: PortId,
    },

    #[error("unrecognized {selector} feedback style {value:?} (expected tone, flash or none)")]
    UnknownFeedbackStyle {
        selector: &'static str,
        value: String,
    },

    #[error("{field} must be a finite, non-negative number of seconds, got {value}")]
    InvalidDuration { field: &'static str, value: f64 },

    #[error("{side} reward magnitude must be finite and non-negative, got {value}")]
    InvalidRewardMagnitude { side: Side, value: f64 },

    #[error("{field} must lie within [0, {max}], got {value}")]
    InvalidProportion {
        field: &'static str,
        value: f64,
        max: f64,
    },

    #[error("{low_field} ({low}) exceeds {high_field} ({high})")]
    InvertedRange {
        low_field: &'static str,
        low: f64,
        high_field: &'static str,
        high: f64,
    },

    #[error("no valve calibration points for port {port}")]
    MissingCalibration { port: PortId },
}

/// The trial's outcome cannot be determined from what the caller supplied
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    #[error("undefined outcome: {modality} trial requires a rewarded side")]
    MissingRewardedSide { modality: Modality },

    #[error("undefined outcome: decision variable {value:?} does not pick a side for a {modality} trial")]
    UndecidedVariable {
        modality: Modality,
        value: Option<f64>,
    },
}

/// Structural defect found while checking a built graph
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphDefect {
    #[error("state {0} defined twice")]
    DuplicateState(StateName),

    #[error("entry state {0} is not part of the graph")]
    MissingEntry(StateName),

    #[error("{from} on {event} targets undefined state {to}")]
    DanglingTarget {
        from: StateName,
        event: Event,
        to: StateName,
    },

    #[error("entry state is targeted by {from} on {event}")]
    EntryTargeted { from: StateName, event: Event },

    #[error("state {0} is unreachable from the entry state")]
    Orphan(StateName),

    #[error("state {state} references undeclared port {port}")]
    UndeclaredPort { state: StateName, port: PortId },

    #[error("state {state} has invalid duration {value} (must be finite and non-negative)")]
    InvalidTimer { state: StateName, value: f64 },

    #[error("timeout-only cycle through {0}")]
    TimeoutCycle(StateName),

    #[error("state {0} cannot reach the exit through timeouts alone")]
    NoTimeoutExit(StateName),
}

/// Everything that can stop a trial from compiling
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("malformed graph: {0}")]
    Graph(#[from] GraphDefect),
}

pub type CompileResult<T> = Result<T, CompileError>;
