//! The trial program handed to the execution engine.
//!
//! A [`StateGraph`] is a flat table of named [`State`]s. Each state carries a
//! timer, the output actions asserted on entry and a transition table keyed
//! by [`Event`]. Two auxiliary timers ([`AuxTimer`]) are declared globally;
//! once armed they keep counting across state changes.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::GraphDefect;
use crate::port::{PortId, Side};
use crate::trial::{Branch, Punishment};

/// Globally running countdowns, one per feedback budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AuxTimer {
    Correct,
    Incorrect,
}

impl AuxTimer {
    pub const BOTH: [AuxTimer; 2] = [AuxTimer::Correct, AuxTimer::Incorrect];

    /// Engine-side timer index.
    pub fn index(self) -> u8 {
        match self {
            AuxTimer::Correct => 1,
            AuxTimer::Incorrect => 2,
        }
    }
}

impl Serialize for AuxTimer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.index())
    }
}

/// Durations of the two auxiliary timers, in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AuxTimers {
    pub correct_s: f64,
    pub incorrect_s: f64,
}

impl AuxTimers {
    pub fn duration_s(&self, timer: AuxTimer) -> f64 {
        match timer {
            AuxTimer::Correct => self.correct_s,
            AuxTimer::Incorrect => self.incorrect_s,
        }
    }
}

impl Serialize for AuxTimers {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        for timer in AuxTimer::BOTH {
            map.serialize_entry(&format!("GlobalTimer{}", timer.index()), &self.duration_s(timer))?;
        }
        map.end()
    }
}

/// Anything the engine can observe that may move the program to another state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Event {
    TimerExpired,
    PortIn(PortId),
    PortOut(PortId),
    AuxTimerExpired(AuxTimer),
}

impl Event {
    /// Events raised by a clock rather than by the subject.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Event::TimerExpired | Event::AuxTimerExpired(_))
    }

    pub fn port(&self) -> Option<PortId> {
        match self {
            Event::PortIn(port) | Event::PortOut(port) => Some(*port),
            _ => None,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::TimerExpired => f.write_str("Tup"),
            Event::PortIn(port) => write!(f, "Port{port}In"),
            Event::PortOut(port) => write!(f, "Port{port}Out"),
            Event::AuxTimerExpired(timer) => write!(f, "GlobalTimer{}_End", timer.index()),
        }
    }
}

impl Serialize for Event {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncLevel {
    Low,
    High,
}

/// Output asserted when a state is entered.
///
/// Illumination and the sync line are held for the lifetime of the state and
/// released when it is left. The stimulus channel latches until switched
/// again. Valve openings last for their own duration; markers and timer arms
/// are instantaneous.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum OutputAction {
    Illuminate { port: PortId, intensity: u8 },
    SetStimulus { on: bool },
    OpenValve { port: PortId, duration_s: f64 },
    EmitMarker { code: u8 },
    ArmAuxTimer { timer: AuxTimer },
    SetSync { level: SyncLevel },
}

impl OutputAction {
    pub fn port(&self) -> Option<PortId> {
        match self {
            OutputAction::Illuminate { port, .. } | OutputAction::OpenValve { port, .. } => {
                Some(*port)
            }
            _ => None,
        }
    }
}

/// Closed set of state names a trial program can contain
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StateName {
    WaitForCenterPoke,
    StimulusDelay,
    Sampling,
    StimulusContinued,
    WaitForChoice,
    MissedChoice,
    ArmCorrectTimer(Side),
    ArmIncorrectTimer(Side),
    ArmFeedbackTimers(Side),
    FeedbackStart(Branch),
    FeedbackHold(Branch),
    FeedbackGrace(Branch),
    Reward(Side),
    PenaltyFlash(Punishment),
    Penalty(Punishment),
    InterTrialInterval,
}

impl fmt::Display for StateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateName::WaitForCenterPoke => f.write_str("WaitForCenterPoke"),
            StateName::StimulusDelay => f.write_str("StimulusDelay"),
            StateName::Sampling => f.write_str("Sampling"),
            StateName::StimulusContinued => f.write_str("StimulusContinued"),
            StateName::WaitForChoice => f.write_str("WaitForChoice"),
            StateName::MissedChoice => f.write_str("MissedChoice"),
            StateName::ArmCorrectTimer(side) => write!(f, "ArmCorrectTimer_{side}"),
            StateName::ArmIncorrectTimer(side) => write!(f, "ArmIncorrectTimer_{side}"),
            StateName::ArmFeedbackTimers(side) => write!(f, "ArmFeedbackTimers_{side}"),
            StateName::FeedbackStart(branch) => write!(f, "FeedbackStart_{branch}"),
            StateName::FeedbackHold(branch) => write!(f, "FeedbackHold_{branch}"),
            StateName::FeedbackGrace(branch) => write!(f, "FeedbackGrace_{branch}"),
            StateName::Reward(side) => write!(f, "Reward_{side}"),
            StateName::PenaltyFlash(punishment) => write!(f, "{punishment}_Flash"),
            StateName::Penalty(punishment) => write!(f, "{punishment}"),
            StateName::InterTrialInterval => f.write_str("InterTrialInterval"),
        }
    }
}

impl Serialize for StateName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Where a transition leads: another state or the end of the trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    State(StateName),
    Exit,
}

impl From<StateName> for Target {
    fn from(name: StateName) -> Self {
        Target::State(name)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::State(name) => name.fmt(f),
            Target::Exit => f.write_str("exit"),
        }
    }
}

impl Serialize for Target {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One node of the trial program.
///
/// `timer_s` of zero fires on the next engine tick. A state with no
/// [`Event::TimerExpired`] transition ignores its timer and waits for one of
/// its other events.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct State {
    pub name: StateName,
    pub timer_s: f64,
    pub actions: Vec<OutputAction>,
    pub transitions: BTreeMap<Event, Target>,
}

impl State {
    pub fn new(name: StateName, timer_s: f64) -> Self {
        Self {
            name,
            timer_s,
            actions: Vec::new(),
            transitions: BTreeMap::new(),
        }
    }

    pub fn with_action(mut self, action: OutputAction) -> Self {
        self.actions.push(action);
        self
    }

    pub fn on(mut self, event: Event, target: impl Into<Target>) -> Self {
        self.transitions.insert(event, target.into());
        self
    }

    pub fn target(&self, event: &Event) -> Option<Target> {
        self.transitions.get(event).copied()
    }

    pub fn times_out(&self) -> bool {
        self.transitions.contains_key(&Event::TimerExpired)
    }
}

/// Complete program for one trial
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateGraph {
    entry: StateName,
    ports: Vec<PortId>,
    aux_timers: AuxTimers,
    states: Vec<State>,
}

impl StateGraph {
    pub fn new(
        entry: StateName,
        ports: impl IntoIterator<Item = PortId>,
        aux_timers: AuxTimers,
    ) -> Self {
        Self {
            entry,
            ports: ports.into_iter().collect(),
            aux_timers,
            states: Vec::new(),
        }
    }

    /// Appends a state, keeping insertion order for the engine.
    pub fn insert(&mut self, state: State) -> Result<(), GraphDefect> {
        if self.contains(state.name) {
            return Err(GraphDefect::DuplicateState(state.name));
        }
        self.states.push(state);
        Ok(())
    }

    pub fn entry(&self) -> StateName {
        self.entry
    }

    pub fn ports(&self) -> &[PortId] {
        &self.ports
    }

    pub fn aux_timers(&self) -> &AuxTimers {
        &self.aux_timers
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn state(&self, name: StateName) -> Option<&State> {
        self.states.iter().find(|s| s.name == name)
    }

    pub fn contains(&self, name: StateName) -> bool {
        self.state(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port(n: u8) -> PortId {
        PortId::new(n).unwrap()
    }

    #[test]
    fn events_use_engine_names() {
        assert_eq!(Event::TimerExpired.to_string(), "Tup");
        assert_eq!(Event::PortIn(port(2)).to_string(), "Port2In");
        assert_eq!(Event::PortOut(port(3)).to_string(), "Port3Out");
        assert_eq!(
            Event::AuxTimerExpired(AuxTimer::Incorrect).to_string(),
            "GlobalTimer2_End"
        );
    }

    #[test]
    fn insert_rejects_duplicate_names() {
        let timers = AuxTimers {
            correct_s: 1.0,
            incorrect_s: 1.0,
        };
        let mut graph = StateGraph::new(StateName::InterTrialInterval, [port(1)], timers);
        graph
            .insert(State::new(StateName::InterTrialInterval, 0.5))
            .unwrap();
        let err = graph
            .insert(State::new(StateName::InterTrialInterval, 1.0))
            .unwrap_err();
        assert_eq!(err, GraphDefect::DuplicateState(StateName::InterTrialInterval));
    }

    #[test]
    fn state_serializes_with_string_keys() {
        let state = State::new(StateName::Sampling, 0.3)
            .with_action(OutputAction::SetStimulus { on: true })
            .on(Event::TimerExpired, StateName::StimulusContinued)
            .on(Event::PortOut(port(2)), Target::Exit);
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["name"], "Sampling");
        assert_eq!(json["transitions"]["Tup"], "StimulusContinued");
        assert_eq!(json["transitions"]["Port2Out"], "exit");
        assert_eq!(json["actions"][0]["action"], "set_stimulus");
    }
}
