//! Minimal discrete-event runner for compiled state graphs.
//!
//! Follows the engine contract: a state's own timer fires once per activation
//! unless another event preempts it, AuxTimers count down globally from the
//! moment they are armed, and events without a transition in the current
//! state are ignored.

#![allow(dead_code)]

use trialc_core::{AuxTimer, Event, OutputAction, PortId, StateGraph, StateName, Target};
use trialc_compiler::{CalibrationTable, TrialConfig, compile_trial};

const MAX_STEPS: usize = 1_000;

pub fn compile(config: &TrialConfig) -> StateGraph {
    compile_trial(config, &CalibrationTable::flat(0.05)).expect("config compiles")
}

pub fn port(n: u8) -> PortId {
    PortId::new(n).expect("valid port")
}

/// What happened while a graph ran: every state entered, with its entry time.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    pub visits: Vec<(f64, StateName)>,
    pub exit_at: Option<f64>,
}

impl Trace {
    pub fn names(&self) -> Vec<StateName> {
        self.visits.iter().map(|(_, name)| *name).collect()
    }

    pub fn visited(&self, name: StateName) -> bool {
        self.visits.iter().any(|(_, n)| *n == name)
    }

    pub fn entered_at(&self, name: StateName) -> Option<f64> {
        self.visits.iter().find(|(_, n)| *n == name).map(|(t, _)| *t)
    }
}

/// Runs `graph` against scripted subject input, ordered by time.
///
/// At equal times the state timer fires before AuxTimers, and AuxTimers before
/// subject input.
pub fn run(graph: &StateGraph, script: &[(f64, Event)]) -> Trace {
    let mut now = 0.0;
    let mut current = graph.entry();
    let mut visits = vec![(now, current)];
    let mut inputs = script.iter().copied().peekable();
    let mut aux: Vec<(AuxTimer, f64)> = Vec::new();
    let mut state_deadline = enter(graph, current, now, &mut aux);

    for _ in 0..MAX_STEPS {
        let next_aux = aux.iter().copied().min_by(|a, b| a.1.total_cmp(&b.1));
        let next_input = inputs.peek().copied();

        let candidates = [
            state_deadline.map(|t| (t, 0, Event::TimerExpired)),
            next_aux.map(|(k, t)| (t, 1, Event::AuxTimerExpired(k))),
            next_input.map(|(t, e)| (t.max(now), 2, e)),
        ];
        let Some((at, source, event)) = candidates
            .into_iter()
            .flatten()
            .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)))
        else {
            return Trace {
                visits,
                exit_at: None,
            };
        };

        now = at;
        match source {
            0 => state_deadline = None,
            1 => aux.retain(|(k, _)| Event::AuxTimerExpired(*k) != event),
            _ => {
                inputs.next();
            }
        }

        let state = graph.state(current).expect("current state exists");
        match state.target(&event) {
            Some(Target::Exit) => {
                return Trace {
                    visits,
                    exit_at: Some(now),
                };
            }
            Some(Target::State(next)) => {
                current = next;
                visits.push((now, current));
                state_deadline = enter(graph, current, now, &mut aux);
            }
            None => {}
        }
    }
    panic!("graph did not finish within {MAX_STEPS} steps");
}

fn enter(
    graph: &StateGraph,
    name: StateName,
    now: f64,
    aux: &mut Vec<(AuxTimer, f64)>,
) -> Option<f64> {
    let state = graph.state(name).expect("target state exists");
    for action in &state.actions {
        if let OutputAction::ArmAuxTimer { timer } = action {
            aux.retain(|(k, _)| k != timer);
            aux.push((*timer, now + graph.aux_timers().duration_s(*timer)));
        }
    }
    state.times_out().then(|| now + state.timer_s)
}

/// Folds every stimulus switch along `trace`; true if the channel is left on.
pub fn stimulus_on_at_exit(graph: &StateGraph, trace: &Trace) -> bool {
    trace
        .visits
        .iter()
        .filter_map(|(_, name)| graph.state(*name))
        .flat_map(|state| &state.actions)
        .fold(false, |lit, action| match action {
            OutputAction::SetStimulus { on } => *on,
            _ => lit,
        })
}
