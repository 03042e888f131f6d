//! Structural checks run on every compiled graph before it is released.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::GraphDefect;
use crate::graph::{OutputAction, StateGraph, StateName, Target};

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Visiting,
    Done,
}

impl StateGraph {
    /// Verifies that the graph is closed, has a true entry point, only
    /// touches declared ports, and terminates along timeout edges alone.
    pub fn check(&self) -> Result<(), GraphDefect> {
        if !self.contains(self.entry()) {
            return Err(GraphDefect::MissingEntry(self.entry()));
        }
        self.check_timers()?;
        self.check_targets()?;
        self.check_ports()?;
        self.check_reachable()?;
        self.check_timeouts()
    }

    /// State timers and valve openings are non-negative, finite seconds.
    fn check_timers(&self) -> Result<(), GraphDefect> {
        for state in self.states() {
            let valves = state.actions.iter().filter_map(|action| match action {
                OutputAction::OpenValve { duration_s, .. } => Some(*duration_s),
                _ => None,
            });
            for value in std::iter::once(state.timer_s).chain(valves) {
                if !value.is_finite() || value < 0.0 {
                    return Err(GraphDefect::InvalidTimer {
                        state: state.name,
                        value,
                    });
                }
            }
        }
        Ok(())
    }

    fn check_targets(&self) -> Result<(), GraphDefect> {
        for state in self.states() {
            for (event, target) in &state.transitions {
                let Target::State(to) = *target else {
                    continue;
                };
                if !self.contains(to) {
                    return Err(GraphDefect::DanglingTarget {
                        from: state.name,
                        event: *event,
                        to,
                    });
                }
                if to == self.entry() {
                    return Err(GraphDefect::EntryTargeted {
                        from: state.name,
                        event: *event,
                    });
                }
            }
        }
        Ok(())
    }

    fn check_ports(&self) -> Result<(), GraphDefect> {
        let declared = self.ports();
        for state in self.states() {
            let referenced = state
                .transitions
                .keys()
                .filter_map(|event| event.port())
                .chain(state.actions.iter().filter_map(|action| action.port()));
            for port in referenced {
                if !declared.contains(&port) {
                    return Err(GraphDefect::UndeclaredPort {
                        state: state.name,
                        port,
                    });
                }
            }
        }
        Ok(())
    }

    fn check_reachable(&self) -> Result<(), GraphDefect> {
        let mut seen = HashSet::from([self.entry()]);
        let mut queue = VecDeque::from([self.entry()]);
        while let Some(name) = queue.pop_front() {
            let Some(state) = self.state(name) else {
                continue;
            };
            for target in state.transitions.values() {
                if let Target::State(next) = *target {
                    if seen.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
        }
        match self.states().iter().find(|s| !seen.contains(&s.name)) {
            Some(orphan) => Err(GraphDefect::Orphan(orphan.name)),
            None => Ok(()),
        }
    }

    /// Every state past the entry must reach the exit through clock events
    /// only, so a trial ends even when the subject stops responding.
    fn check_timeouts(&self) -> Result<(), GraphDefect> {
        let mut marks: HashMap<StateName, Mark> = HashMap::new();
        let mut terminates: HashSet<StateName> = HashSet::new();
        for state in self.states() {
            self.visit_timeouts(state.name, &mut marks, &mut terminates)?;
        }
        match self
            .states()
            .iter()
            .find(|s| s.name != self.entry() && !terminates.contains(&s.name))
        {
            Some(stuck) => Err(GraphDefect::NoTimeoutExit(stuck.name)),
            None => Ok(()),
        }
    }

    fn visit_timeouts(
        &self,
        name: StateName,
        marks: &mut HashMap<StateName, Mark>,
        terminates: &mut HashSet<StateName>,
    ) -> Result<(), GraphDefect> {
        match marks.get(&name) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => return Err(GraphDefect::TimeoutCycle(name)),
            None => {}
        }
        marks.insert(name, Mark::Visiting);

        let mut reaches_exit = false;
        if let Some(state) = self.state(name) {
            for (event, target) in &state.transitions {
                if !event.is_timeout() {
                    continue;
                }
                match *target {
                    Target::Exit => reaches_exit = true,
                    Target::State(next) => {
                        self.visit_timeouts(next, marks, terminates)?;
                        reaches_exit |= terminates.contains(&next);
                    }
                }
            }
        }

        if reaches_exit {
            terminates.insert(name);
        }
        marks.insert(name, Mark::Done);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::{AuxTimers, Event, OutputAction, State, StateGraph, StateName, Target};
    use crate::port::PortId;
    use crate::GraphDefect;

    fn center() -> PortId {
        PortId::new(2).unwrap()
    }

    fn graph() -> StateGraph {
        let timers = AuxTimers {
            correct_s: 1.0,
            incorrect_s: 1.0,
        };
        StateGraph::new(StateName::WaitForCenterPoke, [center()], timers)
    }

    fn minimal() -> StateGraph {
        let mut g = graph();
        g.insert(
            State::new(StateName::WaitForCenterPoke, 0.0)
                .on(Event::PortIn(center()), StateName::InterTrialInterval),
        )
        .unwrap();
        g.insert(
            State::new(StateName::InterTrialInterval, 0.5).on(Event::TimerExpired, Target::Exit),
        )
        .unwrap();
        g
    }

    #[test]
    fn minimal_graph_passes() {
        assert_eq!(minimal().check(), Ok(()));
    }

    #[test]
    fn dangling_target_is_reported() {
        let mut g = graph();
        g.insert(
            State::new(StateName::WaitForCenterPoke, 0.0)
                .on(Event::PortIn(center()), StateName::Sampling),
        )
        .unwrap();
        assert!(matches!(
            g.check(),
            Err(GraphDefect::DanglingTarget {
                to: StateName::Sampling,
                ..
            })
        ));
    }

    #[test]
    fn orphan_state_is_reported() {
        let mut g = minimal();
        g.insert(State::new(StateName::MissedChoice, 0.0).on(Event::TimerExpired, Target::Exit))
            .unwrap();
        assert_eq!(g.check(), Err(GraphDefect::Orphan(StateName::MissedChoice)));
    }

    #[test]
    fn timeout_cycle_is_reported() {
        let mut g = graph();
        g.insert(
            State::new(StateName::WaitForCenterPoke, 0.0)
                .on(Event::PortIn(center()), StateName::Sampling),
        )
        .unwrap();
        g.insert(
            State::new(StateName::Sampling, 0.1)
                .on(Event::TimerExpired, StateName::StimulusContinued),
        )
        .unwrap();
        g.insert(
            State::new(StateName::StimulusContinued, 0.1)
                .on(Event::TimerExpired, StateName::Sampling),
        )
        .unwrap();
        assert!(matches!(g.check(), Err(GraphDefect::TimeoutCycle(_))));
    }

    #[test]
    fn state_waiting_only_on_ports_is_reported() {
        let mut g = graph();
        g.insert(
            State::new(StateName::WaitForCenterPoke, 0.0)
                .on(Event::PortIn(center()), StateName::WaitForChoice),
        )
        .unwrap();
        g.insert(
            State::new(StateName::WaitForChoice, 5.0).on(Event::PortOut(center()), Target::Exit),
        )
        .unwrap();
        assert_eq!(
            g.check(),
            Err(GraphDefect::NoTimeoutExit(StateName::WaitForChoice))
        );
    }

    #[test]
    fn undeclared_port_is_reported() {
        let stray = PortId::new(7).unwrap();
        let mut g = graph();
        g.insert(
            State::new(StateName::WaitForCenterPoke, 0.0)
                .on(Event::PortIn(stray), StateName::InterTrialInterval),
        )
        .unwrap();
        g.insert(
            State::new(StateName::InterTrialInterval, 0.5).on(Event::TimerExpired, Target::Exit),
        )
        .unwrap();
        assert!(matches!(
            g.check(),
            Err(GraphDefect::UndeclaredPort { port, .. }) if port == stray
        ));
    }

    #[test]
    fn targeting_the_entry_is_reported() {
        let mut g = graph();
        g.insert(
            State::new(StateName::WaitForCenterPoke, 0.0)
                .on(Event::PortIn(center()), StateName::InterTrialInterval),
        )
        .unwrap();
        g.insert(
            State::new(StateName::InterTrialInterval, 0.5)
                .on(Event::TimerExpired, StateName::WaitForCenterPoke),
        )
        .unwrap();
        assert!(matches!(g.check(), Err(GraphDefect::EntryTargeted { .. })));
    }

    #[test]
    fn negative_or_nan_timer_is_reported() {
        for value in [-0.1, f64::NAN, f64::INFINITY] {
            let mut g = graph();
            g.insert(
                State::new(StateName::WaitForCenterPoke, 0.0)
                    .on(Event::PortIn(center()), StateName::InterTrialInterval),
            )
            .unwrap();
            g.insert(
                State::new(StateName::InterTrialInterval, value)
                    .on(Event::TimerExpired, Target::Exit),
            )
            .unwrap();
            assert!(matches!(
                g.check(),
                Err(GraphDefect::InvalidTimer {
                    state: StateName::InterTrialInterval,
                    ..
                })
            ));
        }
    }

    #[test]
    fn invalid_valve_duration_is_reported() {
        let mut g = minimal();
        g.insert(
            State::new(StateName::Sampling, 0.1)
                .with_action(OutputAction::OpenValve {
                    port: center(),
                    duration_s: f64::NAN,
                })
                .on(Event::TimerExpired, Target::Exit),
        )
        .unwrap();
        assert!(matches!(
            g.check(),
            Err(GraphDefect::InvalidTimer {
                state: StateName::Sampling,
                ..
            })
        ));
    }
}
