//! Assembles the per-trial state graph.
//!
//! The graph is always composed from the same sub-graphs, in order: fixation,
//! stimulus sampling, choice, per-side feedback holding with grace, outcome
//! delivery and the inter-trial interval.

use tracing::{debug, info};
use trialc_core::{
    AuxTimer, CompileResult, Event, GraphDefect, OutputAction, PortRole, Punishment, Side, State,
    StateGraph, StateName, SyncLevel, Target,
};

use crate::config::{TimerArming, TrialConfig};
use crate::ports::FULL_INTENSITY;
use crate::timing::FEEDBACK_START_DEBOUNCE_S;
use crate::trial::Trial;
use crate::valve::ValveTime;

pub const MARKER_STIMULUS_ONSET: u8 = 1;
pub const MARKER_REWARD: u8 = 3;

/// Resolves `config` and builds its checked state graph.
pub fn compile_trial<V: ValveTime + ?Sized>(
    config: &TrialConfig,
    valves: &V,
) -> CompileResult<StateGraph> {
    let trial = Trial::resolve(config, valves)?;
    StateGraphBuilder::new(&trial).build()
}

pub struct StateGraphBuilder<'a> {
    trial: &'a Trial,
    graph: StateGraph,
}

impl<'a> StateGraphBuilder<'a> {
    pub fn new(trial: &'a Trial) -> Self {
        let graph = StateGraph::new(
            StateName::WaitForCenterPoke,
            trial.ports.all(),
            trial.durations.aux_timers(),
        );
        Self { trial, graph }
    }

    pub fn build(mut self) -> CompileResult<StateGraph> {
        self.fixation()?;
        self.sampling()?;
        self.choice()?;
        for side in Side::BOTH {
            self.arming(side)?;
            self.feedback(side)?;
        }
        self.delivery()?;
        self.inter_trial_interval()?;

        self.graph.check()?;
        info!(
            trial = self.trial.number,
            rewarded = %self.trial.rewarded_side,
            catch = self.trial.catch_trial,
            states = self.graph.len(),
            "compiled trial"
        );
        Ok(self.graph)
    }

    fn insert(&mut self, state: State) -> Result<(), GraphDefect> {
        self.graph.insert(state)
    }

    fn penalty_entry(&self, punishment: Punishment) -> StateName {
        self.trial.styles.style(punishment).entry(punishment)
    }

    /// Center poke, then a hold for the stimulus delay. Leaving early is a
    /// broken fixation; there is no second attempt within the trial.
    fn fixation(&mut self) -> Result<(), GraphDefect> {
        let ports = self.trial.ports;
        let broke = self.penalty_entry(Punishment::BrokeFixation);

        self.insert(
            State::new(StateName::WaitForCenterPoke, 0.0)
                .with_action(ports.light(PortRole::Center, FULL_INTENSITY))
                .on(ports.entered(PortRole::Center), StateName::StimulusDelay),
        )?;
        self.insert(
            State::new(StateName::StimulusDelay, self.trial.durations.stimulus_delay_s)
                .on(Event::TimerExpired, StateName::Sampling)
                .on(ports.exited(PortRole::Center), broke),
        )?;
        debug!(stimulus_delay_s = self.trial.durations.stimulus_delay_s, "fixation");
        Ok(())
    }

    /// Stimulus split in two: leaving during the minimum sampling time is an
    /// early withdrawal, leaving during the remainder is tolerated.
    fn sampling(&mut self) -> Result<(), GraphDefect> {
        let ports = self.trial.ports;
        let durations = &self.trial.durations;
        let early = self.penalty_entry(Punishment::EarlyWithdrawal);

        let sampling = State::new(StateName::Sampling, durations.min_sample_s)
            .with_action(OutputAction::SetStimulus { on: true })
            .with_action(OutputAction::EmitMarker {
                code: MARKER_STIMULUS_ONSET,
            })
            .on(Event::TimerExpired, StateName::StimulusContinued)
            .on(ports.exited(PortRole::Center), early);
        let continued = State::new(StateName::StimulusContinued, durations.stimulus_remainder_s)
            .on(Event::TimerExpired, StateName::WaitForChoice)
            .on(ports.exited(PortRole::Center), StateName::WaitForChoice);
        debug!(
            min_sample_s = durations.min_sample_s,
            remainder_s = durations.stimulus_remainder_s,
            "sampling"
        );

        self.insert(sampling)?;
        self.insert(continued)
    }

    /// First side poke wins; the deadline ends the trial as a missed choice.
    fn choice(&mut self) -> Result<(), GraphDefect> {
        let ports = self.trial.ports;

        let mut wait = State::new(StateName::WaitForChoice, self.trial.durations.choice_deadline_s);
        if !self.trial.stimulus_after_poke_out {
            wait = wait.with_action(OutputAction::SetStimulus { on: false });
        }
        if self.trial.side_port_lights {
            wait = wait
                .with_action(ports.light(PortRole::Left, FULL_INTENSITY))
                .with_action(ports.light(PortRole::Right, FULL_INTENSITY));
        }
        for side in Side::BOTH {
            wait = wait.on(ports.entered(side.into()), self.arming_entry(side));
        }
        self.insert(wait.on(Event::TimerExpired, StateName::MissedChoice))?;

        self.insert(
            State::new(StateName::MissedChoice, 0.0)
                .with_action(OutputAction::SetStimulus { on: false })
                .on(Event::TimerExpired, StateName::InterTrialInterval),
        )
    }

    fn arming_entry(&self, side: Side) -> StateName {
        match self.trial.timer_arming {
            TimerArming::Chained => StateName::ArmCorrectTimer(side),
            TimerArming::Atomic => StateName::ArmFeedbackTimers(side),
        }
    }

    /// Arms both feedback timers identically on either side, before the
    /// branch's own feedback logic starts.
    fn arming(&mut self, side: Side) -> Result<(), GraphDefect> {
        let start = StateName::FeedbackStart(self.trial.branch(side));
        let stop_stimulus = self.trial.stimulus_after_poke_out;

        let with_stop = |state: State| {
            if stop_stimulus {
                state.with_action(OutputAction::SetStimulus { on: false })
            } else {
                state
            }
        };
        let arm = |timer: AuxTimer| OutputAction::ArmAuxTimer { timer };

        match self.trial.timer_arming {
            TimerArming::Chained => {
                self.insert(
                    with_stop(State::new(StateName::ArmCorrectTimer(side), 0.0))
                        .with_action(arm(AuxTimer::Correct))
                        .on(Event::TimerExpired, StateName::ArmIncorrectTimer(side)),
                )?;
                self.insert(
                    State::new(StateName::ArmIncorrectTimer(side), 0.0)
                        .with_action(arm(AuxTimer::Incorrect))
                        .on(Event::TimerExpired, start),
                )
            }
            TimerArming::Atomic => self.insert(
                with_stop(State::new(StateName::ArmFeedbackTimers(side), 0.0))
                    .with_action(arm(AuxTimer::Correct))
                    .with_action(arm(AuxTimer::Incorrect))
                    .on(Event::TimerExpired, start),
            ),
        }
    }

    /// Start, hold and grace states for one side.
    ///
    /// Leaving the port during start or hold opens the grace window. Coming
    /// back to the same port resumes holding while the branch's AuxTimer keeps
    /// running; any other port, the grace timeout or the AuxTimer running out
    /// all skip the feedback.
    fn feedback(&mut self, side: Side) -> Result<(), GraphDefect> {
        let trial = self.trial;
        let ports = trial.ports;
        let branch = trial.branch(side);
        let (timer, outcome) = if branch.rewarded {
            (AuxTimer::Correct, StateName::Reward(side))
        } else {
            (
                AuxTimer::Incorrect,
                self.penalty_entry(Punishment::IncorrectChoice),
            )
        };
        let skipped = self.penalty_entry(Punishment::SkippedFeedback);
        let start = StateName::FeedbackStart(branch);
        let hold = StateName::FeedbackHold(branch);
        let grace = StateName::FeedbackGrace(branch);
        let delay_s = trial.durations.feedback_delay_s(branch.rewarded);

        let mut start_state = State::new(start, FEEDBACK_START_DEBOUNCE_S);
        if trial.sync_pulse(branch) {
            start_state = start_state.with_action(OutputAction::SetSync {
                level: SyncLevel::High,
            });
        }
        self.insert(
            start_state
                .on(Event::TimerExpired, hold)
                .on(ports.exited(side.into()), grace)
                .on(Event::AuxTimerExpired(timer), outcome),
        )?;

        self.insert(
            State::new(hold, delay_s)
                .on(Event::TimerExpired, outcome)
                .on(Event::AuxTimerExpired(timer), outcome)
                .on(ports.exited(side.into()), grace),
        )?;

        let mut grace_state = State::new(grace, trial.durations.feedback_grace_s)
            .on(Event::TimerExpired, skipped)
            .on(Event::AuxTimerExpired(timer), skipped);
        for role in PortRole::ALL {
            let target = if role == PortRole::from(side) { hold } else { skipped };
            grace_state = grace_state.on(ports.entered(role), target);
        }
        self.insert(grace_state)?;

        debug!(
            branch = %branch,
            delay_s,
            grace_s = trial.durations.feedback_grace_s,
            aux_timer = timer.index(),
            "feedback"
        );
        Ok(())
    }

    /// Reward for the rewarded side, then every penalty sub-graph.
    fn delivery(&mut self) -> Result<(), GraphDefect> {
        let trial = self.trial;
        let side = trial.rewarded_side;
        self.insert(
            State::new(StateName::Reward(side), trial.reward_valve_s)
                .with_action(trial.ports.valve(side, trial.reward_valve_s))
                .with_action(OutputAction::EmitMarker {
                    code: MARKER_REWARD,
                })
                .on(Event::TimerExpired, StateName::InterTrialInterval),
        )?;

        for punishment in Punishment::ALL {
            let style = trial.styles.style(punishment);
            let states = style.states(
                punishment,
                trial.durations.penalty_s(punishment),
                &trial.ports,
                Target::State(StateName::InterTrialInterval),
            );
            for state in states {
                self.insert(state)?;
            }
        }
        Ok(())
    }

    fn inter_trial_interval(&mut self) -> Result<(), GraphDefect> {
        self.insert(
            State::new(
                StateName::InterTrialInterval,
                self.trial.durations.inter_trial_interval_s,
            )
            .with_action(OutputAction::SetStimulus { on: false })
            .on(Event::TimerExpired, Target::Exit),
        )
    }
}
