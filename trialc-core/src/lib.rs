pub mod check;
pub mod error;
pub mod graph;
pub mod port;
pub mod stimulus;
pub mod trial;

pub use error::{CompileError, CompileResult, ConfigurationError, DomainError, GraphDefect};
pub use graph::{
    AuxTimer, AuxTimers, Event, OutputAction, State, StateGraph, StateName, SyncLevel, Target,
};
pub use port::{MAX_PORT, PortId, PortRole, Side};
pub use stimulus::Modality;
pub use trial::{Branch, Punishment, TrialOutcome};
