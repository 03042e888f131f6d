pub mod builder;
pub mod config;
pub mod feedback;
pub mod planner;
pub mod ports;
pub mod timing;
pub mod trial;
pub mod valve;

pub use builder::{StateGraphBuilder, compile_trial};
pub use config::{TimerArming, TrialConfig};
pub use feedback::FeedbackStyle;
pub use planner::{FeedbackDelaySelection, SessionSettings, TrialPlanner};
pub use ports::PortMapping;
pub use trial::{Trial, TrialDurations};
pub use valve::{CalibrationPoint, CalibrationTable, ValveTime};
