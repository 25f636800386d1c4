pub mod controller;
pub mod engine;
pub mod loop_worker;
pub mod state;

pub use controller::{MonitorHandle, MonitoringController};
pub use engine::{Collaborators, MonitorEngine, PassOutcome};
pub use state::{MonitorStatus, SessionPhase, StepPhase};
