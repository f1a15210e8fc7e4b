// Report lifecycle rules

pub mod state_machine;
pub mod status;

pub use state_machine::{
    edge, required_capability, ReportContent, ReportStateMachine, TransitionCommand,
    TransitionOutcome,
};
pub use status::{status_label, StatusLabel};
