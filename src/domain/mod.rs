// Reporting domain: rows, lifecycle states and the location reference tree

pub mod location;
pub mod models;
pub mod state;

pub use location::{Location, LocationLevel, LocationTree};
pub use models::*;
pub use state::{ReportEvent, ReportState};
