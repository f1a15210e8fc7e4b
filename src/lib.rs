// rh-reports library - project progress reporting core
// This exposes the core components for the web layer, the CLI and tests

pub mod access;
pub mod config;
pub mod consistency;
pub mod database;
pub mod domain;
pub mod errors;
pub mod periods;
pub mod schema;
pub mod service;
pub mod store;
pub mod telemetry;
pub mod workflow;

// Re-export key types for easy access
pub use access::{Actor, Capability, CapabilityProvider, RoleCapabilities};
pub use config::ReportingConfig;
pub use consistency::{CategoryProgress, Finding};
pub use database::{open_database, DatabaseHandle};
pub use domain::{
    LocationTree, MonthlyReport, ReportEvent, ReportState, ReportingFrequency,
};
pub use errors::{ReportError, Result};
pub use periods::{periods_for, ReportPeriod, ReportPeriods};
pub use schema::SchemaRegistry;
pub use service::ReportingService;
pub use store::{Dataset, InMemoryReportStore, ReportStore};
pub use telemetry::{create_report_span, generate_correlation_id, init_telemetry};
pub use workflow::{status_label, StatusLabel, TransitionCommand, TransitionOutcome};
