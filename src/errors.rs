use thiserror::Error;

use crate::domain::{ReportEvent, ReportState};

/// Errors surfaced by the reporting core.
///
/// None of these are transient: callers surface them as-is and never retry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReportError {
    #[error("cannot {event} a report that is {state}")]
    InvalidTransition {
        state: ReportState,
        event: ReportEvent,
    },
    #[error("actor '{actor}' lacks the '{capability}' capability")]
    PermissionDenied { actor: String, capability: String },
    #[error("project ends on {end} before it starts on {start}")]
    InvalidRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },
    #[error("report {report_id} has no activity plan report with a target location")]
    IncompleteReport { report_id: u64 },
    #[error("report {report_id} is {state} and its rows can no longer change")]
    ReportLocked { report_id: u64, state: ReportState },
    #[error("report {report_id} is at version {found}, expected version {expected}")]
    StaleReport {
        report_id: u64,
        expected: u64,
        found: u64,
    },
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },
    #[error("location '{code}' is not a district-level (leaf) location")]
    NonLeafLocation { code: String },
    #[error("invalid {entity}.{field}: {reason}")]
    InvalidField {
        entity: &'static str,
        field: &'static str,
        reason: String,
    },
    #[error("storage error: {0}")]
    Storage(String),
}

impl ReportError {
    pub fn not_found(entity: &'static str, id: u64) -> Self {
        ReportError::NotFound { entity, id }
    }
}

#[cfg(feature = "database")]
impl From<sqlx::Error> for ReportError {
    fn from(err: sqlx::Error) -> Self {
        ReportError::Storage(err.to_string())
    }
}

#[cfg(feature = "database")]
impl From<sqlx::migrate::MigrateError> for ReportError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        ReportError::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
