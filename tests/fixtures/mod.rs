//! Shared dataset fixtures for the integration tests.
#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use std::path::PathBuf;
use std::sync::Arc;

use rh_reports::access::{Capability, RoleCapabilities};
use rh_reports::{Dataset, InMemoryReportStore, ReportingService, SchemaRegistry};

/// Winterization project: January completed, February pending (with an
/// over-achieving location), March still todo.
pub static WINTERIZATION: Lazy<Dataset> = Lazy::new(|| {
    serde_json::from_str(include_str!("winterization.json"))
        .expect("Failed to parse winterization fixture")
});

pub const COMPLETED_REPORT: u64 = 1;
pub const PENDING_REPORT: u64 = 2;
pub const TODO_REPORT: u64 = 3;
pub const OVER_ACHIEVING_PLAN_REPORT: u64 = 2;

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
}

pub fn capabilities() -> RoleCapabilities {
    RoleCapabilities::default()
        .grant("cluster_lead", Capability::ApproveReports)
        .grant("cluster_lead", Capability::ManageReports)
        .grant("project_manager", Capability::ManageReports)
}

/// A service over an in-memory copy of `dataset`, with a fixed clock.
pub fn service_for(dataset: Dataset) -> ReportingService {
    let locations = dataset.location_tree();
    ReportingService::new(
        Arc::new(InMemoryReportStore::from_dataset(dataset)),
        Arc::new(capabilities()),
        locations,
        SchemaRegistry::standard(),
    )
    .with_clock(Arc::new(fixed_now))
}

pub fn winterization_service() -> ReportingService {
    service_for(WINTERIZATION.clone())
}

/// Write `dataset` to a fresh temp file, returning the directory guard and
/// the file path.
pub fn write_dataset(dataset: &Dataset) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("dataset.json");
    std::fs::write(&path, serde_json::to_string_pretty(dataset).unwrap())
        .expect("Failed to write dataset fixture");
    (dir, path)
}
