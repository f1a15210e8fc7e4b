//! Persisted rows of the reporting core.
//!
//! Report row ids are assigned by the store on insert; any id carried by a row
//! passed to an `insert_*` call is ignored. Planning rows (projects, activity
//! plans) keep the ids they are stored with.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::state::ReportState;
use crate::periods::ReportPeriod;

pub type ProjectId = u64;
pub type ActivityPlanId = u64;
pub type TargetLocationId = u64;
pub type ReportId = u64;
pub type ActivityPlanReportId = u64;
pub type TargetLocationReportId = u64;
pub type DisaggregationReportId = u64;

pub const DEFAULT_GRACE_DAYS: u32 = 7;

fn default_grace_days() -> u32 {
    DEFAULT_GRACE_DAYS
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReportingFrequency {
    #[default]
    Monthly,
    Quarterly,
}

impl ReportingFrequency {
    /// Length of one reporting unit in calendar months.
    pub fn months(&self) -> u32 {
        match self {
            ReportingFrequency::Monthly => 1,
            ReportingFrequency::Quarterly => 3,
        }
    }
}

impl fmt::Display for ReportingFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportingFrequency::Monthly => f.write_str("monthly"),
            ReportingFrequency::Quarterly => f.write_str("quarterly"),
        }
    }
}

impl FromStr for ReportingFrequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monthly" => Ok(ReportingFrequency::Monthly),
            "quarterly" => Ok(ReportingFrequency::Quarterly),
            other => Err(format!("unknown reporting frequency '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub title: String,
    pub code: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub reporting_frequency: ReportingFrequency,
    #[serde(default = "default_grace_days")]
    pub grace_days: u32,
}

/// Planned quantity for one disaggregation category at one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisaggregationTarget {
    pub category: String,
    pub target: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetLocation {
    pub id: TargetLocationId,
    pub location_code: String,
    #[serde(default)]
    pub disaggregations: Vec<DisaggregationTarget>,
}

impl TargetLocation {
    /// Planned target for a category; categories without a target plan zero.
    pub fn planned_for(&self, category: &str) -> i64 {
        self.disaggregations
            .iter()
            .filter(|d| d.category == category)
            .fold(0i64, |sum, d| sum.saturating_add(d.target))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityPlan {
    pub id: ActivityPlanId,
    pub project_id: ProjectId,
    pub indicator: String,
    #[serde(default)]
    pub target_locations: Vec<TargetLocation>,
}

impl ActivityPlan {
    pub fn target_location(&self, id: TargetLocationId) -> Option<&TargetLocation> {
        self.target_locations.iter().find(|t| t.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyReport {
    pub id: ReportId,
    pub project_id: ProjectId,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub report_due_date: NaiveDate,
    #[serde(default)]
    pub state: ReportState,
    #[serde(default)]
    pub report_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub approved_on: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rejected_on: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rejection_comment: Option<String>,
    /// Bumped by the store on every committed change to the report or its rows.
    #[serde(default)]
    pub version: u64,
}

impl MonthlyReport {
    /// A fresh `todo` report covering `period`.
    pub fn for_period(project_id: ProjectId, period: &ReportPeriod) -> Self {
        Self {
            id: 0,
            project_id,
            from_date: period.start,
            to_date: period.end,
            report_due_date: period.due_date,
            state: ReportState::Todo,
            report_date: None,
            approved_on: None,
            rejected_on: None,
            rejection_comment: None,
            version: 0,
        }
    }

    /// Display name, e.g. "January, 2024 Report".
    pub fn title(&self) -> String {
        format!("{}, {} Report", self.from_date.format("%B"), self.to_date.year())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityPlanReport {
    pub id: ActivityPlanReportId,
    pub monthly_report_id: ReportId,
    pub activity_plan_id: ActivityPlanId,
    #[serde(default)]
    pub response_type: Option<String>,
    #[serde(default)]
    pub units: Option<i64>,
    #[serde(default)]
    pub no_of_transfers: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetLocationReport {
    pub id: TargetLocationReportId,
    pub activity_plan_report_id: ActivityPlanReportId,
    pub target_location_id: TargetLocationId,
    pub location_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisaggregationLocationReport {
    pub id: DisaggregationReportId,
    pub target_location_report_id: TargetLocationReportId,
    pub category: String,
    pub reached: i64,
}

/// A target location report together with its disaggregation rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationReportTree {
    pub location: TargetLocationReport,
    pub disaggregations: Vec<DisaggregationLocationReport>,
}

/// An activity plan report with every nested row it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanReportTree {
    pub report: ActivityPlanReport,
    pub locations: Vec<LocationReportTree>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_title_uses_period_month() {
        let period = ReportPeriod {
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2024, 2, 7).unwrap(),
        };
        let report = MonthlyReport::for_period(1, &period);
        assert_eq!(report.title(), "January, 2024 Report");
        assert_eq!(report.state, ReportState::Todo);
        assert!(report.report_date.is_none());
    }

    #[test]
    fn test_planned_for_missing_category_is_zero() {
        let location = TargetLocation {
            id: 1,
            location_code: "AF0101".to_string(),
            disaggregations: vec![DisaggregationTarget {
                category: "women".to_string(),
                target: 100,
            }],
        };
        assert_eq!(location.planned_for("women"), 100);
        assert_eq!(location.planned_for("men"), 0);
    }

    #[test]
    fn test_project_defaults_when_deserialized() {
        let project: Project = serde_json::from_str(
            r#"{"id":1,"title":"Winterization","code":"WIN-24","start_date":"2024-01-01","end_date":"2024-03-31"}"#,
        )
        .unwrap();
        assert_eq!(project.grace_days, DEFAULT_GRACE_DAYS);
        assert_eq!(project.reporting_frequency, ReportingFrequency::Monthly);
    }
}
