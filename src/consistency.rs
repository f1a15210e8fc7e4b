//! Target/Disaggregation consistency checks.
//!
//! Reached counts above plan are legitimate in the field, so nothing here
//! fails: the checker returns advisory findings and leaves it to the caller to
//! flag them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use crate::domain::{ActivityPlan, PlanReportTree, TargetLocationReportId};

/// A category whose reached total exceeds its planned target at one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub target_location_report_id: TargetLocationReportId,
    pub category: String,
    pub planned: i64,
    pub reached: i64,
    pub over_by: i64,
}

impl Finding {
    pub fn as_tuple(&self) -> (&str, i64, i64, i64) {
        (self.category.as_str(), self.planned, self.reached, self.over_by)
    }
}

/// Planned vs reached totals for one category across a whole plan report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryProgress {
    pub category: String,
    pub planned: i64,
    pub reached: i64,
}

impl CategoryProgress {
    /// Share of the plan reached, in percent. `None` when nothing was planned.
    pub fn percent_reached(&self) -> Option<f64> {
        (self.planned > 0).then(|| self.reached as f64 * 100.0 / self.planned as f64)
    }
}

fn reached_by_category(
    disaggregations: &[crate::domain::DisaggregationLocationReport],
) -> BTreeMap<&str, i64> {
    let mut sums: BTreeMap<&str, i64> = BTreeMap::new();
    for row in disaggregations {
        let sum = sums.entry(row.category.as_str()).or_default();
        *sum = sum.saturating_add(row.reached);
    }
    sums
}

/// Over-achievement findings for one activity plan report.
pub fn validate(tree: &PlanReportTree, plan: &ActivityPlan) -> Vec<Finding> {
    let mut findings = Vec::new();

    for location in &tree.locations {
        let target = plan.target_location(location.location.target_location_id);

        for (category, reached) in reached_by_category(&location.disaggregations) {
            let planned = target.map(|t| t.planned_for(category)).unwrap_or(0);
            if reached > planned {
                findings.push(Finding {
                    target_location_report_id: location.location.id,
                    category: category.to_string(),
                    planned,
                    reached,
                    over_by: reached.saturating_sub(planned),
                });
            }
        }
    }

    if !findings.is_empty() {
        info!(
            activity_plan_report_id = tree.report.id,
            findings = findings.len(),
            "Reached counts exceed planned targets"
        );
    }

    findings
}

/// Totals per category across every location of the plan report.
///
/// Planned totals only count locations that were actually reported on. Sums
/// saturate at `i64::MAX`.
pub fn progress_summary(tree: &PlanReportTree, plan: &ActivityPlan) -> Vec<CategoryProgress> {
    let mut totals: BTreeMap<String, (i64, i64)> = BTreeMap::new();

    for location in &tree.locations {
        let target = plan.target_location(location.location.target_location_id);

        if let Some(target) = target {
            for planned in &target.disaggregations {
                let total = totals.entry(planned.category.clone()).or_default();
                total.0 = total.0.saturating_add(planned.target);
            }
        }
        for (category, reached) in reached_by_category(&location.disaggregations) {
            let total = totals.entry(category.to_string()).or_default();
            total.1 = total.1.saturating_add(reached);
        }
    }

    totals
        .into_iter()
        .map(|(category, (planned, reached))| CategoryProgress {
            category,
            planned,
            reached,
        })
        .collect()
}
