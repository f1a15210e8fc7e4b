use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::ReportStore;
use crate::domain::{
    ActivityPlan, ActivityPlanId, ActivityPlanReport, ActivityPlanReportId,
    DisaggregationLocationReport, LocationTree, MonthlyReport, PlanReportTree, Project, ProjectId,
    ReportId, ReportState, TargetLocationReport, TargetLocationReportId,
};
use crate::errors::{ReportError, Result};

/// Every row the reporting core knows about, in a serializable form.
///
/// The CLI reads and writes this as its JSON data file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub locations: Vec<crate::domain::Location>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub activity_plans: Vec<ActivityPlan>,
    #[serde(default)]
    pub reports: Vec<MonthlyReport>,
    #[serde(default)]
    pub activity_plan_reports: Vec<ActivityPlanReport>,
    #[serde(default)]
    pub target_location_reports: Vec<TargetLocationReport>,
    #[serde(default)]
    pub disaggregation_location_reports: Vec<DisaggregationLocationReport>,
}

impl Dataset {
    pub fn location_tree(&self) -> LocationTree {
        LocationTree::new(self.locations.iter().cloned())
    }

    fn remove_plan_reports(&mut self, ids: &[ActivityPlanReportId]) {
        let location_ids: Vec<TargetLocationReportId> = self
            .target_location_reports
            .iter()
            .filter(|l| ids.contains(&l.activity_plan_report_id))
            .map(|l| l.id)
            .collect();

        self.disaggregation_location_reports
            .retain(|d| !location_ids.contains(&d.target_location_report_id));
        self.target_location_reports
            .retain(|l| !ids.contains(&l.activity_plan_report_id));
        self.activity_plan_reports.retain(|p| !ids.contains(&p.id));
    }

    /// Bumps the version of a report whose rows are about to change, or
    /// fails without touching anything when `editable` refuses its state.
    fn claim_rows(&mut self, report_id: ReportId, editable: impl Fn(ReportState) -> bool) -> Result<()> {
        let report = self
            .reports
            .iter_mut()
            .find(|r| r.id == report_id)
            .ok_or_else(|| ReportError::not_found("monthly report", report_id))?;
        if !editable(report.state) {
            return Err(ReportError::ReportLocked {
                report_id,
                state: report.state,
            });
        }
        report.version += 1;
        Ok(())
    }

    fn plan_report_owner(&self, id: ActivityPlanReportId) -> Result<ReportId> {
        self.activity_plan_reports
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.monthly_report_id)
            .ok_or_else(|| ReportError::not_found("activity plan report", id))
    }

    fn location_report_owner(&self, id: TargetLocationReportId) -> Result<ReportId> {
        let plan_report_id = self
            .target_location_reports
            .iter()
            .find(|l| l.id == id)
            .map(|l| l.activity_plan_report_id)
            .ok_or_else(|| ReportError::not_found("target location report", id))?;
        self.plan_report_owner(plan_report_id)
    }
}

fn next_id<T>(rows: &[T], id: impl Fn(&T) -> u64) -> u64 {
    rows.iter().map(id).max().unwrap_or(0) + 1
}

/// Report store backed by process memory.
///
/// A single `RwLock` guards the whole dataset, so every write (including the
/// version compare-and-set) is serialized.
#[derive(Debug, Default)]
pub struct InMemoryReportStore {
    data: RwLock<Dataset>,
}

impl InMemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_dataset(dataset: Dataset) -> Self {
        Self {
            data: RwLock::new(dataset),
        }
    }

    pub async fn snapshot(&self) -> Dataset {
        self.data.read().await.clone()
    }
}

#[async_trait]
impl ReportStore for InMemoryReportStore {
    async fn project(&self, id: ProjectId) -> Result<Project> {
        self.data
            .read()
            .await
            .projects
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| ReportError::not_found("project", id))
    }

    async fn put_project(&self, project: Project) -> Result<()> {
        let mut data = self.data.write().await;
        match data.projects.iter_mut().find(|p| p.id == project.id) {
            Some(existing) => *existing = project,
            None => data.projects.push(project),
        }
        Ok(())
    }

    async fn activity_plan(&self, id: ActivityPlanId) -> Result<ActivityPlan> {
        self.data
            .read()
            .await
            .activity_plans
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| ReportError::not_found("activity plan", id))
    }

    async fn put_activity_plan(&self, plan: ActivityPlan) -> Result<()> {
        let mut data = self.data.write().await;
        if !data.projects.iter().any(|p| p.id == plan.project_id) {
            return Err(ReportError::not_found("project", plan.project_id));
        }
        match data.activity_plans.iter_mut().find(|p| p.id == plan.id) {
            Some(existing) => *existing = plan,
            None => data.activity_plans.push(plan),
        }
        Ok(())
    }

    async fn report(&self, id: ReportId) -> Result<MonthlyReport> {
        self.data
            .read()
            .await
            .reports
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| ReportError::not_found("monthly report", id))
    }

    async fn reports_for_project(&self, project_id: ProjectId) -> Result<Vec<MonthlyReport>> {
        let data = self.data.read().await;
        let mut reports: Vec<MonthlyReport> = data
            .reports
            .iter()
            .filter(|r| r.project_id == project_id)
            .cloned()
            .collect();
        reports.sort_by_key(|r| (r.from_date, r.id));
        Ok(reports)
    }

    async fn insert_report(&self, mut report: MonthlyReport) -> Result<MonthlyReport> {
        let mut data = self.data.write().await;
        if !data.projects.iter().any(|p| p.id == report.project_id) {
            return Err(ReportError::not_found("project", report.project_id));
        }
        report.id = next_id(&data.reports, |r| r.id);
        data.reports.push(report.clone());
        Ok(report)
    }

    async fn commit_transition(&self, updated: &MonthlyReport) -> Result<bool> {
        let mut data = self.data.write().await;
        let stored = data
            .reports
            .iter_mut()
            .find(|r| r.id == updated.id)
            .ok_or_else(|| ReportError::not_found("monthly report", updated.id))?;

        if stored.version != updated.version {
            return Ok(false);
        }
        *stored = MonthlyReport {
            version: updated.version + 1,
            ..updated.clone()
        };
        Ok(true)
    }

    async fn plan_report(&self, id: ActivityPlanReportId) -> Result<ActivityPlanReport> {
        self.data
            .read()
            .await
            .activity_plan_reports
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| ReportError::not_found("activity plan report", id))
    }

    async fn plan_reports(&self, report_id: ReportId) -> Result<Vec<ActivityPlanReport>> {
        Ok(self
            .data
            .read()
            .await
            .activity_plan_reports
            .iter()
            .filter(|p| p.monthly_report_id == report_id)
            .cloned()
            .collect())
    }

    async fn location_reports(
        &self,
        plan_report_id: ActivityPlanReportId,
    ) -> Result<Vec<TargetLocationReport>> {
        Ok(self
            .data
            .read()
            .await
            .target_location_reports
            .iter()
            .filter(|l| l.activity_plan_report_id == plan_report_id)
            .cloned()
            .collect())
    }

    async fn disaggregation_reports(
        &self,
        location_report_id: TargetLocationReportId,
    ) -> Result<Vec<DisaggregationLocationReport>> {
        Ok(self
            .data
            .read()
            .await
            .disaggregation_location_reports
            .iter()
            .filter(|d| d.target_location_report_id == location_report_id)
            .cloned()
            .collect())
    }

    async fn insert_plan_report(&self, mut row: ActivityPlanReport) -> Result<ActivityPlanReport> {
        let mut data = self.data.write().await;
        if !data.activity_plans.iter().any(|p| p.id == row.activity_plan_id) {
            return Err(ReportError::not_found("activity plan", row.activity_plan_id));
        }
        data.claim_rows(row.monthly_report_id, |s| s.accepts_row_edits())?;
        row.id = next_id(&data.activity_plan_reports, |p| p.id);
        data.activity_plan_reports.push(row.clone());
        Ok(row)
    }

    async fn insert_location_report(&self, mut row: TargetLocationReport) -> Result<TargetLocationReport> {
        let mut data = self.data.write().await;
        let report_id = data.plan_report_owner(row.activity_plan_report_id)?;
        data.claim_rows(report_id, |s| s.accepts_row_edits())?;
        row.id = next_id(&data.target_location_reports, |l| l.id);
        data.target_location_reports.push(row.clone());
        Ok(row)
    }

    async fn insert_disaggregation_report(
        &self,
        mut row: DisaggregationLocationReport,
    ) -> Result<DisaggregationLocationReport> {
        let mut data = self.data.write().await;
        let report_id = data.location_report_owner(row.target_location_report_id)?;
        data.claim_rows(report_id, |s| s.accepts_row_edits())?;
        row.id = next_id(&data.disaggregation_location_reports, |d| d.id);
        data.disaggregation_location_reports.push(row.clone());
        Ok(row)
    }

    async fn delete_plan_report(&self, id: ActivityPlanReportId) -> Result<()> {
        let mut data = self.data.write().await;
        let report_id = data.plan_report_owner(id)?;
        data.claim_rows(report_id, |s| s.accepts_row_edits())?;
        data.remove_plan_reports(&[id]);
        Ok(())
    }

    async fn replace_report_rows(
        &self,
        report_id: ReportId,
        expected: ReportState,
        trees: &[PlanReportTree],
    ) -> Result<()> {
        let mut data = self.data.write().await;
        data.claim_rows(report_id, |state| state == expected)?;

        let existing: Vec<ActivityPlanReportId> = data
            .activity_plan_reports
            .iter()
            .filter(|p| p.monthly_report_id == report_id)
            .map(|p| p.id)
            .collect();
        data.remove_plan_reports(&existing);

        for tree in trees {
            let mut plan_report = tree.report.clone();
            plan_report.id = next_id(&data.activity_plan_reports, |p| p.id);
            plan_report.monthly_report_id = report_id;
            let plan_report_id = plan_report.id;
            data.activity_plan_reports.push(plan_report);

            for location in &tree.locations {
                let mut location_report = location.location.clone();
                location_report.id = next_id(&data.target_location_reports, |l| l.id);
                location_report.activity_plan_report_id = plan_report_id;
                let location_report_id = location_report.id;
                data.target_location_reports.push(location_report);

                for row in &location.disaggregations {
                    let mut row = row.clone();
                    row.id = next_id(&data.disaggregation_location_reports, |d| d.id);
                    row.target_location_report_id = location_report_id;
                    data.disaggregation_location_reports.push(row);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn seeded() -> InMemoryReportStore {
        let store = InMemoryReportStore::new();
        store
            .put_project(Project {
                id: 1,
                title: "Winterization".to_string(),
                code: "WIN-24".to_string(),
                start_date: date(2024, 1, 1),
                end_date: date(2024, 3, 31),
                reporting_frequency: Default::default(),
                grace_days: 7,
            })
            .await
            .unwrap();
        store
            .put_activity_plan(ActivityPlan {
                id: 3,
                project_id: 1,
                indicator: "kits".to_string(),
                target_locations: vec![],
            })
            .await
            .unwrap();
        store
    }

    fn report() -> MonthlyReport {
        MonthlyReport {
            id: 0,
            project_id: 1,
            from_date: date(2024, 1, 1),
            to_date: date(2024, 1, 31),
            report_due_date: date(2024, 2, 7),
            state: ReportState::Todo,
            report_date: None,
            approved_on: None,
            rejected_on: None,
            rejection_comment: None,
            version: 0,
        }
    }

    #[tokio::test]
    async fn test_delete_plan_report_cascades() {
        let store = seeded().await;
        let report = store.insert_report(report()).await.unwrap();
        let plan_report = store.insert_plan_report(plan_report(report.id)).await.unwrap();
        let location = store
            .insert_location_report(TargetLocationReport {
                id: 0,
                activity_plan_report_id: plan_report.id,
                target_location_id: 10,
                location_code: "AF0101".to_string(),
            })
            .await
            .unwrap();
        store
            .insert_disaggregation_report(DisaggregationLocationReport {
                id: 0,
                target_location_report_id: location.id,
                category: "women".to_string(),
                reached: 12,
            })
            .await
            .unwrap();

        store.delete_plan_report(plan_report.id).await.unwrap();

        let snapshot = store.snapshot().await;
        assert!(snapshot.activity_plan_reports.is_empty());
        assert!(snapshot.target_location_reports.is_empty());
        assert!(snapshot.disaggregation_location_reports.is_empty());
        assert_eq!(snapshot.reports.len(), 1);
    }

    fn plan_report(report_id: ReportId) -> ActivityPlanReport {
        ActivityPlanReport {
            id: 0,
            monthly_report_id: report_id,
            activity_plan_id: 3,
            response_type: None,
            units: None,
            no_of_transfers: None,
        }
    }

    #[tokio::test]
    async fn test_commit_transition_is_compare_and_set() {
        let store = seeded().await;
        let stored = store.insert_report(report()).await.unwrap();

        let mut pending = stored.clone();
        pending.state = ReportState::Pending;
        assert!(store.commit_transition(&pending).await.unwrap());

        let mut archived = stored.clone();
        archived.state = ReportState::Archived;
        assert!(!store.commit_transition(&archived).await.unwrap());

        let current = store.report(stored.id).await.unwrap();
        assert_eq!(current.state, ReportState::Pending);
        assert_eq!(current.version, stored.version + 1);
    }

    #[tokio::test]
    async fn test_stale_commit_loses_after_state_comes_back() {
        let store = seeded().await;
        let stored = store
            .insert_report(MonthlyReport {
                state: ReportState::Pending,
                ..report()
            })
            .await
            .unwrap();

        // Approver reads the pending report, then someone rejects and
        // resubmits it before the approval is written.
        let mut approved = stored.clone();
        approved.state = ReportState::Completed;

        let mut rejected = stored.clone();
        rejected.state = ReportState::Rejected;
        rejected.rejection_comment = Some("recount".to_string());
        assert!(store.commit_transition(&rejected).await.unwrap());
        let mut resubmitted = store.report(stored.id).await.unwrap();
        resubmitted.state = ReportState::Pending;
        assert!(store.commit_transition(&resubmitted).await.unwrap());

        assert!(!store.commit_transition(&approved).await.unwrap());
        let current = store.report(stored.id).await.unwrap();
        assert_eq!(current.state, ReportState::Pending);
        assert_eq!(current.rejection_comment.as_deref(), Some("recount"));
    }

    #[tokio::test]
    async fn test_rows_of_submitted_report_are_locked() {
        let store = seeded().await;
        let stored = store.insert_report(report()).await.unwrap();
        let kept = store.insert_plan_report(plan_report(stored.id)).await.unwrap();

        let mut pending = store.report(stored.id).await.unwrap();
        pending.state = ReportState::Pending;
        assert!(store.commit_transition(&pending).await.unwrap());

        let locked = ReportError::ReportLocked {
            report_id: stored.id,
            state: ReportState::Pending,
        };
        assert_eq!(store.insert_plan_report(plan_report(stored.id)).await.unwrap_err(), locked);
        assert_eq!(store.delete_plan_report(kept.id).await.unwrap_err(), locked);
        assert_eq!(
            store
                .replace_report_rows(stored.id, ReportState::Todo, &[])
                .await
                .unwrap_err(),
            locked
        );
        assert_eq!(store.plan_reports(stored.id).await.unwrap(), vec![kept]);
    }

    #[tokio::test]
    async fn test_row_edit_invalidates_concurrent_commit() {
        let store = seeded().await;
        let stored = store.insert_report(report()).await.unwrap();
        let plan_report = store.insert_plan_report(plan_report(stored.id)).await.unwrap();

        // Submit was validated against the rows, then they were deleted.
        let mut submitted = store.report(stored.id).await.unwrap();
        submitted.state = ReportState::Pending;
        store.delete_plan_report(plan_report.id).await.unwrap();

        assert!(!store.commit_transition(&submitted).await.unwrap());
        assert_eq!(store.report(stored.id).await.unwrap().state, ReportState::Todo);
    }

    #[tokio::test]
    async fn test_insert_requires_parent() {
        let store = seeded().await;
        let err = store
            .insert_location_report(TargetLocationReport {
                id: 0,
                activity_plan_report_id: 42,
                target_location_id: 10,
                location_code: "AF0101".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err, ReportError::not_found("activity plan report", 42));
    }
}
