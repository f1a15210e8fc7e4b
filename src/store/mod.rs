// Storage seam for the reporting core
// Planning rows (projects, activity plans) are stored with the ids they come
// with; report rows get their ids from the store on insert.
// Every write that touches a report or its rows bumps `MonthlyReport::version`
// under the same lock or transaction as the write itself.

pub mod memory;

use async_trait::async_trait;

use crate::domain::{
    ActivityPlan, ActivityPlanId, ActivityPlanReport, ActivityPlanReportId,
    DisaggregationLocationReport, LocationReportTree, MonthlyReport, PlanReportTree, Project,
    ProjectId, ReportId, ReportState, TargetLocationReport, TargetLocationReportId,
};
use crate::errors::Result;
use crate::workflow::ReportContent;

pub use memory::{Dataset, InMemoryReportStore};

#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn project(&self, id: ProjectId) -> Result<Project>;

    async fn put_project(&self, project: Project) -> Result<()>;

    async fn activity_plan(&self, id: ActivityPlanId) -> Result<ActivityPlan>;

    async fn put_activity_plan(&self, plan: ActivityPlan) -> Result<()>;

    async fn report(&self, id: ReportId) -> Result<MonthlyReport>;

    /// Reports of a project ordered by period start.
    async fn reports_for_project(&self, project_id: ProjectId) -> Result<Vec<MonthlyReport>>;

    async fn insert_report(&self, report: MonthlyReport) -> Result<MonthlyReport>;

    /// Writes `updated` only if the stored report is still at `updated.version`.
    ///
    /// The stored copy gets the next version. Returns `false` when another
    /// writer changed the report or its rows first; nothing is written then.
    async fn commit_transition(&self, updated: &MonthlyReport) -> Result<bool>;

    async fn plan_report(&self, id: ActivityPlanReportId) -> Result<ActivityPlanReport>;

    async fn plan_reports(&self, report_id: ReportId) -> Result<Vec<ActivityPlanReport>>;

    async fn location_reports(
        &self,
        plan_report_id: ActivityPlanReportId,
    ) -> Result<Vec<TargetLocationReport>>;

    async fn disaggregation_reports(
        &self,
        location_report_id: TargetLocationReportId,
    ) -> Result<Vec<DisaggregationLocationReport>>;

    // Row inserts and deletes fail with `ReportLocked` unless the owning
    // report accepts row edits.

    async fn insert_plan_report(&self, row: ActivityPlanReport) -> Result<ActivityPlanReport>;

    async fn insert_location_report(&self, row: TargetLocationReport) -> Result<TargetLocationReport>;

    async fn insert_disaggregation_report(
        &self,
        row: DisaggregationLocationReport,
    ) -> Result<DisaggregationLocationReport>;

    /// Deletes the plan report and every row it owns.
    async fn delete_plan_report(&self, id: ActivityPlanReportId) -> Result<()>;

    /// Atomically swaps all rows of a report for copies of `trees`, provided
    /// the report is still in `expected`.
    ///
    /// Ids in `trees` are ignored; parent links are rewired to the new rows.
    async fn replace_report_rows(
        &self,
        report_id: ReportId,
        expected: ReportState,
        trees: &[PlanReportTree],
    ) -> Result<()>;

    async fn plan_report_tree(&self, id: ActivityPlanReportId) -> Result<PlanReportTree> {
        let report = self.plan_report(id).await?;
        let mut locations = Vec::new();
        for location in self.location_reports(id).await? {
            let disaggregations = self.disaggregation_reports(location.id).await?;
            locations.push(LocationReportTree {
                location,
                disaggregations,
            });
        }
        Ok(PlanReportTree { report, locations })
    }

    async fn report_content(&self, report_id: ReportId) -> Result<ReportContent> {
        let plan_reports = self.plan_reports(report_id).await?;
        let mut located_plan_reports = 0;
        for plan_report in &plan_reports {
            if !self.location_reports(plan_report.id).await?.is_empty() {
                located_plan_reports += 1;
            }
        }
        Ok(ReportContent {
            plan_reports: plan_reports.len(),
            located_plan_reports,
        })
    }
}
