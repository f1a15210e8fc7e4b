//! Reporting service: the library contract used by the web layer.
//!
//! Wires the state machine, consistency checker and period calculator to a
//! [`ReportStore`], a [`CapabilityProvider`] and the location reference tree.

use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use tracing::{info, warn, Instrument};

use crate::access::{Actor, Capability, CapabilityProvider};
use crate::consistency::{self, CategoryProgress, Finding};
use crate::domain::{
    ActivityPlanReport, ActivityPlanReportId, DisaggregationLocationReport, LocationTree,
    MonthlyReport, ProjectId, ReportEvent, ReportId, ReportState, ReportingFrequency,
    TargetLocationReport,
};
use crate::errors::{ReportError, Result};
use crate::periods::{self, ReportPeriod, ReportPeriods};
use crate::schema::SchemaRegistry;
use crate::store::ReportStore;
use crate::telemetry::{create_report_span, generate_correlation_id};
use crate::workflow::{ReportStateMachine, StatusLabel, TransitionCommand, TransitionOutcome};

/// Source of the current time, replaceable in tests.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

// A lost compare-and-set is retried against the fresh report; the retry either
// succeeds or fails validation, so a handful of attempts is plenty.
const MAX_TRANSITION_ATTEMPTS: usize = 3;

#[derive(Clone)]
pub struct ReportingService {
    store: Arc<dyn ReportStore>,
    capabilities: Arc<dyn CapabilityProvider>,
    locations: Arc<LocationTree>,
    schema: Arc<SchemaRegistry>,
    clock: Clock,
}

impl ReportingService {
    pub fn new(
        store: Arc<dyn ReportStore>,
        capabilities: Arc<dyn CapabilityProvider>,
        locations: LocationTree,
        schema: SchemaRegistry,
    ) -> Self {
        Self {
            store,
            capabilities,
            locations: Arc::new(locations),
            schema: Arc::new(schema),
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &Arc<dyn ReportStore> {
        &self.store
    }

    pub fn locations(&self) -> &LocationTree {
        &self.locations
    }

    fn authorize(&self, actor: &Actor, capability: Capability) -> Result<()> {
        if self.capabilities.has_capability(actor, capability) {
            return Ok(());
        }
        warn!(actor = %actor.username, capability = %capability, "Operation denied");
        Err(ReportError::PermissionDenied {
            actor: actor.username.clone(),
            capability: capability.to_string(),
        })
    }

    /// Apply `event` to a report on behalf of `actor`.
    pub async fn transition(
        &self,
        report_id: ReportId,
        event: ReportEvent,
        actor: &Actor,
    ) -> Result<TransitionOutcome> {
        self.transition_with(report_id, TransitionCommand::new(event, actor.clone()))
            .await
    }

    /// Like [`ReportingService::transition`], with a full command (e.g. a
    /// rejection comment).
    pub async fn transition_with(
        &self,
        report_id: ReportId,
        command: TransitionCommand,
    ) -> Result<TransitionOutcome> {
        let correlation_id = generate_correlation_id();
        let span = create_report_span("transition", Some(report_id), Some(&correlation_id));

        async {
            if let Some(comment) = &command.comment {
                let commented = MonthlyReport {
                    rejection_comment: Some(comment.clone()),
                    ..self.store.report(report_id).await?
                };
                self.schema.validate(&commented)?;
            }

            let machine = ReportStateMachine::new(self.capabilities.as_ref());

            for attempt in 1..=MAX_TRANSITION_ATTEMPTS {
                let current = self.store.report(report_id).await?;
                let content = self.store.report_content(report_id).await?;
                let updated = machine.handle_event(&current, &command, content, (self.clock)())?;

                if self.store.commit_transition(&updated).await? {
                    return Ok(TransitionOutcome {
                        report_id,
                        previous_state: current.state,
                        state: updated.state,
                        report_date: updated.report_date,
                    });
                }

                warn!(
                    report_id,
                    attempt,
                    expected_version = current.version,
                    "Report changed concurrently, re-validating"
                );
            }

            Err(ReportError::Storage(format!(
                "report {report_id} kept changing during {} transition",
                command.event
            )))
        }
        .instrument(span)
        .await
    }

    /// Over-achievement findings for an activity plan report.
    pub async fn validate(&self, plan_report_id: ActivityPlanReportId) -> Result<Vec<Finding>> {
        let tree = self.store.plan_report_tree(plan_report_id).await?;
        let plan = self.store.activity_plan(tree.report.activity_plan_id).await?;
        Ok(consistency::validate(&tree, &plan))
    }

    /// Planned vs reached totals per category for an activity plan report.
    pub async fn progress(&self, plan_report_id: ActivityPlanReportId) -> Result<Vec<CategoryProgress>> {
        let tree = self.store.plan_report_tree(plan_report_id).await?;
        let plan = self.store.activity_plan(tree.report.activity_plan_id).await?;
        Ok(consistency::progress_summary(&tree, &plan))
    }

    /// Reporting windows of a project.
    pub async fn periods_for(
        &self,
        project_id: ProjectId,
        frequency: ReportingFrequency,
    ) -> Result<ReportPeriods> {
        let project = self.store.project(project_id).await?;
        periods::periods_for(&project, frequency)
    }

    pub async fn status_label(&self, report_id: ReportId) -> Result<StatusLabel> {
        Ok(self.store.report(report_id).await?.status_label())
    }

    /// Create a `todo` report for `period`.
    pub async fn open_report(
        &self,
        project_id: ProjectId,
        period: ReportPeriod,
        actor: &Actor,
    ) -> Result<MonthlyReport> {
        self.authorize(actor, Capability::ManageReports)?;
        let report = self
            .store
            .insert_report(MonthlyReport::for_period(project_id, &period))
            .await?;
        info!(
            report_id = report.id,
            project_id,
            from_date = %report.from_date,
            due_date = %report.report_due_date,
            "Opened monthly report"
        );
        Ok(report)
    }

    /// Open a report for every period of the project that has started by
    /// `today` and has none yet. Returns the newly created reports.
    pub async fn open_due_reports(
        &self,
        project_id: ProjectId,
        today: NaiveDate,
        actor: &Actor,
    ) -> Result<Vec<MonthlyReport>> {
        self.authorize(actor, Capability::ManageReports)?;
        let project = self.store.project(project_id).await?;
        let periods = periods::periods_for(&project, project.reporting_frequency)?;
        let existing = self.store.reports_for_project(project_id).await?;

        let mut opened = Vec::new();
        for period in periods.opened_by(today) {
            if existing.iter().any(|r| r.from_date == period.start) {
                continue;
            }
            opened.push(self.open_report(project_id, period, actor).await?);
        }
        Ok(opened)
    }

    /// Replace the rows of a `todo` report with a copy of the rows of the
    /// latest completed report of the same project that precedes it.
    ///
    /// Returns the id of the report that was copied from. The store refuses
    /// the swap if the report left `todo` while the source rows were read.
    pub async fn copy_previous_report(&self, report_id: ReportId, actor: &Actor) -> Result<ReportId> {
        self.authorize(actor, Capability::ManageReports)?;
        let report = self.store.report(report_id).await?;
        if report.state != ReportState::Todo {
            return Err(ReportError::ReportLocked {
                report_id,
                state: report.state,
            });
        }

        let source = self
            .store
            .reports_for_project(report.project_id)
            .await?
            .into_iter()
            .filter(|r| r.state == ReportState::Completed && r.to_date < report.from_date)
            .max_by_key(|r| (r.to_date, r.approved_on))
            .ok_or(ReportError::NotFound {
                entity: "completed previous report",
                id: report_id,
            })?;

        let mut trees = Vec::new();
        for plan_report in self.store.plan_reports(source.id).await? {
            trees.push(self.store.plan_report_tree(plan_report.id).await?);
        }
        self.store
            .replace_report_rows(report_id, ReportState::Todo, &trees)
            .await?;

        info!(
            report_id,
            source_report_id = source.id,
            plan_reports = trees.len(),
            "Copied rows from previous report"
        );
        Ok(source.id)
    }

    /// Rows can only be added while their report is `todo` or `rejected`.
    pub async fn add_activity_plan_report(
        &self,
        row: ActivityPlanReport,
        actor: &Actor,
    ) -> Result<ActivityPlanReport> {
        self.authorize(actor, Capability::ManageReports)?;
        self.schema.validate(&row)?;
        let report = self.store.report(row.monthly_report_id).await?;
        let plan = self.store.activity_plan(row.activity_plan_id).await?;
        if plan.project_id != report.project_id {
            return Err(ReportError::InvalidField {
                entity: "activity_plan_report",
                field: "activity_plan_id",
                reason: format!(
                    "activity plan {} belongs to project {}, report {} to project {}",
                    plan.id, plan.project_id, report.id, report.project_id
                ),
            });
        }
        self.store.insert_plan_report(row).await
    }

    /// Add a location row; the location must be district level or below.
    pub async fn add_target_location_report(
        &self,
        row: TargetLocationReport,
        actor: &Actor,
    ) -> Result<TargetLocationReport> {
        self.authorize(actor, Capability::ManageReports)?;
        self.schema.validate(&row)?;
        if !self.locations.is_leaf_level(&row.location_code) {
            return Err(ReportError::NonLeafLocation {
                code: row.location_code,
            });
        }

        let plan_report = self.store.plan_report(row.activity_plan_report_id).await?;
        let plan = self.store.activity_plan(plan_report.activity_plan_id).await?;
        if plan.target_location(row.target_location_id).is_none() {
            return Err(ReportError::not_found("target location", row.target_location_id));
        }
        self.store.insert_location_report(row).await
    }

    pub async fn add_disaggregation_report(
        &self,
        row: DisaggregationLocationReport,
        actor: &Actor,
    ) -> Result<DisaggregationLocationReport> {
        self.authorize(actor, Capability::ManageReports)?;
        self.schema.validate(&row)?;
        self.store.insert_disaggregation_report(row).await
    }

    /// Delete an activity plan report with all of its location and
    /// disaggregation rows.
    pub async fn delete_activity_plan_report(&self, id: ActivityPlanReportId, actor: &Actor) -> Result<()> {
        self.authorize(actor, Capability::ManageReports)?;
        self.store.delete_plan_report(id).await?;
        info!(activity_plan_report_id = id, "Deleted activity plan report");
        Ok(())
    }
}
