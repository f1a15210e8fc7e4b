// Report lifecycle: todo -> pending -> completed/rejected -> archived
// Every state change goes through `ReportStateMachine::handle_event`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::access::{Actor, Capability, CapabilityProvider};
use crate::domain::{MonthlyReport, ReportEvent, ReportId, ReportState};
use crate::errors::{ReportError, Result};

/// A request to move a report along one edge of the lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionCommand {
    pub event: ReportEvent,
    pub actor: Actor,
    /// Reason given when rejecting; ignored for other events.
    #[serde(default)]
    pub comment: Option<String>,
    /// Report version the actor based the decision on, when known.
    #[serde(default)]
    pub expected_version: Option<u64>,
}

impl TransitionCommand {
    pub fn new(event: ReportEvent, actor: Actor) -> Self {
        Self {
            event,
            actor,
            comment: None,
            expected_version: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Only apply the event if the report is still at `version`.
    pub fn expecting_version(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }
}

/// What the submit guard needs to know about a report's rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportContent {
    pub plan_reports: usize,
    /// Activity plan reports with at least one target location report.
    pub located_plan_reports: usize,
}

impl ReportContent {
    pub fn is_submittable(&self) -> bool {
        self.located_plan_reports > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub report_id: ReportId,
    pub previous_state: ReportState,
    pub state: ReportState,
    pub report_date: Option<DateTime<Utc>>,
}

/// Target of `event` from `state`, if such an edge exists.
pub fn edge(state: ReportState, event: ReportEvent) -> Option<ReportState> {
    use ReportEvent::*;
    use ReportState::*;

    match (state, event) {
        (Todo, Submit) => Some(Pending),
        (Pending, Approve) => Some(Completed),
        (Pending, Reject) => Some(Rejected),
        (Rejected, Resubmit) => Some(Pending),
        (Completed | Rejected | Todo, Archive) => Some(Archived),
        _ => None,
    }
}

/// Capability an actor needs before `event` may be applied.
pub fn required_capability(event: ReportEvent) -> Option<Capability> {
    match event {
        ReportEvent::Approve => Some(Capability::ApproveReports),
        _ => None,
    }
}

pub struct ReportStateMachine<'a> {
    capabilities: &'a dyn CapabilityProvider,
}

impl<'a> ReportStateMachine<'a> {
    pub fn new(capabilities: &'a dyn CapabilityProvider) -> Self {
        Self { capabilities }
    }

    /// Validates `command` against `report` and returns the updated report.
    ///
    /// Checks run in order: expected version, edge exists, actor capability,
    /// then the submit content guard. The input report is never modified.
    pub fn handle_event(
        &self,
        report: &MonthlyReport,
        command: &TransitionCommand,
        content: ReportContent,
        now: DateTime<Utc>,
    ) -> Result<MonthlyReport> {
        let event = command.event;
        if let Some(expected) = command.expected_version {
            if report.version != expected {
                return Err(ReportError::StaleReport {
                    report_id: report.id,
                    expected,
                    found: report.version,
                });
            }
        }

        let Some(next) = edge(report.state, event) else {
            warn!(
                report_id = report.id,
                state = %report.state,
                event = %event,
                actor = %command.actor.username,
                "Invalid report transition"
            );
            return Err(ReportError::InvalidTransition {
                state: report.state,
                event,
            });
        };

        if let Some(capability) = required_capability(event) {
            if !self.capabilities.has_capability(&command.actor, capability) {
                warn!(
                    report_id = report.id,
                    actor = %command.actor.username,
                    capability = %capability,
                    "Transition denied"
                );
                return Err(ReportError::PermissionDenied {
                    actor: command.actor.username.clone(),
                    capability: capability.to_string(),
                });
            }
        }

        if event == ReportEvent::Submit && !content.is_submittable() {
            return Err(ReportError::IncompleteReport {
                report_id: report.id,
            });
        }

        let mut updated = report.clone();
        updated.state = next;
        match event {
            ReportEvent::Submit | ReportEvent::Resubmit => {
                updated.report_date = Some(now);
            }
            ReportEvent::Approve => {
                updated.approved_on = Some(now);
            }
            ReportEvent::Reject => {
                updated.rejected_on = Some(now);
                updated.rejection_comment = command.comment.clone();
            }
            ReportEvent::Archive => {}
        }

        info!(
            report_id = report.id,
            from_state = %report.state,
            to_state = %next,
            event = %event,
            actor = %command.actor.username,
            "Report state transition"
        );

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::MockCapabilityProvider;
    use chrono::{NaiveDate, TimeZone};

    fn report(state: ReportState) -> MonthlyReport {
        MonthlyReport {
            id: 7,
            project_id: 1,
            from_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            to_date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            report_due_date: NaiveDate::from_ymd_opt(2024, 2, 7).unwrap(),
            state,
            report_date: None,
            approved_on: None,
            rejected_on: None,
            rejection_comment: None,
            version: 0,
        }
    }

    fn allow_all() -> MockCapabilityProvider {
        let mut caps = MockCapabilityProvider::new();
        caps.expect_has_capability().return_const(true);
        caps
    }

    fn deny_all() -> MockCapabilityProvider {
        let mut caps = MockCapabilityProvider::new();
        caps.expect_has_capability().return_const(false);
        caps
    }

    fn located() -> ReportContent {
        ReportContent {
            plan_reports: 1,
            located_plan_reports: 1,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 3, 9, 30, 0).unwrap()
    }

    fn command(event: ReportEvent) -> TransitionCommand {
        TransitionCommand::new(event, Actor::new("amina", &["cluster_lead"]))
    }

    #[test]
    fn test_submit_stamps_report_date() {
        let caps = allow_all();
        let sm = ReportStateMachine::new(&caps);
        let updated = sm
            .handle_event(&report(ReportState::Todo), &command(ReportEvent::Submit), located(), now())
            .unwrap();
        assert_eq!(updated.state, ReportState::Pending);
        assert_eq!(updated.report_date, Some(now()));
    }

    #[test]
    fn test_submit_requires_located_plan_report() {
        let caps = allow_all();
        let sm = ReportStateMachine::new(&caps);
        let content = ReportContent {
            plan_reports: 2,
            located_plan_reports: 0,
        };
        let err = sm
            .handle_event(&report(ReportState::Todo), &command(ReportEvent::Submit), content, now())
            .unwrap_err();
        assert_eq!(err, ReportError::IncompleteReport { report_id: 7 });
    }

    #[test]
    fn test_approve_from_todo_is_always_invalid() {
        let caps = allow_all();
        let sm = ReportStateMachine::new(&caps);
        let err = sm
            .handle_event(&report(ReportState::Todo), &command(ReportEvent::Approve), located(), now())
            .unwrap_err();
        assert!(matches!(err, ReportError::InvalidTransition { state: ReportState::Todo, .. }));
    }

    #[test]
    fn test_approve_without_capability_is_denied() {
        let caps = deny_all();
        let sm = ReportStateMachine::new(&caps);
        let err = sm
            .handle_event(&report(ReportState::Pending), &command(ReportEvent::Approve), located(), now())
            .unwrap_err();
        assert_eq!(
            err,
            ReportError::PermissionDenied {
                actor: "amina".to_string(),
                capability: "approve_reports".to_string(),
            }
        );
    }

    #[test]
    fn test_capability_is_only_checked_for_approve() {
        let mut caps = MockCapabilityProvider::new();
        caps.expect_has_capability()
            .withf(|_, capability| *capability == Capability::ApproveReports)
            .times(1)
            .return_const(true);
        let sm = ReportStateMachine::new(&caps);

        let pending = sm
            .handle_event(&report(ReportState::Todo), &command(ReportEvent::Submit), located(), now())
            .unwrap();
        let completed = sm
            .handle_event(&pending, &command(ReportEvent::Approve), located(), now())
            .unwrap();
        assert_eq!(completed.state, ReportState::Completed);
        assert_eq!(completed.approved_on, Some(now()));
    }

    #[test]
    fn test_reject_records_comment_and_resubmit_returns_to_pending() {
        let caps = allow_all();
        let sm = ReportStateMachine::new(&caps);
        let rejected = sm
            .handle_event(
                &report(ReportState::Pending),
                &command(ReportEvent::Reject).with_comment("Missing district totals"),
                located(),
                now(),
            )
            .unwrap();
        assert_eq!(rejected.state, ReportState::Rejected);
        assert_eq!(rejected.rejection_comment.as_deref(), Some("Missing district totals"));

        let resubmitted = sm
            .handle_event(&rejected, &command(ReportEvent::Resubmit), located(), now())
            .unwrap();
        assert_eq!(resubmitted.state, ReportState::Pending);
    }

    #[test]
    fn test_stale_version_is_refused_before_anything_else() {
        let caps = deny_all();
        let sm = ReportStateMachine::new(&caps);
        let pending = MonthlyReport {
            version: 4,
            ..report(ReportState::Pending)
        };

        let err = sm
            .handle_event(
                &pending,
                &command(ReportEvent::Approve).expecting_version(2),
                located(),
                now(),
            )
            .unwrap_err();
        assert_eq!(
            err,
            ReportError::StaleReport {
                report_id: 7,
                expected: 2,
                found: 4,
            }
        );

        let caps = allow_all();
        let sm = ReportStateMachine::new(&caps);
        let completed = sm
            .handle_event(
                &pending,
                &command(ReportEvent::Approve).expecting_version(4),
                located(),
                now(),
            )
            .unwrap();
        assert_eq!(completed.state, ReportState::Completed);
    }

    #[test]
    fn test_archived_is_terminal() {
        let caps = allow_all();
        let sm = ReportStateMachine::new(&caps);
        let archived = report(ReportState::Archived);
        for event in [
            ReportEvent::Submit,
            ReportEvent::Approve,
            ReportEvent::Reject,
            ReportEvent::Resubmit,
            ReportEvent::Archive,
        ] {
            assert!(sm
                .handle_event(&archived, &command(event), located(), now())
                .is_err());
        }
    }

    #[test]
    fn test_edge_table() {
        assert_eq!(edge(ReportState::Todo, ReportEvent::Archive), Some(ReportState::Archived));
        assert_eq!(edge(ReportState::Completed, ReportEvent::Archive), Some(ReportState::Archived));
        assert_eq!(edge(ReportState::Rejected, ReportEvent::Archive), Some(ReportState::Archived));
        assert_eq!(edge(ReportState::Pending, ReportEvent::Archive), None);
        assert_eq!(edge(ReportState::Submitted, ReportEvent::Approve), None);
        assert_eq!(edge(ReportState::Completed, ReportEvent::Reject), None);
    }
}
