use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a monthly report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReportState {
    #[default]
    Todo,
    Pending,
    // Legacy rows carry the misspelled value.
    #[serde(alias = "submited")]
    Submitted,
    Rejected,
    Completed,
    Archived,
}

impl ReportState {
    pub const ALL: [ReportState; 6] = [
        ReportState::Todo,
        ReportState::Pending,
        ReportState::Submitted,
        ReportState::Rejected,
        ReportState::Completed,
        ReportState::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportState::Todo => "todo",
            ReportState::Pending => "pending",
            ReportState::Submitted => "submitted",
            ReportState::Rejected => "rejected",
            ReportState::Completed => "completed",
            ReportState::Archived => "archived",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ReportState::Archived)
    }

    /// Rows of a report may only be added or removed while it is with its
    /// authors.
    pub fn accepts_row_edits(&self) -> bool {
        matches!(self, ReportState::Todo | ReportState::Rejected)
    }
}

impl fmt::Display for ReportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "todo" => Ok(ReportState::Todo),
            "pending" => Ok(ReportState::Pending),
            "submitted" | "submited" => Ok(ReportState::Submitted),
            "rejected" => Ok(ReportState::Rejected),
            "completed" => Ok(ReportState::Completed),
            "archived" => Ok(ReportState::Archived),
            other => Err(format!("unknown report state '{other}'")),
        }
    }
}

/// Actions a user can take on a monthly report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportEvent {
    Submit,
    Approve,
    Reject,
    Resubmit,
    Archive,
}

impl ReportEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportEvent::Submit => "submit",
            ReportEvent::Approve => "approve",
            ReportEvent::Reject => "reject",
            ReportEvent::Resubmit => "resubmit",
            ReportEvent::Archive => "archive",
        }
    }
}

impl fmt::Display for ReportEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "submit" => Ok(ReportEvent::Submit),
            "approve" => Ok(ReportEvent::Approve),
            "reject" => Ok(ReportEvent::Reject),
            "resubmit" => Ok(ReportEvent::Resubmit),
            "archive" => Ok(ReportEvent::Archive),
            other => Err(format!("unknown report event '{other}'")),
        }
    }
}
