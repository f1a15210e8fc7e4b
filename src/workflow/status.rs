//! Status label shown next to a report in listings.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{MonthlyReport, ReportState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusLabel {
    Warning,
    OnTime,
    Late,
    Neutral,
}

impl StatusLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusLabel::Warning => "warning",
            StatusLabel::OnTime => "on-time",
            StatusLabel::Late => "late",
            StatusLabel::Neutral => "neutral",
        }
    }

    /// Colour class used by the listing templates.
    pub fn color(&self) -> &'static str {
        match self {
            StatusLabel::Warning => "olive",
            StatusLabel::OnTime => "green",
            StatusLabel::Late => "red",
            StatusLabel::Neutral => "",
        }
    }
}

impl fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label for a report given its state and, when known, its dates.
///
/// `pending` and `completed` are labelled from the state alone; the other
/// rules need both dates.
pub fn status_label(
    state: ReportState,
    report_date: Option<NaiveDate>,
    due_date: Option<NaiveDate>,
) -> StatusLabel {
    match state {
        ReportState::Pending => return StatusLabel::Warning,
        ReportState::Completed => return StatusLabel::OnTime,
        _ => {}
    }

    let (Some(report_date), Some(due_date)) = (report_date, due_date) else {
        return StatusLabel::Neutral;
    };

    if state == ReportState::Todo && report_date < due_date {
        StatusLabel::OnTime
    } else if state != ReportState::Archived && report_date > due_date {
        StatusLabel::Late
    } else {
        StatusLabel::Neutral
    }
}

impl MonthlyReport {
    pub fn status_label(&self) -> StatusLabel {
        status_label(
            self.state,
            self.report_date.map(|d| d.date_naive()),
            Some(self.report_due_date),
        )
    }
}
