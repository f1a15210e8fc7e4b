use anyhow::{anyhow, Result};
use rh_reports::{status_label, ReportState, StatusLabel};

use super::{parse_date, Command};

pub struct StatusCommand {
    pub state: String,
    pub report_date: Option<String>,
    pub due_date: Option<String>,
}

impl StatusCommand {
    pub fn new(state: String) -> Self {
        Self {
            state,
            report_date: None,
            due_date: None,
        }
    }

    pub fn with_dates(mut self, report_date: Option<String>, due_date: Option<String>) -> Self {
        self.report_date = report_date;
        self.due_date = due_date;
        self
    }

    fn label(&self) -> Result<StatusLabel> {
        let state = self.state.parse::<ReportState>().map_err(|e| anyhow!(e))?;
        let report_date = self.report_date.as_deref().map(parse_date).transpose()?;
        let due_date = self.due_date.as_deref().map(parse_date).transpose()?;
        Ok(status_label(state, report_date, due_date))
    }
}

impl Command for StatusCommand {
    async fn execute(&self) -> Result<()> {
        let label = self.label()?;
        if label.color().is_empty() {
            println!("{label}");
        } else {
            println!("{label} ({})", label.color());
        }
        Ok(())
    }
}
