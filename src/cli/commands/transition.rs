use anyhow::{anyhow, Result};
use std::path::PathBuf;

use rh_reports::{Actor, ReportEvent, ReportingConfig, TransitionCommand};

use super::Command;
use crate::cli::dataset::{with_service, Access};

pub struct TransitionReportCommand {
    pub data: Option<PathBuf>,
    pub report_id: u64,
    pub event: String,
    pub actor: Actor,
    pub comment: Option<String>,
    pub expected_version: Option<u64>,
    config: ReportingConfig,
}

impl TransitionReportCommand {
    pub fn new(config: ReportingConfig, report_id: u64, event: String, actor: Actor) -> Self {
        Self {
            data: None,
            report_id,
            event,
            actor,
            comment: None,
            expected_version: None,
            config,
        }
    }

    pub fn with_data(mut self, data: Option<PathBuf>) -> Self {
        self.data = data;
        self
    }

    pub fn with_comment(mut self, comment: Option<String>) -> Self {
        self.comment = comment;
        self
    }

    pub fn with_expected_version(mut self, version: Option<u64>) -> Self {
        self.expected_version = version;
        self
    }
}

impl Command for TransitionReportCommand {
    async fn execute(&self) -> Result<()> {
        let event = self.event.parse::<ReportEvent>().map_err(|e| anyhow!(e))?;
        let mut command = TransitionCommand::new(event, self.actor.clone());
        if let Some(comment) = &self.comment {
            command = command.with_comment(comment.clone());
        }
        if let Some(version) = self.expected_version {
            command = command.expecting_version(version);
        }

        let report_id = self.report_id;
        let outcome = with_service(&self.config, self.data.as_deref(), Access::ReadWrite, |service| async move {
            Ok::<_, anyhow::Error>(service.transition_with(report_id, command).await?)
        })
        .await?;

        println!(
            "✅ Report {}: {} → {}",
            outcome.report_id, outcome.previous_state, outcome.state
        );
        if let Some(report_date) = outcome.report_date {
            println!("   📅 Report date: {}", report_date.format("%Y-%m-%d %H:%M UTC"));
        }
        Ok(())
    }
}
