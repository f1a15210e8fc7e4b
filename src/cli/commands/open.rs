use anyhow::Result;
use chrono::Utc;
use std::path::PathBuf;

use rh_reports::{Actor, ReportingConfig};

use super::{parse_date, Command};
use crate::cli::dataset::{with_service, Access};

pub struct OpenReportsCommand {
    pub data: Option<PathBuf>,
    pub project_id: u64,
    pub today: Option<String>,
    pub actor: Actor,
    config: ReportingConfig,
}

impl OpenReportsCommand {
    pub fn new(config: ReportingConfig, data: Option<PathBuf>, project_id: u64, actor: Actor) -> Self {
        Self {
            data,
            project_id,
            today: None,
            actor,
            config,
        }
    }

    pub fn with_today(mut self, today: Option<String>) -> Self {
        self.today = today;
        self
    }
}

impl Command for OpenReportsCommand {
    async fn execute(&self) -> Result<()> {
        let today = match &self.today {
            Some(value) => parse_date(value)?,
            None => Utc::now().date_naive(),
        };
        let project_id = self.project_id;
        let actor = self.actor.clone();

        let opened = with_service(&self.config, self.data.as_deref(), Access::ReadWrite, |service| async move {
            Ok::<_, anyhow::Error>(service.open_due_reports(project_id, today, &actor).await?)
        })
        .await?;

        if opened.is_empty() {
            println!("📋 Project {project_id} already has a report for every period started by {today}");
            return Ok(());
        }

        println!("🆕 Opened {} report(s) for project {project_id}:", opened.len());
        for report in &opened {
            println!(
                "   #{} {} ({} → {}, due {})",
                report.id,
                report.title(),
                report.from_date,
                report.to_date,
                report.report_due_date
            );
        }
        Ok(())
    }
}
