use anyhow::Result;
use std::path::PathBuf;

use rh_reports::{Actor, ReportingConfig};

use super::Command;
use crate::cli::dataset::{with_service, Access};

pub struct CopyReportCommand {
    pub data: Option<PathBuf>,
    pub report_id: u64,
    pub actor: Actor,
    config: ReportingConfig,
}

impl CopyReportCommand {
    pub fn new(config: ReportingConfig, data: Option<PathBuf>, report_id: u64, actor: Actor) -> Self {
        Self {
            data,
            report_id,
            actor,
            config,
        }
    }
}

impl Command for CopyReportCommand {
    async fn execute(&self) -> Result<()> {
        let report_id = self.report_id;
        let actor = self.actor.clone();
        let source = with_service(&self.config, self.data.as_deref(), Access::ReadWrite, |service| async move {
            Ok::<_, anyhow::Error>(service.copy_previous_report(report_id, &actor).await?)
        })
        .await?;

        println!("📋 Copied rows of report {source} into report {report_id}");
        Ok(())
    }
}
