use anyhow::Result;
use std::path::PathBuf;

use rh_reports::ReportingConfig;

use super::Command;
use crate::cli::dataset::{with_service, Access};

pub struct ValidateCommand {
    pub data: Option<PathBuf>,
    pub plan_report_id: u64,
    config: ReportingConfig,
}

impl ValidateCommand {
    pub fn new(config: ReportingConfig, data: Option<PathBuf>, plan_report_id: u64) -> Self {
        Self {
            data,
            plan_report_id,
            config,
        }
    }
}

impl Command for ValidateCommand {
    async fn execute(&self) -> Result<()> {
        let id = self.plan_report_id;
        let (findings, progress) = with_service(&self.config, self.data.as_deref(), Access::ReadOnly, |service| async move {
            let findings = service.validate(id).await?;
            let progress = service.progress(id).await?;
            Ok::<_, anyhow::Error>((findings, progress))
        })
        .await?;

        println!("📊 Activity plan report {id}");
        println!("────────────────────────────────────────");
        for category in &progress {
            let percent = category
                .percent_reached()
                .map(|p| format!("{p:.0}%"))
                .unwrap_or_else(|| "n/a".to_string());
            println!(
                "   {:<24} planned {:>8}  reached {:>8}  ({percent})",
                category.category, category.planned, category.reached
            );
        }
        println!();

        if findings.is_empty() {
            println!("✅ No category exceeds its planned target");
            return Ok(());
        }

        println!("⚠️  {} category target(s) exceeded:", findings.len());
        for finding in &findings {
            println!(
                "   📍 location report {}: {} planned {}, reached {} (+{})",
                finding.target_location_report_id,
                finding.category,
                finding.planned,
                finding.reached,
                finding.over_by
            );
        }
        Ok(())
    }
}
