use anyhow::{anyhow, Result};
use rh_reports::{ReportPeriods, ReportingConfig, ReportingFrequency};

use super::{parse_date, Command};

pub struct PeriodsCommand {
    pub start: String,
    pub end: String,
    pub frequency: Option<String>,
    pub grace_days: Option<u32>,
    config: ReportingConfig,
}

impl PeriodsCommand {
    pub fn new(config: ReportingConfig, start: String, end: String) -> Self {
        Self {
            start,
            end,
            frequency: None,
            grace_days: None,
            config,
        }
    }

    pub fn with_frequency(mut self, frequency: Option<String>) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn with_grace_days(mut self, grace_days: Option<u32>) -> Self {
        self.grace_days = grace_days;
        self
    }

    fn periods(&self) -> Result<(ReportingFrequency, ReportPeriods)> {
        let start = parse_date(&self.start)?;
        let end = parse_date(&self.end)?;
        let frequency = match &self.frequency {
            Some(value) => value.parse::<ReportingFrequency>().map_err(|e| anyhow!(e))?,
            None => self.config.reporting.default_frequency,
        };
        let grace_days = self.grace_days.unwrap_or(self.config.reporting.grace_days);
        Ok((frequency, ReportPeriods::new(start, end, frequency, grace_days)?))
    }
}

impl Command for PeriodsCommand {
    async fn execute(&self) -> Result<()> {
        let (frequency, periods) = self.periods()?;

        println!("📅 {} {} reporting period(s)", periods.len(), frequency);
        println!("────────────────────────────────────────");
        for (i, period) in periods.iter().enumerate() {
            println!(
                "{:>3}. {} → {}   due {}",
                i + 1,
                period.start,
                period.end,
                period.due_date
            );
        }
        Ok(())
    }
}
