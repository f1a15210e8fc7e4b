use anyhow::{bail, Result};
use std::path::PathBuf;

use rh_reports::ReportingConfig;

use super::Command;

pub struct ShowConfigCommand {
    config: ReportingConfig,
}

impl ShowConfigCommand {
    pub fn new(config: ReportingConfig) -> Self {
        Self { config }
    }
}

impl Command for ShowConfigCommand {
    async fn execute(&self) -> Result<()> {
        print!("{}", toml::to_string_pretty(&self.config)?);
        Ok(())
    }
}

pub struct InitConfigCommand {
    pub path: PathBuf,
    pub force: bool,
}

impl InitConfigCommand {
    pub fn new(path: PathBuf) -> Self {
        Self { path, force: false }
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}

impl Command for InitConfigCommand {
    async fn execute(&self) -> Result<()> {
        if self.path.exists() && !self.force {
            bail!(
                "{} already exists. Use --force to overwrite it.",
                self.path.display()
            );
        }

        ReportingConfig::default().save_to_file(&self.path)?;
        println!("⚙️  Wrote default configuration to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rh-reports.toml");
        std::fs::write(&path, "# existing\n").unwrap();

        let result = tokio_test::block_on(InitConfigCommand::new(path.clone()).execute());
        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# existing\n");

        tokio_test::block_on(InitConfigCommand::new(path.clone()).with_force(true).execute()).unwrap();
        let written = ReportingConfig::load_from(Some(&path)).unwrap();
        assert_eq!(written.reporting.grace_days, 7);
    }
}
