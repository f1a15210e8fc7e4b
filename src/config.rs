use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::access::{Capability, RoleCapabilities};
use crate::domain::{ReportingFrequency, DEFAULT_GRACE_DAYS};

/// Main configuration structure for rh-reports
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ReportingConfig {
    /// Reporting calendar settings
    pub reporting: ReportingSettings,
    /// Observability settings
    pub observability: ObservabilityConfig,
    /// Role to capability mapping
    pub access: AccessConfig,
    /// Database settings (optional)
    pub database: Option<DatabaseConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ReportingSettings {
    /// Days after a period ends before its report is due
    pub grace_days: u32,
    /// Frequency used when a caller does not pick one
    pub default_frequency: ReportingFrequency,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level
    pub log_level: String,
    /// Emit JSON log lines instead of human-readable ones
    pub json_logs: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AccessConfig {
    pub roles: HashMap<String, Vec<Capability>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Database URL (SQLite file path or connection string)
    pub url: String,
    /// Maximum connections in pool
    pub max_connections: u32,
    /// Enable automatic migrations
    pub auto_migrate: bool,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            reporting: ReportingSettings {
                grace_days: DEFAULT_GRACE_DAYS,
                default_frequency: ReportingFrequency::Monthly,
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                json_logs: true,
            },
            access: AccessConfig {
                roles: HashMap::from([
                    (
                        "cluster_lead".to_string(),
                        vec![Capability::ApproveReports, Capability::ManageReports],
                    ),
                    ("admin".to_string(), vec![Capability::ApproveReports, Capability::ManageReports]),
                    ("project_manager".to_string(), vec![Capability::ManageReports]),
                ]),
            },
            database: None,
        }
    }
}

impl ReportingConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration files (rh-reports.toml, .rh-reports-rc)
    /// 3. Environment variables (prefixed with RH_REPORTS, `__` between keys)
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Same as [`ReportingConfig::load`] with an extra file on top of the defaults.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let defaults = Config::try_from(&ReportingConfig::default())
            .context("Failed to serialize default configuration")?;
        let mut builder = Config::builder().add_source(defaults);

        if Path::new("rh-reports.toml").exists() {
            builder = builder.add_source(File::with_name("rh-reports"));
        }

        if Path::new(".rh-reports-rc").exists() {
            builder = builder.add_source(File::with_name(".rh-reports-rc").format(config::FileFormat::Toml));
        }

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        // Override with environment variables
        builder = builder.add_source(
            Environment::with_prefix("RH_REPORTS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;
        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }

    pub fn capabilities(&self) -> RoleCapabilities {
        RoleCapabilities::new(self.access.roles.clone())
    }
}
