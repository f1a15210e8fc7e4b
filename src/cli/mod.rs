use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;
pub mod dataset;

#[derive(Parser)]
#[command(name = "rh-reports")]
#[command(about = "Project progress reporting: periods, report lifecycle and target checks")]
#[command(long_about = "rh-reports computes reporting periods for humanitarian projects, moves monthly \
                       reports through their review lifecycle and checks reported figures against \
                       planned targets. Mutating commands operate on a JSON dataset file.")]
pub struct Cli {
    /// Extra configuration file layered over the defaults
    #[arg(long, global = true, help = "Path to a TOML configuration file")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the reporting periods between two dates
    Periods {
        /// First day of the project
        #[arg(long, help = "Project start date (YYYY-MM-DD)")]
        start: String,
        /// Last day of the project
        #[arg(long, help = "Project end date (YYYY-MM-DD)")]
        end: String,
        /// Reporting frequency (defaults to the configured one)
        #[arg(long, help = "Reporting frequency: monthly or quarterly")]
        frequency: Option<String>,
        /// Days after a period ends before its report is due
        #[arg(long, help = "Grace days before a report is due (defaults to the configured value)")]
        grace_days: Option<u32>,
    },
    /// Show the status label a report would get
    Status {
        /// Report state
        #[arg(long, help = "Report state: todo, pending, submitted, rejected, completed, archived")]
        state: String,
        /// Date the report was submitted
        #[arg(long, help = "Report submission date (YYYY-MM-DD)")]
        report_date: Option<String>,
        /// Date the report is due
        #[arg(long, help = "Report due date (YYYY-MM-DD)")]
        due_date: Option<String>,
    },
    /// Apply a lifecycle event to a report
    Transition {
        /// Dataset file
        #[arg(long, help = "JSON dataset file (uses the configured database when omitted)")]
        data: Option<PathBuf>,
        /// Report id
        #[arg(long, help = "Id of the monthly report")]
        report: u64,
        /// Event to apply
        #[arg(long, help = "Event: submit, approve, reject, resubmit, archive")]
        event: String,
        /// Acting user
        #[arg(long, help = "Username of the acting user")]
        actor: String,
        /// Roles of the acting user
        #[arg(long = "role", help = "Role held by the acting user (repeatable)")]
        roles: Vec<String>,
        /// Rejection comment
        #[arg(long, help = "Comment stored with a rejection")]
        comment: Option<String>,
        /// Report version the decision was based on
        #[arg(long, help = "Refuse the event if the report is no longer at this version")]
        expect_version: Option<u64>,
    },
    /// Check an activity plan report against its planned targets
    Validate {
        /// Dataset file
        #[arg(long, help = "JSON dataset file (uses the configured database when omitted)")]
        data: Option<PathBuf>,
        /// Activity plan report id
        #[arg(long, help = "Id of the activity plan report to check")]
        plan_report: u64,
    },
    /// Open reports for every period of a project that has started
    Open {
        /// Dataset file
        #[arg(long, help = "JSON dataset file (uses the configured database when omitted)")]
        data: Option<PathBuf>,
        /// Project id
        #[arg(long, help = "Id of the project")]
        project: u64,
        /// Reference date
        #[arg(long, help = "Open periods started by this date (YYYY-MM-DD, defaults to today)")]
        today: Option<String>,
        /// Acting user
        #[arg(long, help = "Username of the acting user")]
        actor: String,
        /// Roles of the acting user
        #[arg(long = "role", help = "Role held by the acting user (repeatable)")]
        roles: Vec<String>,
    },
    /// Copy rows of the latest completed report into a todo report
    Copy {
        /// Dataset file
        #[arg(long, help = "JSON dataset file (uses the configured database when omitted)")]
        data: Option<PathBuf>,
        /// Report id
        #[arg(long, help = "Id of the todo report to fill")]
        report: u64,
        /// Acting user
        #[arg(long, help = "Username of the acting user")]
        actor: String,
        /// Roles of the acting user
        #[arg(long = "role", help = "Role held by the acting user (repeatable)")]
        roles: Vec<String>,
    },
    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Write the default configuration to rh-reports.toml
    Init {
        /// Overwrite an existing file
        #[arg(long, help = "Overwrite an existing configuration file")]
        force: bool,
        /// Destination file
        #[arg(long, default_value = "rh-reports.toml", help = "Where to write the configuration")]
        path: PathBuf,
    },
}
