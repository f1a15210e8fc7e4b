use anyhow::Result;
use clap::Parser;

mod cli;

use cli::commands::config::{InitConfigCommand, ShowConfigCommand};
use cli::commands::copy::CopyReportCommand;
use cli::commands::open::OpenReportsCommand;
use cli::commands::periods::PeriodsCommand;
use cli::commands::status::StatusCommand;
use cli::commands::transition::TransitionReportCommand;
use cli::commands::validate::ValidateCommand;
use cli::commands::Command;
use cli::{Cli, Commands, ConfigAction};
use rh_reports::{init_telemetry, Actor, ReportingConfig};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // .env must be applied before the environment layer of the config is read
    ReportingConfig::load_env_file()?;
    let config = ReportingConfig::load_from(cli.config.as_deref())?;
    init_telemetry(&config.observability)?;

    tokio::runtime::Runtime::new()?.block_on(async {
        match cli.command {
            Commands::Periods {
                start,
                end,
                frequency,
                grace_days,
            } => {
                PeriodsCommand::new(config, start, end)
                    .with_frequency(frequency)
                    .with_grace_days(grace_days)
                    .execute()
                    .await
            }
            Commands::Status {
                state,
                report_date,
                due_date,
            } => {
                StatusCommand::new(state)
                    .with_dates(report_date, due_date)
                    .execute()
                    .await
            }
            Commands::Transition {
                data,
                report,
                event,
                actor,
                roles,
                comment,
                expect_version,
            } => {
                let actor = Actor {
                    username: actor,
                    roles,
                };
                TransitionReportCommand::new(config, report, event, actor)
                    .with_data(data)
                    .with_comment(comment)
                    .with_expected_version(expect_version)
                    .execute()
                    .await
            }
            Commands::Validate { data, plan_report } => {
                ValidateCommand::new(config, data, plan_report).execute().await
            }
            Commands::Open {
                data,
                project,
                today,
                actor,
                roles,
            } => {
                let actor = Actor {
                    username: actor,
                    roles,
                };
                OpenReportsCommand::new(config, data, project, actor)
                    .with_today(today)
                    .execute()
                    .await
            }
            Commands::Copy {
                data,
                report,
                actor,
                roles,
            } => {
                let actor = Actor {
                    username: actor,
                    roles,
                };
                CopyReportCommand::new(config, data, report, actor).execute().await
            }
            Commands::Config { action } => match action {
                ConfigAction::Show => ShowConfigCommand::new(config).execute().await,
                ConfigAction::Init { force, path } => {
                    InitConfigCommand::new(path).with_force(force).execute().await
                }
            },
        }
    })
}
