mod auth;
mod bundle;
mod cli;
mod config;
mod da;
mod error;
mod logging;
mod orchestrator;
mod resources;
mod state_machine;
mod transport;
mod ui;

use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use tracing::{error, info};

use auth::Authenticator;
use bundle::BundlePackager;
use cli::{Cli, Command};
use config::AppConfig;
use da::DaClient;
use error::DeployError;
use orchestrator::WorkItemOrchestrator;
use resources::{ResourceManager, ResourcePlan};
use ui::PollProgress;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let Some(command) = cli.command else {
        let _ = Cli::command().print_help();
        eprintln!();
        return ExitCode::FAILURE;
    };

    logging::init(cli.verbose);

    match run(command, cli.config.as_deref()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = ?e, "command failed");
            ui::failure(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, config_path: Option<&Path>) -> Result<()> {
    let config = AppConfig::load(config_path)?;
    let credentials = config.credentials()?;

    let http = transport::build_client(&config.http).map_err(DeployError::from)?;
    let authenticator = Authenticator::from_config(&config, &http).map_err(DeployError::from)?;
    let token = authenticator
        .authenticate(&credentials)
        .await
        .map_err(DeployError::from)?;

    let client = DaClient::new(http, &config.base_url, &config.region, token);
    let plan = ResourcePlan::from_config(&config);

    match command {
        Command::Setup => {
            let archive = BundlePackager::from_config(&config.app_bundle)
                .package()
                .map_err(DeployError::from)?;
            ResourceManager::new(&client, &plan).setup(archive).await?;
            ui::success(&format!(
                "{} and {} are ready",
                plan.bundle.id, plan.activity.id
            ));
        }
        Command::Execute {
            input_url,
            output_url,
        } => {
            let activity_id = plan.work_item_activity_id();
            let progress = PollProgress::start(&activity_id);
            let orchestrator = WorkItemOrchestrator::new(&client, config.poll_config());

            let outcome = match orchestrator
                .submit(&activity_id, &input_url, &output_url, &progress)
                .await
            {
                Ok(outcome) => outcome,
                Err(e) => {
                    progress.abandon();
                    return Err(DeployError::step("submit work item")(e).into());
                }
            };

            progress.finish(&outcome);
            ui::print_outcome(&outcome);

            if !outcome.is_success() {
                return Err(DeployError::WorkItem {
                    work_item_id: outcome.work_item_id,
                    outcome: outcome.outcome.to_string(),
                }
                .into());
            }
        }
        Command::List => {
            let inventory = ResourceManager::new(&client, &plan).inventory().await?;
            ui::print_inventory(&inventory, &plan.bundle.id, &plan.activity.id);
        }
        Command::Cleanup => {
            let report = ResourceManager::new(&client, &plan).cleanup().await?;
            info!(
                deleted = report.deleted.len(),
                absent = report.absent.len(),
                "cleanup finished"
            );
            ui::success("cleanup finished");
        }
    }

    Ok(())
}
