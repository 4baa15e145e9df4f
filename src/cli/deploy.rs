use super::error::CliError;
use super::parser::VERSION_INFO;
use super::ui::{self, handle_deployer_events};
use crate::config::DEFAULT_ENV_PATH;
use crate::deploy::{Deployer, DeployerEvent, Preflight};
use crate::executor::LocalCommandExecutor;
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{info, instrument};

#[derive(Parser, Debug)]
#[command(name = "shiperate-deploy")]
#[command(about = "Build a Docker image and push it to the DigitalOcean container registry", long_about = None, version = VERSION_INFO)]
pub struct DeployCli {
    /// Environment file with DO_TOKEN, BUILD_CONTEXT, DOCKERFILE, REPOSITORY and IMAGE_TAG
    #[arg(short = 'e', long = "env-file", default_value = DEFAULT_ENV_PATH)]
    pub env_file: PathBuf,

    /// Increase message verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Disable interactive progress spinner and show only logs
    #[arg(long)]
    pub no_progress: bool,
}

impl DeployCli {
    #[instrument(name = "deploy", skip_all)]
    pub async fn run(&self) -> Result<(), CliError> {
        let preflight = Preflight::from_env_file(&self.env_file)?;

        let (progress_sender, ui_update_task_handle) = if !self.no_progress {
            let (sender, receiver) = mpsc::channel::<DeployerEvent>(32);
            let pb = ui::create_spinner("Starting deploy...");
            let ui_task = tokio::spawn(handle_deployer_events(receiver, pb.clone()));
            (Some(sender), Some((ui_task, pb)))
        } else {
            info!("Progress spinner disabled via --no-progress.");
            (None, None)
        };

        let mut executor = LocalCommandExecutor::new();
        let mut deployer = Deployer::new(&mut executor, progress_sender);
        let deploy_result = deployer.deploy(&preflight).await;

        // Closes the channel so the UI task can finish.
        drop(deployer);

        if let Some((ui_task, pb)) = ui_update_task_handle {
            if let Err(e) = ui_task.await {
                tracing::error!("UI update task failed: {}", e);
            }
            match &deploy_result {
                Ok(_) => pb.finish_with_message("✅ Deploy finished."),
                Err(_) => pb.finish_with_message("❌ Deploy failed"),
            }
        }

        let summary = deploy_result?;
        info!(
            "{} in {:.1?}",
            ui::format_success(&format!("Pushed {}", summary.image)),
            summary.duration
        );
        println!("{}", summary.image);
        Ok(())
    }
}
