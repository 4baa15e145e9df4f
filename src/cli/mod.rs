mod aws;
mod deploy;
pub mod error;
pub mod parser;
mod ui;

use clap::{CommandFactory, Parser};
pub use deploy::DeployCli;
use error::CliError;
use parser::Cli;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV_VAR: &str = "SHIPERATE_LOG";

// Helper function to parse args
pub fn parse_args() -> Cli {
    Cli::parse()
}

pub fn parse_deploy_args() -> DeployCli {
    DeployCli::parse()
}

/// Logs go to stderr so stdout only carries command output.
///
/// With a spinner on screen INFO lines are hidden unless `-v` is given.
pub fn init_tracing(verbose: u8, progress_active: bool) {
    let default_level = match verbose {
        0 if progress_active => LevelFilter::WARN,
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .with_env_var(LOG_ENV_VAR)
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

// Main CLI execution function, receives parsed args
pub async fn run(cli: Cli) -> Result<(), CliError> {
    match &cli.command {
        Some(parser::Commands::Aws(cmd)) => cmd.run(&cli).await,
        None => print_help(&[]),
    }
}

/// Prints help for the subcommand at `path`, e.g. `["aws", "s3"]`.
pub(crate) fn print_help(path: &[&str]) -> Result<(), CliError> {
    let mut cmd = Cli::command();
    cmd.build();
    let mut current = &mut cmd;
    for name in path {
        current = current
            .find_subcommand_mut(name)
            .ok_or_else(|| CliError::OperationFailed(format!("No help for '{}'", name)))?;
    }
    current.print_help()?;
    Ok(())
}
