use super::aws;
use crate::config::DEFAULT_ENV_PATH;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

pub(crate) const VERSION_INFO: &str = env!("SHIPERATE_BUILD_VERSION");

#[derive(Parser, Debug)]
#[command(name = "shiperate")]
#[command(about = "Provision AWS resources for student software teams", long_about = None, version = VERSION_INFO)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Environment file holding AWS credentials
    #[arg(short = 'e', long = "env-file", default_value = DEFAULT_ENV_PATH, global = true)]
    pub env_file: PathBuf,

    /// Increase message verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create and manage AWS resources
    Aws(aws::Aws),
}
