use crate::aws::{AwsError, ValidationError};
use crate::config::ConfigError;
use crate::deploy::DeployError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid arguments: {0}")]
    Validation(#[from] ValidationError),

    #[error("AWS request failed: {0}")]
    Aws(#[from] AwsError),

    #[error("Deploy failed: {0}")]
    Deploy(#[from] DeployError),

    #[error("Operation failed: {0}")]
    OperationFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// `2` for problems the user can fix locally, `1` for failures outside our control.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) | CliError::Validation(_) => 2,
            CliError::Deploy(e) if e.is_user_error() => 2,
            _ => 1,
        }
    }
}
