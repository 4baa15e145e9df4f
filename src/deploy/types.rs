use crate::config::{ConfigError, Secret};
use crate::executor::ExecutorError;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub const DOCTL: &str = "doctl";
pub const DOCKER: &str = "docker";
pub const REQUIRED_EXECUTABLES: &[&str] = &[DOCTL, DOCKER];

pub const DO_TOKEN_VAR: &str = "DO_TOKEN";
pub const BUILD_CONTEXT_VAR: &str = "BUILD_CONTEXT";
pub const DOCKERFILE_VAR: &str = "DOCKERFILE";
pub const REPOSITORY_VAR: &str = "REPOSITORY";
pub const IMAGE_TAG_VAR: &str = "IMAGE_TAG";

/// Checked in this order; the first unset one is reported.
pub const REQUIRED_ENV_VARS: &[&str] = &[
    DO_TOKEN_VAR,
    BUILD_CONTEXT_VAR,
    DOCKERFILE_VAR,
    REPOSITORY_VAR,
    IMAGE_TAG_VAR,
];

#[derive(Debug, Clone)]
pub struct DeployConfig {
    /// DigitalOcean API token handed to `doctl auth init`
    pub token: Secret,
    /// Directory sent to `docker build` as the build context
    pub build_context: PathBuf,
    pub dockerfile: PathBuf,
    /// Registry repository, e.g. `registry.digitalocean.com/team/app`
    pub repository: String,
    pub image_tag: String,
}

impl DeployConfig {
    /// `<repository>:<tag>`
    pub fn image_ref(&self) -> String {
        format!("{}:{}", self.repository, self.image_tag)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("Required executable '{0}' was not found on PATH")]
    MissingDependency(String),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{step} failed: '{command}' exited with code {code}: {message}")]
    CommandFailed {
        step: &'static str,
        command: String,
        code: i32,
        message: String,
    },

    #[error("Push rejected by registry: {0}")]
    PushRejected(String),

    #[error("Executor error: {0}")]
    Executor(#[from] ExecutorError),
}

impl DeployError {
    /// Problems the user can fix locally, as opposed to tool or registry failures.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            DeployError::MissingDependency(_) | DeployError::MissingEnvVar(_) | DeployError::Config(_)
        )
    }
}

pub type DeployResult<T> = Result<T, DeployError>;

#[derive(Debug, Clone)]
pub struct DeploySummary {
    pub image: String,
    pub push_messages: Vec<String>,
    pub duration: Duration,
}

#[derive(Debug, Clone)]
pub enum DeployerEvent {
    StepStarted(String),
    StepCompleted(String),
    StepFailed(String, String),
    PushProgress(String),
}

impl fmt::Display for DeployerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeployerEvent::StepStarted(msg) => write!(f, "Started: {}", msg),
            DeployerEvent::StepCompleted(msg) => write!(f, "Completed: {}", msg),
            DeployerEvent::StepFailed(step, err) => write!(f, "Failed: {} - {}", step, err),
            DeployerEvent::PushProgress(msg) => write!(f, "Push: {}", msg),
        }
    }
}
