use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum ExecutorError {
    #[error("Failed to start '{program}': {message}")]
    Spawn { program: String, message: String },

    #[error("Local command error: {0}")]
    LocalError(String),
}
