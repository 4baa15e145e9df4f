use aws_sdk_iam::error::DisplayErrorContext;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AwsError {
    /// An AWS API call was rejected or could not be completed.
    #[error("{operation} failed: {message}")]
    Service {
        operation: &'static str,
        message: String,
    },

    #[error("{bucket} does not exist, or you do not have permission for this bucket: {message}")]
    BucketUnavailable { bucket: String, message: String },

    #[error("{operation} response did not include {field}")]
    MissingField {
        operation: &'static str,
        field: &'static str,
    },

    #[error("Failed to package Lambda starter code: {0}")]
    Packaging(String),

    #[error("Failed to serialize policy document: {0}")]
    Policy(#[from] serde_json::Error),
}

impl AwsError {
    /// Wraps an SDK error, keeping the full chain of error context in the message.
    pub fn service<E>(operation: &'static str, err: E) -> Self
    where
        E: std::error::Error,
    {
        AwsError::Service {
            operation,
            message: DisplayErrorContext(&err).to_string(),
        }
    }

    pub fn missing_field(operation: &'static str, field: &'static str) -> Self {
        AwsError::MissingField { operation, field }
    }
}

pub type AwsResult<T> = Result<T, AwsError>;
