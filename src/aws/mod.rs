pub mod action;
pub mod client;
pub mod error;
pub mod lambda_package;
mod names;
pub mod policy;
pub mod provisioner;

pub use action::{Action, Flags, Operation, ValidationError};
pub use client::AwsClient;
pub use error::{AwsError, AwsResult};
pub use provisioner::{dispatch, ProvisionOutput, Provisioner};
