use super::names;
use crate::config::Secret;
use clap::ValueEnum;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum S3Operation {
    #[value(name = "create-bucket")]
    CreateBucket,
    #[value(name = "delete-bucket")]
    DeleteBucket,
    #[value(name = "list-bucket")]
    ListBucket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IamOperation {
    #[value(name = "create-role")]
    CreateRole,
    #[value(name = "create-lambda-execution-role")]
    CreateLambdaExecutionRole,
    #[value(name = "add-s3-permissions")]
    AddS3Permissions,
    #[value(name = "add-lambda-permissions")]
    AddLambdaPermissions,
    #[value(name = "add-sqs-permissions")]
    AddSqsPermissions,
    #[value(name = "create-user")]
    CreateUser,
    #[value(name = "create-account")]
    CreateAccount,
    #[value(name = "attach_role_to_user_iam")]
    AttachRoleToUser,
    #[value(name = "update-role-policy")]
    UpdateRolePolicy,
    #[value(name = "list-user-policies")]
    ListUserPolicies,
    #[value(name = "detach-user-policy")]
    DetachUserPolicy,
    #[value(name = "delete-policy")]
    DeletePolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LambdaOperation {
    #[value(name = "create-function")]
    CreateFunction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SqsOperation {
    #[value(name = "create-queue")]
    CreateQueue,
}

/// A requested operation, keyed by resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    S3(S3Operation),
    Iam(IamOperation),
    Lambda(LambdaOperation),
    Sqs(SqsOperation),
}

impl Operation {
    pub fn resource(&self) -> &'static str {
        match self {
            Operation::S3(_) => "s3",
            Operation::Iam(_) => "iam",
            Operation::Lambda(_) => "lambda",
            Operation::Sqs(_) => "sqs",
        }
    }

    pub fn name(&self) -> String {
        let value = match self {
            Operation::S3(op) => op.to_possible_value(),
            Operation::Iam(op) => op.to_possible_value(),
            Operation::Lambda(op) => op.to_possible_value(),
            Operation::Sqs(op) => op.to_possible_value(),
        };
        value
            .map(|v| v.get_name().to_string())
            .unwrap_or_default()
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.resource(), self.name())
    }
}

/// Command-line flags as parsed, before any operation-specific checks.
#[derive(Debug, Clone, Default)]
pub struct Flags {
    pub bucket_name: Option<String>,
    pub role_name: Option<String>,
    pub function_name: Option<String>,
    pub queue_name: Option<String>,
    pub password: Option<Secret>,
    pub policy_arn: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    BucketName,
    RoleName,
    FunctionName,
    QueueName,
    Password,
    PolicyArn,
}

impl Flag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Flag::BucketName => "--bucket-name",
            Flag::RoleName => "--role-name",
            Flag::FunctionName => "--function-name",
            Flag::QueueName => "--queue-name",
            Flag::Password => "--password",
            Flag::PolicyArn => "--policy-arn",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{operation} requires {}", .missing.iter().map(Flag::as_str).collect::<Vec<_>>().join(", "))]
    MissingFlags {
        operation: String,
        missing: Vec<Flag>,
    },

    #[error("Unknown team '{name}', expected one of: {}", .teams.join(", "))]
    UnknownTeam { name: String, teams: Vec<String> },

    #[error("Invalid {} '{value}': {reason}", .flag.as_str())]
    InvalidName {
        flag: Flag,
        value: String,
        reason: &'static str,
    },
}

/// One fully validated cloud operation, carrying exactly the fields it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    ListBuckets,
    CreateBucket { bucket_name: String },
    DeleteBucket { bucket_name: String },
    CreateRole { role_name: String },
    CreateLambdaExecutionRole { role_name: String },
    UpdateRolePolicy { role_name: String },
    AddS3Permissions { role_name: String, bucket_name: String },
    AddLambdaPermissions { role_name: String, function_name: String },
    AddSqsPermissions { role_name: String, queue_name: String },
    AttachRoleToUser { role_name: String },
    CreateUser { role_name: String },
    CreateAccount { role_name: String, password: Secret },
    ListUserPolicies { role_name: String },
    DetachUserPolicy { role_name: String, policy_arn: String },
    DeletePolicy { policy_arn: String },
    CreateFunction { function_name: String, role_name: String },
    CreateQueue { queue_name: String },
}

/// Collects every missing flag so the user sees them all at once.
struct Required<'a> {
    flags: &'a Flags,
    missing: Vec<Flag>,
}

impl<'a> Required<'a> {
    fn new(flags: &'a Flags) -> Self {
        Self {
            flags,
            missing: Vec::new(),
        }
    }

    fn take(&mut self, flag: Flag) -> String {
        let value = match flag {
            Flag::BucketName => self.flags.bucket_name.as_deref(),
            Flag::RoleName => self.flags.role_name.as_deref(),
            Flag::FunctionName => self.flags.function_name.as_deref(),
            Flag::QueueName => self.flags.queue_name.as_deref(),
            Flag::Password => self.flags.password.as_ref().map(Secret::expose),
            Flag::PolicyArn => self.flags.policy_arn.as_deref(),
        };
        match value {
            Some(v) if !v.trim().is_empty() => v.to_string(),
            _ => {
                self.missing.push(flag);
                String::new()
            }
        }
    }

    fn finish(self, operation: Operation) -> Result<(), ValidationError> {
        if self.missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::MissingFlags {
                operation: operation.to_string(),
                missing: self.missing,
            })
        }
    }
}

impl Action {
    /// Checks that `flags` satisfy `operation` and builds the matching action.
    ///
    /// Nothing here talks to AWS; a returned error means no call will be made.
    pub fn validate(
        operation: Operation,
        flags: &Flags,
        teams: &[String],
    ) -> Result<Action, ValidationError> {
        let mut req = Required::new(flags);

        let action = match operation {
            Operation::S3(op) => match op {
                S3Operation::ListBucket => Action::ListBuckets,
                S3Operation::CreateBucket => Action::CreateBucket {
                    bucket_name: req.take(Flag::BucketName),
                },
                S3Operation::DeleteBucket => Action::DeleteBucket {
                    bucket_name: req.take(Flag::BucketName),
                },
            },
            Operation::Iam(op) => match op {
                IamOperation::CreateRole => Action::CreateRole {
                    role_name: req.take(Flag::RoleName),
                },
                IamOperation::CreateLambdaExecutionRole => Action::CreateLambdaExecutionRole {
                    role_name: req.take(Flag::RoleName),
                },
                IamOperation::UpdateRolePolicy => Action::UpdateRolePolicy {
                    role_name: req.take(Flag::RoleName),
                },
                IamOperation::AddS3Permissions => Action::AddS3Permissions {
                    role_name: req.take(Flag::RoleName),
                    bucket_name: req.take(Flag::BucketName),
                },
                IamOperation::AddLambdaPermissions => Action::AddLambdaPermissions {
                    role_name: req.take(Flag::RoleName),
                    function_name: req.take(Flag::FunctionName),
                },
                IamOperation::AddSqsPermissions => Action::AddSqsPermissions {
                    role_name: req.take(Flag::RoleName),
                    queue_name: req.take(Flag::QueueName),
                },
                IamOperation::AttachRoleToUser => Action::AttachRoleToUser {
                    role_name: req.take(Flag::RoleName),
                },
                IamOperation::CreateUser => Action::CreateUser {
                    role_name: req.take(Flag::RoleName),
                },
                IamOperation::CreateAccount => Action::CreateAccount {
                    role_name: req.take(Flag::RoleName),
                    password: Secret::new(req.take(Flag::Password)),
                },
                IamOperation::ListUserPolicies => Action::ListUserPolicies {
                    role_name: req.take(Flag::RoleName),
                },
                IamOperation::DetachUserPolicy => Action::DetachUserPolicy {
                    role_name: req.take(Flag::RoleName),
                    policy_arn: req.take(Flag::PolicyArn),
                },
                IamOperation::DeletePolicy => Action::DeletePolicy {
                    policy_arn: req.take(Flag::PolicyArn),
                },
            },
            Operation::Lambda(LambdaOperation::CreateFunction) => Action::CreateFunction {
                function_name: req.take(Flag::FunctionName),
                role_name: req.take(Flag::RoleName),
            },
            Operation::Sqs(SqsOperation::CreateQueue) => Action::CreateQueue {
                queue_name: req.take(Flag::QueueName),
            },
        };

        req.finish(operation)?;
        action.check_values(teams)?;
        Ok(action)
    }

    pub fn role_name(&self) -> Option<&str> {
        match self {
            Action::CreateRole { role_name }
            | Action::CreateLambdaExecutionRole { role_name }
            | Action::UpdateRolePolicy { role_name }
            | Action::AddS3Permissions { role_name, .. }
            | Action::AddLambdaPermissions { role_name, .. }
            | Action::AddSqsPermissions { role_name, .. }
            | Action::AttachRoleToUser { role_name }
            | Action::CreateUser { role_name }
            | Action::CreateAccount { role_name, .. }
            | Action::ListUserPolicies { role_name }
            | Action::DetachUserPolicy { role_name, .. }
            | Action::CreateFunction { role_name, .. } => Some(role_name),
            Action::ListBuckets
            | Action::CreateBucket { .. }
            | Action::DeleteBucket { .. }
            | Action::DeletePolicy { .. }
            | Action::CreateQueue { .. } => None,
        }
    }

    pub fn bucket_name(&self) -> Option<&str> {
        match self {
            Action::CreateBucket { bucket_name }
            | Action::DeleteBucket { bucket_name }
            | Action::AddS3Permissions { bucket_name, .. } => Some(bucket_name),
            _ => None,
        }
    }

    pub fn function_name(&self) -> Option<&str> {
        match self {
            Action::AddLambdaPermissions { function_name, .. }
            | Action::CreateFunction { function_name, .. } => Some(function_name),
            _ => None,
        }
    }

    pub fn queue_name(&self) -> Option<&str> {
        match self {
            Action::AddSqsPermissions { queue_name, .. } | Action::CreateQueue { queue_name } => {
                Some(queue_name)
            }
            _ => None,
        }
    }

    /// Whether the action removes something that cannot be recovered.
    pub fn is_destructive(&self) -> bool {
        matches!(
            self,
            Action::DeleteBucket { .. } | Action::DeletePolicy { .. }
        )
    }

    fn check_values(&self, teams: &[String]) -> Result<(), ValidationError> {
        if let Some(role_name) = self.role_name() {
            if !teams.iter().any(|team| team == role_name) {
                return Err(ValidationError::UnknownTeam {
                    name: role_name.to_string(),
                    teams: teams.to_vec(),
                });
            }
        }

        // Existing buckets may predate the current naming rules.
        let new_bucket = match self {
            Action::CreateBucket { bucket_name } => Some(bucket_name.as_str()),
            _ => None,
        };
        let checks: [(Flag, Option<&str>, fn(&str) -> Result<(), &'static str>); 3] = [
            (Flag::BucketName, new_bucket, names::check_bucket_name),
            (
                Flag::FunctionName,
                self.function_name(),
                names::check_function_name,
            ),
            (Flag::QueueName, self.queue_name(), names::check_queue_name),
        ];
        for (flag, value, check) in checks {
            if let Some(value) = value {
                check(value).map_err(|reason| ValidationError::InvalidName {
                    flag,
                    value: value.to_string(),
                    reason,
                })?;
            }
        }
        Ok(())
    }
}
