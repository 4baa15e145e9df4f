use super::error::CliError;
use super::parser::Cli;
use super::{print_help, ui};
use crate::aws::action::{IamOperation, LambdaOperation, S3Operation, SqsOperation};
use crate::aws::{dispatch, Action, AwsClient, Flags, Operation};
use crate::config::{Secret, ShiperateConfig};
use clap::{Args, Subcommand};
use dialoguer::Confirm;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Args)]
pub struct Aws {
    #[command(subcommand)]
    pub resource: Option<Resource>,
}

#[derive(Debug, Subcommand)]
pub enum Resource {
    /// Create, delete and list S3 buckets
    S3(S3Args),

    /// Manage team roles, users and their permissions
    Iam(IamArgs),

    /// Create Lambda functions
    Lambda(LambdaArgs),

    /// Create SQS queues
    Sqs(SqsArgs),

    #[command(external_subcommand)]
    External(Vec<String>),
}

#[derive(Debug, Args)]
pub struct S3Args {
    #[arg(long, value_enum)]
    pub operation: Option<S3Operation>,

    /// Name of the bucket
    #[arg(long)]
    pub bucket_name: Option<String>,

    /// Skip the confirmation prompt for destructive operations
    #[arg(short = 'y', long)]
    pub yes: bool,
}

#[derive(Debug, Args)]
pub struct IamArgs {
    #[arg(long, value_enum)]
    pub operation: Option<IamOperation>,

    /// Team name; roles and users are named after the team
    #[arg(long)]
    pub role_name: Option<String>,

    /// Bucket to grant access to (add-s3-permissions)
    #[arg(long)]
    pub bucket_name: Option<String>,

    /// Function to grant access to (add-lambda-permissions)
    #[arg(long)]
    pub function_name: Option<String>,

    /// Queue to grant access to (add-sqs-permissions)
    #[arg(long)]
    pub queue_name: Option<String>,

    /// Console password for the team user (create-account)
    #[arg(long)]
    pub password: Option<String>,

    /// ARN of a managed policy (detach-user-policy, delete-policy)
    #[arg(long)]
    pub policy_arn: Option<String>,

    /// Skip the confirmation prompt for destructive operations
    #[arg(short = 'y', long)]
    pub yes: bool,
}

#[derive(Debug, Args)]
pub struct LambdaArgs {
    #[arg(long, value_enum)]
    pub operation: Option<LambdaOperation>,

    #[arg(long)]
    pub function_name: Option<String>,

    /// Team whose execution role the function runs as
    #[arg(long)]
    pub role_name: Option<String>,
}

#[derive(Debug, Args)]
pub struct SqsArgs {
    #[arg(long, value_enum)]
    pub operation: Option<SqsOperation>,

    #[arg(long)]
    pub queue_name: Option<String>,
}

/// A resolved command line: the operation, its raw flags and whether to skip prompts.
#[derive(Debug)]
pub(crate) struct Request {
    pub operation: Operation,
    pub flags: Flags,
    pub assume_yes: bool,
}

impl Resource {
    fn name(&self) -> Option<&'static str> {
        match self {
            Resource::S3(_) => Some("s3"),
            Resource::Iam(_) => Some("iam"),
            Resource::Lambda(_) => Some("lambda"),
            Resource::Sqs(_) => Some("sqs"),
            Resource::External(_) => None,
        }
    }

    /// `None` when no operation was given.
    pub(crate) fn request(&self) -> Option<Request> {
        match self {
            Resource::S3(args) => Some(Request {
                operation: Operation::S3(args.operation?),
                flags: Flags {
                    bucket_name: args.bucket_name.clone(),
                    ..Default::default()
                },
                assume_yes: args.yes,
            }),
            Resource::Iam(args) => Some(Request {
                operation: Operation::Iam(args.operation?),
                flags: Flags {
                    bucket_name: args.bucket_name.clone(),
                    role_name: args.role_name.clone(),
                    function_name: args.function_name.clone(),
                    queue_name: args.queue_name.clone(),
                    password: args.password.clone().map(Secret::new),
                    policy_arn: args.policy_arn.clone(),
                },
                assume_yes: args.yes,
            }),
            Resource::Lambda(args) => Some(Request {
                operation: Operation::Lambda(args.operation?),
                flags: Flags {
                    function_name: args.function_name.clone(),
                    role_name: args.role_name.clone(),
                    ..Default::default()
                },
                assume_yes: false,
            }),
            Resource::Sqs(args) => Some(Request {
                operation: Operation::Sqs(args.operation?),
                flags: Flags {
                    queue_name: args.queue_name.clone(),
                    ..Default::default()
                },
                assume_yes: false,
            }),
            Resource::External(_) => None,
        }
    }
}

impl Aws {
    #[instrument(name = "aws", skip_all)]
    pub async fn run(&self, cli: &Cli) -> Result<(), CliError> {
        let resource = match &self.resource {
            Some(resource) => resource,
            None => return print_help(&["aws"]),
        };
        let request = match (resource.name(), resource.request()) {
            (Some(_), Some(request)) => request,
            (Some(name), None) => {
                debug!("No operation given for {}", name);
                return print_help(&["aws", name]);
            }
            (None, _) => {
                if let Resource::External(args) = resource {
                    warn!("Unknown resource type: {}", args.join(" "));
                }
                return print_help(&["aws"]);
            }
        };

        let config = ShiperateConfig::load(&cli.env_file)?;
        let action = Action::validate(request.operation, &request.flags, config.teams())?;
        info!(
            "Running {}",
            ui::format_highlight(&request.operation.to_string())
        );

        if action.is_destructive() && !request.assume_yes && !confirm(&action)? {
            info!("Cancelled by user.");
            return Ok(());
        }

        let client = AwsClient::connect(&config).await?;
        let output = dispatch(&action, &client).await?;
        ui::print_output(&request.operation, &output);
        Ok(())
    }
}

fn confirm(action: &Action) -> Result<bool, CliError> {
    let prompt = match action {
        Action::DeleteBucket { bucket_name } => format!(
            "Delete bucket {}? This cannot be undone",
            ui::format_highlight(bucket_name)
        ),
        Action::DeletePolicy { policy_arn } => format!(
            "Delete policy {}? This cannot be undone",
            ui::format_highlight(policy_arn)
        ),
        _ => return Ok(true),
    };
    Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| CliError::OperationFailed(format!("Failed to get confirmation: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::provisioner::tests::RecordingProvisioner;
    use crate::aws::ValidationError;
    use crate::config::FALL_2025_SW_TEAMS;
    use crate::cli::parser::Commands;
    use clap::Parser;

    fn teams() -> Vec<String> {
        FALL_2025_SW_TEAMS.iter().map(|t| t.to_string()).collect()
    }

    fn resource(args: &[&str]) -> Resource {
        let cli = Cli::try_parse_from(std::iter::once("shiperate").chain(args.iter().copied()))
            .unwrap();
        match cli.command {
            Some(Commands::Aws(aws)) => aws.resource.unwrap(),
            None => panic!("no command parsed"),
        }
    }

    async fn run_with(
        args: &[&str],
        provisioner: &RecordingProvisioner,
    ) -> Result<(), CliError> {
        let request = resource(args).request().unwrap();
        let action = Action::validate(request.operation, &request.flags, &teams())?;
        dispatch(&action, provisioner).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_create_bucket_calls_executor_once() {
        let provisioner = RecordingProvisioner::default();
        run_with(
            &["aws", "s3", "--operation", "create-bucket", "--bucket-name", "demo-bucket"],
            &provisioner,
        )
        .await
        .unwrap();

        assert_eq!(
            provisioner.calls(),
            vec![("create_bucket", vec!["demo-bucket".to_string()])]
        );
    }

    #[tokio::test]
    async fn test_create_account_without_role_makes_no_calls() {
        let provisioner = RecordingProvisioner::default();
        let err = run_with(
            &["aws", "iam", "--operation", "create-account", "--password", "hunter2!"],
            &provisioner,
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            CliError::Validation(ValidationError::MissingFlags { .. })
        ));
        assert_eq!(err.exit_code(), 2);
        assert!(provisioner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_create_account_passes_password_through() {
        let provisioner = RecordingProvisioner::default();
        run_with(
            &[
                "aws",
                "iam",
                "--operation",
                "create-account",
                "--role-name",
                "Karp",
                "--password",
                "hunter2!",
            ],
            &provisioner,
        )
        .await
        .unwrap();

        assert_eq!(
            provisioner.calls(),
            vec![(
                "create_login_profile",
                vec!["Karp".to_string(), "hunter2!".to_string()]
            )]
        );
    }

    #[tokio::test]
    async fn test_create_function_uses_team_role() {
        let provisioner = RecordingProvisioner::default();
        run_with(
            &[
                "aws",
                "lambda",
                "--operation",
                "create-function",
                "--function-name",
                "karp-ingest",
                "--role-name",
                "Karp",
            ],
            &provisioner,
        )
        .await
        .unwrap();

        assert_eq!(
            provisioner.calls(),
            vec![(
                "create_function",
                vec!["karp-ingest".to_string(), "Karp".to_string()]
            )]
        );
    }

    #[tokio::test]
    async fn test_unknown_team_makes_no_calls() {
        let provisioner = RecordingProvisioner::default();
        let err = run_with(
            &["aws", "iam", "--operation", "create-role", "--role-name", "Nope"],
            &provisioner,
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            CliError::Validation(ValidationError::UnknownTeam { .. })
        ));
        assert!(provisioner.calls().is_empty());
    }

    #[test]
    fn test_missing_operation_has_no_request() {
        assert!(resource(&["aws", "sqs", "--queue-name", "jobs"])
            .request()
            .is_none());
    }

    #[test]
    fn test_unknown_resource_is_captured() {
        match resource(&["aws", "ec2", "--operation", "run-instances"]) {
            Resource::External(args) => assert_eq!(args[0], "ec2"),
            other => panic!("unexpected resource: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_operation_is_a_parse_error() {
        let result = Cli::try_parse_from(["shiperate", "aws", "s3", "--operation", "rename-bucket"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_yes_flag_and_legacy_operation_name() {
        let request = resource(&[
            "aws",
            "s3",
            "--operation",
            "delete-bucket",
            "--bucket-name",
            "demo-bucket",
            "-y",
        ])
        .request()
        .unwrap();
        assert!(request.assume_yes);

        let request = resource(&["aws", "iam", "--operation", "attach_role_to_user_iam", "--role-name", "Prisere"])
            .request()
            .unwrap();
        assert_eq!(
            request.operation,
            Operation::Iam(IamOperation::AttachRoleToUser)
        );
    }

    #[test]
    fn test_env_file_flag_is_global() {
        let cli = Cli::try_parse_from([
            "shiperate",
            "aws",
            "s3",
            "--operation",
            "list-bucket",
            "--env-file",
            "/tmp/team.env",
        ])
        .unwrap();
        assert_eq!(cli.env_file, std::path::PathBuf::from("/tmp/team.env"));
    }
}
