use super::action::Action;
use super::error::AwsResult;
use async_trait::async_trait;
use std::fmt::Debug;
use tracing::{debug, instrument};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketSummary {
    pub name: String,
    pub created: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedPolicySummary {
    pub name: String,
    pub arn: String,
}

/// What an executor hands back for printing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutput {
    /// Pretty-printed SDK response.
    Response(String),
    Buckets(Vec<BucketSummary>),
    AttachedPolicies(Vec<AttachedPolicySummary>),
}

impl ProvisionOutput {
    pub fn response(output: &impl Debug) -> Self {
        ProvisionOutput::Response(format!("{:#?}", output))
    }
}

/// One method per cloud operation. Each call is made exactly once, never retried.
#[async_trait]
pub trait Provisioner: Send + Sync {
    async fn list_buckets(&self) -> AwsResult<ProvisionOutput>;

    async fn create_bucket(&self, bucket_name: &str) -> AwsResult<ProvisionOutput>;

    async fn delete_bucket(&self, bucket_name: &str) -> AwsResult<ProvisionOutput>;

    /// Creates the team role, assumable by Lambda and S3.
    async fn create_role(&self, role_name: &str) -> AwsResult<ProvisionOutput>;

    /// Creates `<team>-lambda-execution` and attaches the basic execution policy.
    async fn create_lambda_execution_role(&self, role_name: &str) -> AwsResult<ProvisionOutput>;

    /// Rewrites the role's trust policy so the same-named user may assume it.
    async fn update_role_trust_for_user(&self, role_name: &str) -> AwsResult<ProvisionOutput>;

    async fn add_s3_permissions(
        &self,
        role_name: &str,
        bucket_name: &str,
    ) -> AwsResult<ProvisionOutput>;

    async fn add_lambda_permissions(
        &self,
        role_name: &str,
        function_name: &str,
    ) -> AwsResult<ProvisionOutput>;

    async fn add_sqs_permissions(
        &self,
        role_name: &str,
        queue_name: &str,
    ) -> AwsResult<ProvisionOutput>;

    /// Puts an inline user policy allowing `sts:AssumeRole` on the same-named role.
    async fn attach_role_to_user(&self, role_name: &str) -> AwsResult<ProvisionOutput>;

    async fn create_user(&self, role_name: &str) -> AwsResult<ProvisionOutput>;

    /// Creates a console login profile that does not require a password reset.
    async fn create_login_profile(
        &self,
        role_name: &str,
        password: &str,
    ) -> AwsResult<ProvisionOutput>;

    async fn list_user_policies(&self, role_name: &str) -> AwsResult<ProvisionOutput>;

    async fn detach_user_policy(
        &self,
        role_name: &str,
        policy_arn: &str,
    ) -> AwsResult<ProvisionOutput>;

    async fn delete_policy(&self, policy_arn: &str) -> AwsResult<ProvisionOutput>;

    async fn create_function(
        &self,
        function_name: &str,
        role_name: &str,
    ) -> AwsResult<ProvisionOutput>;

    async fn create_queue(&self, queue_name: &str) -> AwsResult<ProvisionOutput>;
}

/// Runs the single executor mapped to `action`.
#[instrument(skip_all)]
pub async fn dispatch(
    action: &Action,
    provisioner: &dyn Provisioner,
) -> AwsResult<ProvisionOutput> {
    debug!(?action, "Dispatching");
    match action {
        Action::ListBuckets => provisioner.list_buckets().await,
        Action::CreateBucket { bucket_name } => provisioner.create_bucket(bucket_name).await,
        Action::DeleteBucket { bucket_name } => provisioner.delete_bucket(bucket_name).await,
        Action::CreateRole { role_name } => provisioner.create_role(role_name).await,
        Action::CreateLambdaExecutionRole { role_name } => {
            provisioner.create_lambda_execution_role(role_name).await
        }
        Action::UpdateRolePolicy { role_name } => {
            provisioner.update_role_trust_for_user(role_name).await
        }
        Action::AddS3Permissions {
            role_name,
            bucket_name,
        } => provisioner.add_s3_permissions(role_name, bucket_name).await,
        Action::AddLambdaPermissions {
            role_name,
            function_name,
        } => {
            provisioner
                .add_lambda_permissions(role_name, function_name)
                .await
        }
        Action::AddSqsPermissions {
            role_name,
            queue_name,
        } => provisioner.add_sqs_permissions(role_name, queue_name).await,
        Action::AttachRoleToUser { role_name } => provisioner.attach_role_to_user(role_name).await,
        Action::CreateUser { role_name } => provisioner.create_user(role_name).await,
        Action::CreateAccount {
            role_name,
            password,
        } => {
            provisioner
                .create_login_profile(role_name, password.expose())
                .await
        }
        Action::ListUserPolicies { role_name } => provisioner.list_user_policies(role_name).await,
        Action::DetachUserPolicy {
            role_name,
            policy_arn,
        } => provisioner.detach_user_policy(role_name, policy_arn).await,
        Action::DeletePolicy { policy_arn } => provisioner.delete_policy(policy_arn).await,
        Action::CreateFunction {
            function_name,
            role_name,
        } => provisioner.create_function(function_name, role_name).await,
        Action::CreateQueue { queue_name } => provisioner.create_queue(queue_name).await,
    }
}
