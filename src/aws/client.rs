use super::error::{AwsError, AwsResult};
use super::lambda_package::{self, HANDLER};
use super::policy::{self, PolicyDocument, LAMBDA_BASIC_EXECUTION_POLICY_ARN};
use super::provisioner::{AttachedPolicySummary, BucketSummary, ProvisionOutput, Provisioner};
use crate::config::{ConfigError, ShiperateConfig, DEFAULT_REGION};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_lambda::primitives::Blob;
use aws_sdk_lambda::types::{FunctionCode, Runtime};
use aws_sdk_s3::primitives::DateTimeFormat;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use tracing::{debug, info, instrument};

const CREDENTIALS_PROVIDER: &str = "shiperate-env";
const LAMBDA_TIMEOUT_SECS: i32 = 30;
const LAMBDA_MEMORY_MB: i32 = 128;

/// Service handles built once per invocation and dropped when it ends.
pub struct AwsClient {
    s3: aws_sdk_s3::Client,
    iam: aws_sdk_iam::Client,
    lambda: aws_sdk_lambda::Client,
    sqs: aws_sdk_sqs::Client,
    sts: aws_sdk_sts::Client,
    region: String,
}

impl AwsClient {
    /// Builds every service client from the configured credentials.
    ///
    /// No request is sent here; missing credentials fail before any network use.
    pub async fn connect(config: &ShiperateConfig) -> Result<Self, ConfigError> {
        let credentials = config.aws_credentials()?;
        let provider = Credentials::new(
            credentials.access_key_id,
            credentials.secret_access_key.expose().to_string(),
            None,
            None,
            CREDENTIALS_PROVIDER,
        );

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region().to_string()))
            .credentials_provider(provider);
        if let Some(endpoint) = config.endpoint_url() {
            debug!("Using AWS endpoint override {}", endpoint);
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        // Custom endpoints (LocalStack) only resolve path-style bucket URLs
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.endpoint_url().is_some())
            .build();

        Ok(Self {
            s3: aws_sdk_s3::Client::from_conf(s3_config),
            iam: aws_sdk_iam::Client::new(&sdk_config),
            lambda: aws_sdk_lambda::Client::new(&sdk_config),
            sqs: aws_sdk_sqs::Client::new(&sdk_config),
            sts: aws_sdk_sts::Client::new(&sdk_config),
            region: config.region().to_string(),
        })
    }

    async fn account_id(&self) -> AwsResult<String> {
        let identity = self
            .sts
            .get_caller_identity()
            .send()
            .await
            .map_err(|e| AwsError::service("GetCallerIdentity", e))?;
        identity
            .account()
            .map(str::to_string)
            .ok_or_else(|| AwsError::missing_field("GetCallerIdentity", "Account"))
    }

    /// Creates a managed policy and attaches it to the team's user.
    async fn create_and_attach_user_policy(
        &self,
        user_name: &str,
        policy_name: &str,
        document: &PolicyDocument,
    ) -> AwsResult<ProvisionOutput> {
        let created = self
            .iam
            .create_policy()
            .policy_name(policy_name)
            .policy_document(document.to_json()?)
            .send()
            .await
            .map_err(|e| AwsError::service("CreatePolicy", e))?;
        let policy_arn = created
            .policy()
            .and_then(|policy| policy.arn())
            .ok_or_else(|| AwsError::missing_field("CreatePolicy", "Policy.Arn"))?;
        info!("Created policy {}", policy_arn);

        let attached = self
            .iam
            .attach_user_policy()
            .user_name(user_name)
            .policy_arn(policy_arn)
            .send()
            .await
            .map_err(|e| AwsError::service("AttachUserPolicy", e))?;
        Ok(ProvisionOutput::response(&attached))
    }
}

#[async_trait]
impl Provisioner for AwsClient {
    async fn list_buckets(&self) -> AwsResult<ProvisionOutput> {
        let output = self
            .s3
            .list_buckets()
            .send()
            .await
            .map_err(|e| AwsError::service("ListBuckets", e))?;
        let buckets = output
            .buckets()
            .iter()
            .map(|bucket| BucketSummary {
                name: bucket.name().unwrap_or_default().to_string(),
                created: bucket
                    .creation_date()
                    .and_then(|date| date.fmt(DateTimeFormat::DateTime).ok()),
            })
            .collect();
        Ok(ProvisionOutput::Buckets(buckets))
    }

    #[instrument(skip(self))]
    async fn create_bucket(&self, bucket_name: &str) -> AwsResult<ProvisionOutput> {
        let mut request = self.s3.create_bucket().bucket(bucket_name);
        // us-east-1 rejects an explicit location constraint
        if self.region != DEFAULT_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }
        let output = request
            .send()
            .await
            .map_err(|e| AwsError::service("CreateBucket", e))?;
        Ok(ProvisionOutput::response(&output))
    }

    #[instrument(skip(self))]
    async fn delete_bucket(&self, bucket_name: &str) -> AwsResult<ProvisionOutput> {
        let output = self
            .s3
            .delete_bucket()
            .bucket(bucket_name)
            .send()
            .await
            .map_err(|e| AwsError::service("DeleteBucket", e))?;
        Ok(ProvisionOutput::response(&output))
    }

    #[instrument(skip(self))]
    async fn create_role(&self, role_name: &str) -> AwsResult<ProvisionOutput> {
        let output = self
            .iam
            .create_role()
            .role_name(role_name)
            .assume_role_policy_document(PolicyDocument::team_role_trust().to_json()?)
            .send()
            .await
            .map_err(|e| AwsError::service("CreateRole", e))?;
        Ok(ProvisionOutput::response(&output))
    }

    #[instrument(skip(self))]
    async fn create_lambda_execution_role(&self, role_name: &str) -> AwsResult<ProvisionOutput> {
        let execution_role = policy::lambda_execution_role_name(role_name);
        let created = self
            .iam
            .create_role()
            .role_name(&execution_role)
            .assume_role_policy_document(PolicyDocument::lambda_execution_trust().to_json()?)
            .description(format!("Execution role for {} Lambda functions", role_name))
            .send()
            .await
            .map_err(|e| AwsError::service("CreateRole", e))?;

        self.iam
            .attach_role_policy()
            .role_name(&execution_role)
            .policy_arn(LAMBDA_BASIC_EXECUTION_POLICY_ARN)
            .send()
            .await
            .map_err(|e| AwsError::service("AttachRolePolicy", e))?;

        info!("Created execution role: {}", execution_role);
        Ok(ProvisionOutput::response(&created))
    }

    #[instrument(skip(self))]
    async fn update_role_trust_for_user(&self, role_name: &str) -> AwsResult<ProvisionOutput> {
        let user = self
            .iam
            .get_user()
            .user_name(role_name)
            .send()
            .await
            .map_err(|e| AwsError::service("GetUser", e))?;
        let user_arn = user
            .user()
            .map(|user| user.arn().to_string())
            .ok_or_else(|| AwsError::missing_field("GetUser", "User.Arn"))?;

        let output = self
            .iam
            .update_assume_role_policy()
            .role_name(role_name)
            .policy_document(PolicyDocument::user_trust(&user_arn).to_json()?)
            .send()
            .await
            .map_err(|e| AwsError::service("UpdateAssumeRolePolicy", e))?;
        Ok(ProvisionOutput::response(&output))
    }

    #[instrument(skip(self))]
    async fn add_s3_permissions(
        &self,
        role_name: &str,
        bucket_name: &str,
    ) -> AwsResult<ProvisionOutput> {
        self.s3
            .head_bucket()
            .bucket(bucket_name)
            .send()
            .await
            .map_err(|e| match AwsError::service("HeadBucket", e) {
                AwsError::Service { message, .. } => AwsError::BucketUnavailable {
                    bucket: bucket_name.to_string(),
                    message,
                },
                other => other,
            })?;

        self.create_and_attach_user_policy(
            role_name,
            &format!("{}_s3_policy", bucket_name),
            &PolicyDocument::s3_bucket_access(bucket_name),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn add_lambda_permissions(
        &self,
        role_name: &str,
        function_name: &str,
    ) -> AwsResult<ProvisionOutput> {
        let account_id = self.account_id().await?;
        self.create_and_attach_user_policy(
            role_name,
            &format!("{}_lambda_policy", function_name),
            &PolicyDocument::lambda_function_access(&self.region, &account_id, function_name),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn add_sqs_permissions(
        &self,
        role_name: &str,
        queue_name: &str,
    ) -> AwsResult<ProvisionOutput> {
        let account_id = self.account_id().await?;
        self.create_and_attach_user_policy(
            role_name,
            &format!("{}_sqs_policy", queue_name),
            &PolicyDocument::sqs_queue_access(&self.region, &account_id, queue_name),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn attach_role_to_user(&self, role_name: &str) -> AwsResult<ProvisionOutput> {
        let role = self
            .iam
            .get_role()
            .role_name(role_name)
            .send()
            .await
            .map_err(|e| AwsError::service("GetRole", e))?;
        let role_arn = role
            .role()
            .map(|role| role.arn().to_string())
            .ok_or_else(|| AwsError::missing_field("GetRole", "Role.Arn"))?;

        let output = self
            .iam
            .put_user_policy()
            .user_name(role_name)
            .policy_name(role_name)
            .policy_document(PolicyDocument::allow_assume_role(&role_arn).to_json()?)
            .send()
            .await
            .map_err(|e| AwsError::service("PutUserPolicy", e))?;
        Ok(ProvisionOutput::response(&output))
    }

    #[instrument(skip(self))]
    async fn create_user(&self, role_name: &str) -> AwsResult<ProvisionOutput> {
        let output = self
            .iam
            .create_user()
            .user_name(role_name)
            .send()
            .await
            .map_err(|e| AwsError::service("CreateUser", e))?;
        Ok(ProvisionOutput::response(&output))
    }

    #[instrument(skip(self, password))]
    async fn create_login_profile(
        &self,
        role_name: &str,
        password: &str,
    ) -> AwsResult<ProvisionOutput> {
        let output = self
            .iam
            .create_login_profile()
            .user_name(role_name)
            .password(password)
            .password_reset_required(false)
            .send()
            .await
            .map_err(|e| AwsError::service("CreateLoginProfile", e))?;
        Ok(ProvisionOutput::response(&output))
    }

    #[instrument(skip(self))]
    async fn list_user_policies(&self, role_name: &str) -> AwsResult<ProvisionOutput> {
        let output = self
            .iam
            .list_attached_user_policies()
            .user_name(role_name)
            .send()
            .await
            .map_err(|e| AwsError::service("ListAttachedUserPolicies", e))?;
        let policies = output
            .attached_policies()
            .iter()
            .map(|policy| AttachedPolicySummary {
                name: policy.policy_name().unwrap_or_default().to_string(),
                arn: policy.policy_arn().unwrap_or_default().to_string(),
            })
            .collect();
        Ok(ProvisionOutput::AttachedPolicies(policies))
    }

    #[instrument(skip(self))]
    async fn detach_user_policy(
        &self,
        role_name: &str,
        policy_arn: &str,
    ) -> AwsResult<ProvisionOutput> {
        let output = self
            .iam
            .detach_user_policy()
            .user_name(role_name)
            .policy_arn(policy_arn)
            .send()
            .await
            .map_err(|e| AwsError::service("DetachUserPolicy", e))?;
        Ok(ProvisionOutput::response(&output))
    }

    #[instrument(skip(self))]
    async fn delete_policy(&self, policy_arn: &str) -> AwsResult<ProvisionOutput> {
        let output = self
            .iam
            .delete_policy()
            .policy_arn(policy_arn)
            .send()
            .await
            .map_err(|e| AwsError::service("DeletePolicy", e))?;
        Ok(ProvisionOutput::response(&output))
    }

    #[instrument(skip(self))]
    async fn create_function(
        &self,
        function_name: &str,
        role_name: &str,
    ) -> AwsResult<ProvisionOutput> {
        let account_id = self.account_id().await?;
        let execution_role = policy::role_arn(
            &account_id,
            &policy::lambda_execution_role_name(role_name),
        );
        let package = lambda_package::starter_package()?;
        debug!(
            "Packaged starter code ({} bytes), execution role {}",
            package.len(),
            execution_role
        );

        let output = self
            .lambda
            .create_function()
            .function_name(function_name)
            .runtime(Runtime::Python312)
            .role(execution_role)
            .handler(HANDLER)
            .code(FunctionCode::builder().zip_file(Blob::new(package)).build())
            .description(format!(
                "Stub function for {} - configure as needed",
                role_name
            ))
            .timeout(LAMBDA_TIMEOUT_SECS)
            .memory_size(LAMBDA_MEMORY_MB)
            .send()
            .await
            .map_err(|e| AwsError::service("CreateFunction", e))?;
        Ok(ProvisionOutput::response(&output))
    }

    #[instrument(skip(self))]
    async fn create_queue(&self, queue_name: &str) -> AwsResult<ProvisionOutput> {
        let output = self
            .sqs
            .create_queue()
            .queue_name(queue_name)
            .send()
            .await
            .map_err(|e| AwsError::service("CreateQueue", e))?;
        Ok(ProvisionOutput::response(&output))
    }
}
