use shiperate::aws::AwsClient;
use shiperate::config::{EnvSource, ShiperateConfig};
use std::borrow::Cow;
use testcontainers::core::{ContainerPort, Image, WaitFor};
use testcontainers::{runners::AsyncRunner, ContainerAsync};

pub const EDGE_PORT: u16 = 4566;

/// LocalStack with the services the CLI talks to.
#[derive(Debug, Clone, Default)]
pub struct LocalStack;

impl Image for LocalStack {
    fn name(&self) -> &str {
        "localstack/localstack"
    }

    fn tag(&self) -> &str {
        "3.8"
    }

    fn ready_conditions(&self) -> Vec<WaitFor> {
        vec![WaitFor::message_on_stdout("Ready.")]
    }

    fn env_vars(
        &self,
    ) -> impl IntoIterator<Item = (impl Into<Cow<'_, str>>, impl Into<Cow<'_, str>>)> {
        vec![(Cow::Borrowed("SERVICES"), Cow::Borrowed("s3,sqs,iam,sts,lambda"))]
    }

    fn expose_ports(&self) -> &[ContainerPort] {
        &[ContainerPort::Tcp(EDGE_PORT)]
    }
}

/// Start LocalStack and return the container and its endpoint URL
pub async fn start_localstack() -> anyhow::Result<(ContainerAsync<LocalStack>, String)> {
    let container = LocalStack.start().await?;
    let port = container.get_host_port_ipv4(EDGE_PORT).await?;
    Ok((container, format!("http://127.0.0.1:{}", port)))
}

/// Client wired to `endpoint` with LocalStack's dummy credentials.
pub async fn localstack_client(endpoint: &str) -> anyhow::Result<AwsClient> {
    let env = EnvSource::from_pairs([
        ("AWS_ACCESS_KEY_ID", "test"),
        ("AWS_SECRET_ACCESS_KEY", "test"),
        ("AWS_REGION", "us-east-1"),
        ("AWS_ENDPOINT_URL", endpoint),
    ]);
    let config = ShiperateConfig::from_env(&env)?;
    Ok(AwsClient::connect(&config).await?)
}

pub fn teams() -> Vec<String> {
    shiperate::config::FALL_2025_SW_TEAMS
        .iter()
        .map(|team| team.to_string())
        .collect()
}
