pub mod preflight;
pub mod push;
pub mod types;

pub use preflight::Preflight;
pub use push::PushMessage;
pub use types::{DeployConfig, DeployError, DeployResult, DeploySummary, DeployerEvent};

use crate::executor::{CommandExecutor, CommandResult, Invocation};
use std::ops::ControlFlow;
use std::time::Instant;
use tokio::sync::mpsc;
use types::{DOCKER, DOCTL};

/// Builds an image and pushes it to the DigitalOcean registry.
pub struct Deployer<'a> {
    executor: &'a mut (dyn CommandExecutor + Send),
    progress_sender: Option<mpsc::Sender<DeployerEvent>>,
}

impl<'a> Deployer<'a> {
    const CHECK_STEP: &'static str = "Checking dependencies";
    const AUTH_STEP: &'static str = "Authenticating with registry";
    const BUILD_STEP: &'static str = "Building image";
    const PUSH_STEP: &'static str = "Pushing image";

    pub fn new(
        executor: &'a mut (dyn CommandExecutor + Send),
        progress_sender: Option<mpsc::Sender<DeployerEvent>>,
    ) -> Self {
        Self {
            executor,
            progress_sender,
        }
    }

    async fn send_event(&self, event: DeployerEvent) {
        if let Some(sender) = &self.progress_sender {
            if let Err(e) = sender.send(event).await {
                tracing::warn!("Failed to send progress event: {}", e);
            }
        }
    }

    /// Runs the four stages in order, stopping at the first failure.
    pub async fn deploy(&mut self, preflight: &Preflight) -> DeployResult<DeploySummary> {
        let started = Instant::now();
        tracing::info!("🚀 Starting deploy...");

        self.send_event(DeployerEvent::StepStarted(Self::CHECK_STEP.to_string()))
            .await;
        let config = match preflight.check() {
            Ok(config) => config,
            Err(e) => {
                self.send_event(DeployerEvent::StepFailed(
                    Self::CHECK_STEP.to_string(),
                    e.to_string(),
                ))
                .await;
                return Err(e);
            }
        };
        self.send_event(DeployerEvent::StepCompleted(Self::CHECK_STEP.to_string()))
            .await;

        self.send_event(DeployerEvent::StepStarted(Self::AUTH_STEP.to_string()))
            .await;
        let result = self.authenticate(&config).await;
        self.finish_step(Self::AUTH_STEP, &result).await;
        result?;

        self.send_event(DeployerEvent::StepStarted(Self::BUILD_STEP.to_string()))
            .await;
        let result = self.build(&config).await;
        self.finish_step(Self::BUILD_STEP, &result).await;
        result?;

        self.send_event(DeployerEvent::StepStarted(Self::PUSH_STEP.to_string()))
            .await;
        let result = self.push(&config).await;
        self.finish_step(Self::PUSH_STEP, &result).await;
        let push_messages = result?;

        let image = config.image_ref();
        tracing::info!("✅ Pushed {}", image);
        Ok(DeploySummary {
            image,
            push_messages,
            duration: started.elapsed(),
        })
    }

    async fn finish_step<T>(&self, name: &str, result: &DeployResult<T>) {
        let event = match result {
            Ok(_) => DeployerEvent::StepCompleted(name.to_string()),
            Err(e) => DeployerEvent::StepFailed(name.to_string(), e.to_string()),
        };
        self.send_event(event).await;
    }

    async fn authenticate(&mut self, config: &DeployConfig) -> DeployResult<()> {
        tracing::info!("Logging in to the registry with doctl");
        let init = Invocation::new(DOCTL)
            .arg("auth")
            .arg("init")
            .arg("--access-token")
            .secret_arg(config.token.expose());
        let result = self.executor.execute(&init).await?;
        ensure_success(Self::AUTH_STEP, &result)?;

        let login = Invocation::new(DOCTL).arg("registry").arg("login");
        let result = self.executor.execute(&login).await?;
        ensure_success(Self::AUTH_STEP, &result)
    }

    async fn build(&mut self, config: &DeployConfig) -> DeployResult<()> {
        tracing::info!("Building {}", config.image_ref());
        let invocation = Invocation::new(DOCKER)
            .arg("build")
            .arg("--file")
            .arg(config.dockerfile.to_string_lossy())
            .arg("--tag")
            .arg(config.image_ref())
            .arg(config.build_context.to_string_lossy());

        let result = self
            .executor
            .execute_streaming(&invocation, &mut |line: &str| {
                tracing::debug!("build: {}", line);
                ControlFlow::Continue(())
            })
            .await?;
        ensure_success(Self::BUILD_STEP, &result)
    }

    async fn push(&mut self, config: &DeployConfig) -> DeployResult<Vec<String>> {
        let invocation = Invocation::new(DOCKER).arg("push").arg(config.image_ref());
        let sender = self.progress_sender.clone();
        let mut rejection: Option<String> = None;
        let mut messages = Vec::new();

        let result = self
            .executor
            .execute_streaming(&invocation, &mut |line: &str| {
                let message = PushMessage::parse(line);
                if let Some(error) = message.error_message() {
                    tracing::error!("Registry reported: {}", error);
                    rejection = Some(error.to_string());
                    return ControlFlow::Break(());
                }
                if let Some(summary) = message.summary() {
                    tracing::debug!("push: {}", summary);
                    if let Some(sender) = &sender {
                        // Progress is best effort; a full channel just drops the update.
                        let _ = sender.try_send(DeployerEvent::PushProgress(summary.clone()));
                    }
                    messages.push(summary);
                }
                ControlFlow::Continue(())
            })
            .await?;

        if let Some(error) = rejection {
            return Err(DeployError::PushRejected(error));
        }
        ensure_success(Self::PUSH_STEP, &result)?;
        Ok(messages)
    }
}

fn ensure_success(step: &'static str, result: &CommandResult) -> DeployResult<()> {
    if result.is_success() {
        return Ok(());
    }
    Err(DeployError::CommandFailed {
        step,
        command: result.command.clone(),
        code: result.output.exit_code,
        message: result.failure_message(),
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::preflight::tests::{fake_bin_dir, full_env};
    use super::types::DO_TOKEN_VAR;
    use super::*;
    use crate::config::EnvSource;
    use crate::executor::{ExecutorError, LineHandler};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use tempfile::TempDir;

    const AUTH_INIT: &str = "doctl auth init --access-token ***";
    const LOGIN: &str = "doctl registry login";
    const BUILD: &str = "docker build --file ./app/Dockerfile --tag registry.digitalocean.com/karp/api:v3 ./app";
    const PUSH: &str = "docker push registry.digitalocean.com/karp/api:v3";

    struct MockExecutor {
        responses: HashMap<String, Result<CommandResult, ExecutorError>>,
        commands: Vec<String>,
        raw_args: Vec<Vec<String>>,
        lines_delivered: usize,
    }

    impl MockExecutor {
        fn new() -> Self {
            Self {
                responses: HashMap::new(),
                commands: Vec::new(),
                raw_args: Vec::new(),
                lines_delivered: 0,
            }
        }

        fn add_response(&mut self, command: &str, result: Result<CommandResult, ExecutorError>) {
            self.responses.insert(command.to_string(), result);
        }

        fn with_happy_path() -> Self {
            let mut executor = Self::new();
            executor.add_response(AUTH_INIT, create_result(0, "Validating token... OK\n", ""));
            executor.add_response(LOGIN, create_result(0, "Logging Docker in to registry\n", ""));
            executor.add_response(BUILD, create_result(0, "Step 1/3 : FROM python:3.12\n", ""));
            executor.add_response(
                PUSH,
                create_result(
                    0,
                    "{\"status\":\"Preparing\",\"id\":\"4f4fb700ef54\"}\n{\"status\":\"Pushed\",\"id\":\"4f4fb700ef54\"}\nv3: digest: sha256:abc size: 1573\n",
                    "",
                ),
            );
            executor
        }

        fn lookup(&mut self, invocation: &Invocation) -> Result<CommandResult, ExecutorError> {
            let command = invocation.to_string();
            self.commands.push(command.clone());
            self.raw_args
                .push(invocation.args().iter().map(|s| s.to_string()).collect());
            self.responses.get(&command).cloned().ok_or_else(|| {
                ExecutorError::LocalError(format!("Mock response not found for command: {}", command))
            })?
        }
    }

    #[async_trait]
    impl CommandExecutor for MockExecutor {
        async fn execute(&mut self, invocation: &Invocation) -> Result<CommandResult, ExecutorError> {
            self.lookup(invocation)
        }

        async fn execute_streaming(
            &mut self,
            invocation: &Invocation,
            on_line: &mut LineHandler<'_>,
        ) -> Result<CommandResult, ExecutorError> {
            let result = self.lookup(invocation)?;
            for line in result.output.stdout_text().lines() {
                self.lines_delivered += 1;
                if on_line(line).is_break() {
                    break;
                }
            }
            Ok(result)
        }
    }

    fn create_result(code: i32, stdout: &str, stderr: &str) -> Result<CommandResult, ExecutorError> {
        let mut result = CommandResult::new("mock");
        result.output.exit_code = code;
        result.output.stdout = stdout.as_bytes().to_vec();
        result.output.stderr = stderr.as_bytes().to_vec();
        Ok(result)
    }

    fn preflight_with(bin: &TempDir, env: Vec<(&'static str, &'static str)>) -> Preflight {
        Preflight::new(
            Some(bin.path().as_os_str().to_owned()),
            EnvSource::from_pairs(env),
        )
    }

    #[tokio::test]
    async fn test_full_deploy_runs_commands_in_order() {
        let bin = fake_bin_dir(&["doctl", "docker"]);
        let mut executor = MockExecutor::with_happy_path();

        let summary = Deployer::new(&mut executor, None)
            .deploy(&preflight_with(&bin, full_env()))
            .await
            .unwrap();

        assert_eq!(summary.image, "registry.digitalocean.com/karp/api:v3");
        assert_eq!(
            summary.push_messages,
            vec![
                "4f4fb700ef54: Preparing",
                "4f4fb700ef54: Pushed",
                "v3: digest: sha256:abc size: 1573"
            ]
        );
        assert_eq!(executor.commands, vec![AUTH_INIT, LOGIN, BUILD, PUSH]);
        // The real token still reaches doctl.
        assert_eq!(
            executor.raw_args[0],
            vec!["auth", "init", "--access-token", "dop_v1_abc"]
        );
    }

    #[tokio::test]
    async fn test_missing_token_runs_nothing() {
        let bin = fake_bin_dir(&["doctl", "docker"]);
        let env = full_env()
            .into_iter()
            .filter(|(key, _)| *key != DO_TOKEN_VAR)
            .collect();
        let mut executor = MockExecutor::with_happy_path();

        let err = Deployer::new(&mut executor, None)
            .deploy(&preflight_with(&bin, env))
            .await
            .unwrap_err();

        assert!(matches!(err, DeployError::MissingEnvVar(ref var) if var == "DO_TOKEN"));
        assert!(err.is_user_error());
        assert!(executor.commands.is_empty());
    }

    #[tokio::test]
    async fn test_missing_docker_runs_nothing() {
        let bin = fake_bin_dir(&["doctl"]);
        let mut executor = MockExecutor::with_happy_path();

        let err = Deployer::new(&mut executor, None)
            .deploy(&preflight_with(&bin, full_env()))
            .await
            .unwrap_err();

        assert!(matches!(err, DeployError::MissingDependency(ref name) if name == "docker"));
        assert!(executor.commands.is_empty());
    }

    #[tokio::test]
    async fn test_auth_failure_stops_before_build() {
        let bin = fake_bin_dir(&["doctl", "docker"]);
        let mut executor = MockExecutor::with_happy_path();
        executor.add_response(
            AUTH_INIT,
            create_result(1, "", "Error: Unable to use supplied token to access API\n"),
        );

        let err = Deployer::new(&mut executor, None)
            .deploy(&preflight_with(&bin, full_env()))
            .await
            .unwrap_err();

        match err {
            DeployError::CommandFailed {
                step,
                command,
                code,
                message,
            } => {
                assert_eq!(step, "Authenticating with registry");
                assert_eq!(command, "mock");
                assert_eq!(code, 1);
                assert_eq!(message, "Error: Unable to use supplied token to access API");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(executor.commands, vec![AUTH_INIT]);
    }

    #[tokio::test]
    async fn test_build_failure_stops_before_push() {
        let bin = fake_bin_dir(&["doctl", "docker"]);
        let mut executor = MockExecutor::with_happy_path();
        executor.add_response(BUILD, create_result(1, "", "failed to solve: Dockerfile not found\n"));

        let err = Deployer::new(&mut executor, None)
            .deploy(&preflight_with(&bin, full_env()))
            .await
            .unwrap_err();

        assert!(matches!(err, DeployError::CommandFailed { step: "Building image", .. }));
        assert!(!err.is_user_error());
        assert_eq!(executor.commands, vec![AUTH_INIT, LOGIN, BUILD]);
    }

    #[tokio::test]
    async fn test_build_failure_with_binary_stderr_keeps_details() {
        let bin = fake_bin_dir(&["doctl", "docker"]);
        let mut executor = MockExecutor::with_happy_path();
        let mut failed = CommandResult::new("mock");
        failed.output.exit_code = 1;
        failed.output.stderr = b"err\xff\n".to_vec();
        executor.add_response(BUILD, Ok(failed));

        let err = Deployer::new(&mut executor, None)
            .deploy(&preflight_with(&bin, full_env()))
            .await
            .unwrap_err();

        match err {
            DeployError::CommandFailed {
                step,
                code,
                message,
                ..
            } => {
                assert_eq!(step, "Building image");
                assert_eq!(code, 1);
                assert_eq!(message, "err\u{fffd}");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_push_error_message_is_fatal() {
        let bin = fake_bin_dir(&["doctl", "docker"]);
        let mut executor = MockExecutor::with_happy_path();
        executor.add_response(PUSH, create_result(0, "{\"error\": \"denied\"}\n", ""));

        let err = Deployer::new(&mut executor, None)
            .deploy(&preflight_with(&bin, full_env()))
            .await
            .unwrap_err();

        assert!(matches!(err, DeployError::PushRejected(ref msg) if msg == "denied"));
        // One build line and the rejected push line.
        assert_eq!(executor.lines_delivered, 2);
    }

    #[tokio::test]
    async fn test_push_stops_at_first_error() {
        let bin = fake_bin_dir(&["doctl", "docker"]);
        let mut executor = MockExecutor::with_happy_path();
        executor.add_response(
            PUSH,
            create_result(
                0,
                "{\"status\":\"Preparing\",\"id\":\"a1\"}\n{\"errorDetail\":{\"message\":\"denied: quota exceeded\"},\"error\":\"denied: quota exceeded\"}\n{\"status\":\"Pushed\",\"id\":\"a1\"}\n",
                "",
            ),
        );

        let err = Deployer::new(&mut executor, None)
            .deploy(&preflight_with(&bin, full_env()))
            .await
            .unwrap_err();

        assert!(matches!(err, DeployError::PushRejected(ref msg) if msg == "denied: quota exceeded"));
        // One build line, then two push lines; the trailing "Pushed" is never seen.
        assert_eq!(executor.lines_delivered, 3);
    }

    #[tokio::test]
    async fn test_push_non_zero_exit_is_fatal() {
        let bin = fake_bin_dir(&["doctl", "docker"]);
        let mut executor = MockExecutor::with_happy_path();
        executor.add_response(
            PUSH,
            create_result(1, "The push refers to repository\n", "unauthorized: authentication required\n"),
        );

        let err = Deployer::new(&mut executor, None)
            .deploy(&preflight_with(&bin, full_env()))
            .await
            .unwrap_err();

        assert!(matches!(err, DeployError::CommandFailed { step: "Pushing image", ref message, .. } if message == "unauthorized: authentication required"));
    }

    #[tokio::test]
    async fn test_progress_events_follow_steps() {
        let bin = fake_bin_dir(&["doctl", "docker"]);
        let mut executor = MockExecutor::with_happy_path();
        executor.add_response(BUILD, create_result(2, "", "boom\n"));
        let (sender, mut receiver) = mpsc::channel(32);

        let mut deployer = Deployer::new(&mut executor, Some(sender));
        let result = deployer.deploy(&preflight_with(&bin, full_env())).await;
        drop(deployer);
        assert!(result.is_err());

        let mut events = Vec::new();
        while let Some(event) = receiver.recv().await {
            events.push(event.to_string());
        }
        assert_eq!(
            events,
            vec![
                "Started: Checking dependencies",
                "Completed: Checking dependencies",
                "Started: Authenticating with registry",
                "Completed: Authenticating with registry",
                "Started: Building image",
                "Failed: Building image - Building image failed: 'mock' exited with code 2: boom",
            ]
        );
    }
}
