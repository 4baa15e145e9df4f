use async_trait::async_trait;
use std::ops::ControlFlow;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

use super::error::ExecutorError;
use super::traits::{CommandExecutor, LineHandler};
use super::types::{CommandOutput, CommandResult, Invocation};

/// Runs programs on the local machine through `tokio::process`.
pub struct LocalCommandExecutor;

impl Default for LocalCommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalCommandExecutor {
    pub fn new() -> Self {
        Self
    }

    fn command(invocation: &Invocation) -> Command {
        let mut command = Command::new(invocation.program());
        command.args(invocation.args()).stdin(Stdio::null());
        command
    }

    fn spawn_error(invocation: &Invocation, err: std::io::Error) -> ExecutorError {
        ExecutorError::Spawn {
            program: invocation.program().to_string(),
            message: err.to_string(),
        }
    }
}

#[async_trait]
impl CommandExecutor for LocalCommandExecutor {
    async fn execute(&mut self, invocation: &Invocation) -> Result<CommandResult, ExecutorError> {
        debug!("Running {}", invocation);
        let start_time = Instant::now();

        let output = Self::command(invocation)
            .output()
            .await
            .map_err(|e| Self::spawn_error(invocation, e))?;

        let mut cmd_output = CommandOutput::new();
        cmd_output.stdout = output.stdout;
        cmd_output.stderr = output.stderr;
        cmd_output.exit_code = output.status.code().unwrap_or(-1);
        cmd_output.duration = start_time.elapsed();
        debug!(
            "{} exited with {} after {:?}",
            invocation, cmd_output.exit_code, cmd_output.duration
        );

        Ok(CommandResult {
            command: invocation.to_string(),
            output: cmd_output,
        })
    }

    async fn execute_streaming(
        &mut self,
        invocation: &Invocation,
        on_line: &mut LineHandler<'_>,
    ) -> Result<CommandResult, ExecutorError> {
        debug!("Streaming {}", invocation);
        let start_time = Instant::now();

        let mut child = Self::command(invocation)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Self::spawn_error(invocation, e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ExecutorError::LocalError("stdout was not captured".to_string()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| ExecutorError::LocalError("stderr was not captured".to_string()))?;

        // Drained separately so a chatty stderr cannot block the child.
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            stderr.read_to_end(&mut buf).await.map(|_| buf)
        });

        let mut cmd_output = CommandOutput::new();
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .await
                .map_err(|e| ExecutorError::LocalError(e.to_string()))?;
            if read == 0 {
                break;
            }
            cmd_output.stdout.extend_from_slice(&buf);

            let raw = buf.strip_suffix(b"\n").unwrap_or(&buf[..]);
            let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
            let line = String::from_utf8_lossy(raw);
            if let ControlFlow::Break(()) = on_line(&line) {
                debug!("Stopping {} early", invocation);
                child
                    .start_kill()
                    .map_err(|e| ExecutorError::LocalError(e.to_string()))?;
                break;
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| ExecutorError::LocalError(e.to_string()))?;
        cmd_output.stderr = stderr_task
            .await
            .map_err(|e| ExecutorError::LocalError(e.to_string()))?
            .map_err(|e| ExecutorError::LocalError(e.to_string()))?;
        cmd_output.exit_code = status.code().unwrap_or(-1);
        cmd_output.duration = start_time.elapsed();
        debug!(
            "{} exited with {} after {:?}",
            invocation, cmd_output.exit_code, cmd_output.duration
        );

        Ok(CommandResult {
            command: invocation.to_string(),
            output: cmd_output,
        })
    }
}
