use async_trait::async_trait;
use std::ops::ControlFlow;

use super::{CommandResult, ExecutorError, Invocation};

/// Called once per stdout line; returning `Break` stops the command.
pub type LineHandler<'a> = dyn FnMut(&str) -> ControlFlow<()> + Send + 'a;

/// A trait for running external programs in a uniform way.
#[async_trait]
pub trait CommandExecutor {
    /// Run to completion and capture stdout/stderr/exit code.
    async fn execute(&mut self, invocation: &Invocation) -> Result<CommandResult, ExecutorError>;

    /// Run while handing each stdout line to `on_line` as it arrives.
    ///
    /// If the handler breaks, the child is killed and the partial result returned.
    async fn execute_streaming(
        &mut self,
        invocation: &Invocation,
        on_line: &mut LineHandler<'_>,
    ) -> Result<CommandResult, ExecutorError>;
}
