use std::io;
use std::process::Stdio;

use super::command::Invocation;

/// Captured result of one finished child process.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub success: bool,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Runs a tool invocation to completion.
///
/// The tagger talks to the outside world only through this trait, so tests can
/// substitute a recording stub for the real process spawner.
///
/// An `Err` means the program could not be started at all; a program that ran
/// and failed is reported through [`CommandOutput::success`].
#[async_trait::async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, invocation: &Invocation) -> io::Result<CommandOutput>;
}

/// Spawns real child processes on the tokio runtime.
///
/// Children are killed if the returned future is dropped before they exit,
/// which is how timeouts terminate a stuck tool.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait::async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, invocation: &Invocation) -> io::Result<CommandOutput> {
        let output = tokio::process::Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        Ok(CommandOutput {
            code: output.status.code(),
            success: output.status.success(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}
