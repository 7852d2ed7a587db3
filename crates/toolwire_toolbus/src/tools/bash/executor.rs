use super::args::BashArgs;
use super::error::BashError;
use crate::tools::ToolOutput;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::debug;

#[derive(Default)]
pub struct BashExecutor {
    working_dir: Option<String>,
}

impl BashExecutor {
    pub fn with_working_dir(mut self, dir: impl Into<String>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub async fn run(&self, args: &BashArgs) -> Result<ToolOutput, BashError> {
        let timeout = Duration::from_secs(args.timeout);
        let start = Instant::now();

        let (program, flag) = shell();
        let mut cmd = Command::new(program);
        cmd.arg(flag).arg(&args.command).kill_on_drop(true);

        if let Some(dir) = args.working_dir.as_ref().or(self.working_dir.as_ref()) {
            cmd.current_dir(dir);
        }

        debug!(command = %args.command, timeout_secs = args.timeout, "Running shell command");

        let output = tokio::time::timeout(timeout, cmd.output())
            .await
            .map_err(|_| BashError::Timeout(args.timeout))?
            .map_err(|e| BashError::SpawnFailed(e.to_string()))?;

        Ok(ToolOutput {
            stdout: String::from_utf8(output.stdout)?,
            stderr: String::from_utf8(output.stderr)?,
            exit_code: output.status.code().unwrap_or(-1),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(unix)]
fn shell() -> (&'static str, &'static str) {
    ("/bin/sh", "-c")
}

#[cfg(windows)]
fn shell() -> (&'static str, &'static str) {
    ("cmd", "/C")
}
