pub mod bash;
pub mod delay;
pub mod echo;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use toolwire_core::ToolOutcome;

pub use bash::{Bash, BashArgs, BashError, BashExecutor};
pub use delay::{Delay, DelayArgs};
pub use echo::Echo;

/// `Err` means the tool could not run; an application-level failure is
/// `Ok(ToolOutcome::failed(..))`.
pub type ToolResult = anyhow::Result<ToolOutcome>;

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> JsonValue;
    async fn execute(&self, params: JsonValue) -> ToolResult;
}

/// Parameters a tool could not accept. Returned through [`ToolResult`] and
/// reported as `PARAMETER_INVALID` instead of an execution failure.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct InvalidParams(pub String);

/// Decodes tool parameters, tagging failures as [`InvalidParams`].
pub fn parse_params<T: DeserializeOwned>(params: JsonValue) -> anyhow::Result<T> {
    serde_json::from_value(params).map_err(|e| InvalidParams(e.to_string()).into())
}

/// Output of a process-backed tool.
#[derive(Debug)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration_ms: u64,
}

impl ToolOutput {
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn to_json(&self) -> JsonValue {
        serde_json::json!({
            "stdout": self.stdout,
            "stderr": self.stderr,
            "exit_code": self.exit_code,
            "duration_ms": self.duration_ms,
        })
    }

    pub fn into_outcome(self) -> ToolOutcome {
        if self.is_success() {
            ToolOutcome::ok(self.to_json())
        } else {
            let mut outcome = ToolOutcome::failed(format!("exited with status {}", self.exit_code));
            outcome.data = Some(self.to_json());
            outcome
        }
    }
}

pub fn default_timeout() -> Duration {
    Duration::from_secs(60)
}

/// Names accepted by [`builtin_tool`], in registration order.
pub fn builtin_tool_names() -> &'static [&'static str] {
    &["echo", "delay", "bash"]
}

/// Looks up a built-in tool by the name used in server configuration.
pub fn builtin_tool(name: &str) -> Option<Arc<dyn Tool>> {
    match name {
        "echo" => Some(Arc::new(Echo)),
        "delay" => Some(Arc::new(Delay)),
        "bash" => Some(Arc::new(Bash::new())),
        _ => None,
    }
}
