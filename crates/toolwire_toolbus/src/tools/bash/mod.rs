mod args;
mod error;
mod executor;

pub use args::BashArgs;
pub use error::BashError;
pub use executor::BashExecutor;

use crate::tools::{Tool, ToolResult, parse_params};
use async_trait::async_trait;
use serde_json::{Value as JsonValue, json};

/// Runs a shell command on the server host.
///
/// Not part of the default tool set; a server must list it explicitly.
pub struct Bash {
    executor: BashExecutor,
}

impl Bash {
    pub fn new() -> Self {
        Self {
            executor: BashExecutor::default(),
        }
    }

    pub fn with_working_dir(mut self, working_dir: impl Into<String>) -> Self {
        self.executor = self.executor.with_working_dir(working_dir);
        self
    }
}

impl Default for Bash {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for Bash {
    fn name(&self) -> &str {
        "bash"
    }

    fn description(&self) -> &str {
        "Runs a shell command and returns its stdout, stderr and exit code."
    }

    fn parameters_schema(&self) -> JsonValue {
        json!({
            "type": "object",
            "properties": {
                "command": {"type": "string", "description": "The shell command to run"},
                "timeout": {"type": "integer", "description": "Timeout in seconds (default 60)"},
                "working_dir": {"type": "string", "description": "Directory to run the command in"}
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, params: JsonValue) -> ToolResult {
        let bash_args: BashArgs = parse_params(params)?;
        let output = self.executor.run(&bash_args).await?;
        Ok(output.into_outcome())
    }
}
