use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};
use toolwire_core::ToolOutcome;

use super::{Tool, ToolResult, parse_params};

/// Upper bound on a single delay.
const MAX_DELAY_MS: u64 = 5 * 60 * 1000;

#[derive(Debug, Deserialize)]
pub struct DelayArgs {
    pub ms: u64,
    #[serde(default)]
    pub value: JsonValue,
}

/// Sleeps for `ms` milliseconds, then returns `value`.
pub struct Delay;

#[async_trait]
impl Tool for Delay {
    fn name(&self) -> &str {
        "delay"
    }

    fn description(&self) -> &str {
        "Waits for the given number of milliseconds, then returns `value`."
    }

    fn parameters_schema(&self) -> JsonValue {
        json!({
            "type": "object",
            "properties": {
                "ms": {"type": "integer", "description": "Milliseconds to wait"},
                "value": {"type": "any", "description": "Value returned after the wait"}
            },
            "required": ["ms"]
        })
    }

    async fn execute(&self, params: JsonValue) -> ToolResult {
        let args: DelayArgs = parse_params(params)?;
        if args.ms > MAX_DELAY_MS {
            return Ok(ToolOutcome::failed(format!(
                "ms must be at most {MAX_DELAY_MS}"
            )));
        }
        tokio::time::sleep(Duration::from_millis(args.ms)).await;
        Ok(ToolOutcome::ok(args.value))
    }
}
