//! `toolwire call`

use anyhow::{Result, anyhow, bail};
use serde_json::Value as JsonValue;

use crate::cli::RemoteArgs;
use crate::commands::connect;
use crate::output;

pub fn parse_params(raw: &str) -> Result<JsonValue> {
    let params: JsonValue =
        serde_json::from_str(raw).map_err(|e| anyhow!("Invalid JSON parameters: {e}"))?;
    if !params.is_object() {
        bail!("Parameters must be a JSON object");
    }
    Ok(params)
}

pub async fn handle(tool: &str, raw_params: &str, remote: RemoteArgs) -> Result<()> {
    let params = parse_params(raw_params)?;
    let client = connect(&remote).await?;

    let spinner = output::spinner(&format!("Calling {tool}..."));
    let result = client.call_tool(tool, params).await;
    client.disconnect();

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            output::spinner_error(&spinner, &format!("{tool} failed [{}]", e.code()));
            return Err(e.into());
        }
    };

    let elapsed = outcome.execution_time.unwrap_or_default();
    if outcome.success {
        output::spinner_success(&spinner, &format!("{tool} completed in {elapsed}ms"));
    } else {
        output::spinner_error(&spinner, &format!("{tool} reported a failure after {elapsed}ms"));
    }
    output::data("result", &outcome);

    if !outcome.success {
        bail!(outcome.error.unwrap_or_else(|| "tool reported failure".to_string()));
    }
    Ok(())
}
