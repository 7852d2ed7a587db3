//! `toolwire tools`

use anyhow::Result;

use crate::cli::RemoteArgs;
use crate::commands::connect;
use crate::output;

pub async fn handle(remote: RemoteArgs) -> Result<()> {
    let client = connect(&remote).await?;
    let tools = client.list_tools().await?;
    client.disconnect();

    if tools.is_empty() {
        output::dim("Server has no tools registered");
        return Ok(());
    }

    output::header(&format!("{} tools on {}", tools.len(), client.config().server_url));
    output::tools(&tools);
    Ok(())
}
