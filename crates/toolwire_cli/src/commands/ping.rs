//! `toolwire ping`

use anyhow::Result;

use crate::cli::RemoteArgs;
use crate::commands::connect;
use crate::output;

pub async fn handle(remote: RemoteArgs) -> Result<()> {
    let client = connect(&remote).await?;
    let rtt = client.ping().await;
    client.disconnect();

    let rtt = rtt?;
    let url = &client.config().server_url;
    if output::is_json() {
        output::data("pong", &serde_json::json!({ "url": url, "rttMs": rtt.as_secs_f64() * 1000.0 }));
    } else {
        output::success(&format!("PONG from {url} in {:.2}ms", rtt.as_secs_f64() * 1000.0));
    }
    Ok(())
}
