//! Command dispatch.

pub mod call;
pub mod ping;
pub mod serve;
pub mod tools;

use std::time::Duration;

use anyhow::{Context, Result};
use toolwire_client::{ClientConfig, ToolClient};

use crate::cli::{Cli, Command, RemoteArgs};

pub async fn handle(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Serve(args) => serve::handle(args).await,
        Command::Tools { remote } => tools::handle(remote).await,
        Command::Call {
            tool,
            params,
            remote,
        } => call::handle(&tool, &params, remote).await,
        Command::Ping { remote } => ping::handle(remote).await,
    }
}

/// Client settings from the environment with flag overrides. One-shot
/// commands never retry, so an unreachable server fails immediately.
pub fn client_config(remote: &RemoteArgs) -> ClientConfig {
    let mut config = ClientConfig::from_env().with_max_reconnect_attempts(0);
    if let Some(url) = &remote.url {
        config.server_url = url.clone();
    }
    if let Some(ms) = remote.timeout_ms {
        config.timeout = Duration::from_millis(ms);
    }
    config
}

pub async fn connect(remote: &RemoteArgs) -> Result<ToolClient> {
    let config = client_config(remote);
    let url = config.server_url.clone();
    let client = ToolClient::new(config);
    client
        .connect()
        .await
        .with_context(|| format!("Cannot reach {url}"))?;
    Ok(client)
}
