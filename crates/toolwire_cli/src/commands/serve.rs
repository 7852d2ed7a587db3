//! `toolwire serve`

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use toolwire_server::{ServerConfig, ServerEvent, ToolServer};
use tracing::info;

use crate::cli::ServeArgs;
use crate::output;

/// File (or environment) first, then flags on top.
pub fn build_config(args: &ServeArgs) -> Result<ServerConfig> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => ServerConfig::from_env(),
    };

    if let Some(host) = &args.host {
        config.host = host.clone();
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(max) = args.max_connections {
        config.max_connections = max;
    }
    if let Some(tools) = &args.tools {
        config.tools = tools.clone();
    }

    config.validate()?;
    Ok(config)
}

pub async fn handle(args: ServeArgs) -> Result<()> {
    let config = build_config(&args)?;
    let mut server = ToolServer::new(config);
    let mut events = server.subscribe();

    let addr = server.start().await?;
    output::success(&format!("Listening on tcp://{addr}"));
    output::kv("tools", &server.config().tools.join(", "));
    output::kv("max connections", &server.config().max_connections.to_string());
    output::dim("Press Ctrl-C to stop");

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                break;
            }
            event = events.recv() => match event {
                Ok(ServerEvent::ConnectionRejected { peer }) => {
                    output::warning(&format!("Rejected {peer}: server busy"));
                }
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    info!("Shutting down");
    server.stop().await;
    output::success("Server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_flags_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = 9100\nmax_connections = 4\ntools = [\"echo\"]").unwrap();

        let args = ServeArgs {
            config: Some(file.path().to_path_buf()),
            port: Some(0),
            tools: Some(vec!["echo".to_string(), "bash".to_string()]),
            ..Default::default()
        };
        let config = build_config(&args).unwrap();

        assert_eq!(config.port, 0);
        assert_eq!(config.max_connections, 4);
        assert_eq!(config.tools, vec!["echo", "bash"]);
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let args = ServeArgs {
            max_connections: Some(0),
            ..Default::default()
        };
        assert!(build_config(&args).is_err());
    }

    #[test]
    fn test_missing_config_file() {
        let args = ServeArgs {
            config: Some("/nonexistent/toolwire.toml".into()),
            ..Default::default()
        };
        let err = build_config(&args).unwrap_err();
        assert!(err.to_string().contains("Failed to load"));
    }
}
