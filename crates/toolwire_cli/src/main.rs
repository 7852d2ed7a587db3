//! CLI entry point for toolwire.

mod cli;
mod commands;
mod output;

use clap::Parser;
use toolwire_observability::ObservabilityConfig;

use crate::cli::{Cli, Command};

/// Servers log at info by default; one-shot client commands stay quiet
/// unless `--verbose` or `TOOLWIRE_LOG`/`RUST_LOG` say otherwise.
fn observability_config(cli: &Cli) -> ObservabilityConfig {
    let mut config = ObservabilityConfig::from_env();
    let serving = matches!(cli.command, Command::Serve(_));
    if serving {
        config.service_name = "toolwire-server".to_string();
    }
    if cli.verbose {
        config.log_level = Some("debug".to_string());
    } else if config.log_level.is_none() {
        config.log_level = Some(if serving { "info" } else { "warn" }.to_string());
    }
    config.with_version(env!("CARGO_PKG_VERSION"))
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    output::init(cli.output);

    if let Err(e) = toolwire_observability::init(observability_config(&cli)) {
        output::warning(&format!("Logging init failed (continuing): {e}"));
    }

    let result = commands::handle(cli).await;
    toolwire_observability::shutdown();

    if let Err(e) = result {
        output::error(&format!("{e:#}"));
        std::process::exit(1);
    }
}
