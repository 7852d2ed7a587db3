//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Serve and call tools over the toolwire protocol
#[derive(Parser, Debug)]
#[command(name = "toolwire", about, version, propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format: text (human-readable) or json (machine-readable)
    #[arg(short, long, global = true, default_value = "text")]
    pub output: OutputFormat,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Colored terminal output for humans
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a tool server until Ctrl-C
    Serve(ServeArgs),
    /// List the tools a server exposes
    Tools {
        #[command(flatten)]
        remote: RemoteArgs,
    },
    /// Invoke a tool on a server
    Call {
        /// Tool name (e.g. echo)
        tool: String,
        /// Parameters as a JSON object
        #[arg(default_value = "{}")]
        params: String,
        #[command(flatten)]
        remote: RemoteArgs,
    },
    /// Measure one PING/PONG round trip
    Ping {
        #[command(flatten)]
        remote: RemoteArgs,
    },
}

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// TOML configuration file; flags override its values
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind; 0 picks a free one
    #[arg(long)]
    pub port: Option<u16>,

    #[arg(long)]
    pub max_connections: Option<usize>,

    /// Comma-separated built-in tools (echo, delay, bash)
    #[arg(long, value_delimiter = ',')]
    pub tools: Option<Vec<String>>,
}

#[derive(Args, Debug, Default)]
pub struct RemoteArgs {
    /// Server address, e.g. tcp://127.0.0.1:8080 (default: TOOLWIRE_SERVER_URL)
    #[arg(long)]
    pub url: Option<String>,

    /// Request timeout in milliseconds (default: TOOLWIRE_TIMEOUT_MS)
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_serve_flags() {
        let cli = Cli::try_parse_from([
            "toolwire",
            "serve",
            "--port",
            "0",
            "--max-connections",
            "3",
            "--tools",
            "echo,bash",
        ])
        .unwrap();

        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.port, Some(0));
        assert_eq!(args.max_connections, Some(3));
        assert_eq!(args.tools, Some(vec!["echo".to_string(), "bash".to_string()]));
        assert!(args.host.is_none());
    }

    #[test]
    fn test_parse_call_with_globals() {
        let cli = Cli::try_parse_from([
            "toolwire",
            "call",
            "echo",
            r#"{"v": 1}"#,
            "--url",
            "tcp://10.0.0.1:9000",
            "-o",
            "json",
            "-v",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.output, OutputFormat::Json);
        let Command::Call { tool, params, remote } = cli.command else {
            panic!("expected call");
        };
        assert_eq!(tool, "echo");
        assert_eq!(params, r#"{"v": 1}"#);
        assert_eq!(remote.url.as_deref(), Some("tcp://10.0.0.1:9000"));
    }

    #[test]
    fn test_call_params_default_to_empty_object() {
        let cli = Cli::try_parse_from(["toolwire", "call", "delay"]).unwrap();
        let Command::Call { params, .. } = cli.command else {
            panic!("expected call");
        };
        assert_eq!(params, "{}");
    }
}
