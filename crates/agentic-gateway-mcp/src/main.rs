//! AgenticGateway MCP Server — entry point.

use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use agentic_gateway::AsyncJobManager;

use agentic_gateway_mcp::config::resolve_config;
use agentic_gateway_mcp::protocol::ProtocolHandler;
use agentic_gateway_mcp::publish::{advertise, LogPublisher};
use agentic_gateway_mcp::tools::ToolRegistry;
use agentic_gateway_mcp::transport::StdioTransport;
use agentic_gateway_mcp::types::{Transport, PROTOCOL_VERSION, SERVER_CAPABILITIES};

#[derive(Parser)]
#[command(
    name = "agentic-gateway-mcp",
    about = "MCP-style protocol gateway — version negotiation and trackable async tool jobs",
    version
)]
struct Cli {
    /// Maximum concurrent non-terminal jobs.
    #[arg(long)]
    max_jobs: Option<usize>,

    /// Job record time-to-live, in seconds.
    #[arg(long)]
    job_ttl: Option<u64>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway over stdio (default).
    Serve {
        /// Publish server metadata to the registry on startup.
        #[arg(long)]
        advertise: bool,
    },

    /// Start the gateway over HTTP.
    #[cfg(feature = "http")]
    ServeHttp {
        /// Listen address (host:port).
        #[arg(long, default_value = "127.0.0.1:3200")]
        addr: String,

        /// Bearer token for authentication.
        /// Also reads from GATEWAY_TOKEN env var.
        #[arg(long)]
        token: Option<String>,

        /// Publish server metadata to the registry on startup.
        #[arg(long)]
        advertise: bool,
    },

    /// Print server version, capabilities, and tools as JSON.
    Info,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   agentic-gateway-mcp completions bash > ~/.local/share/bash-completion/completions/agentic-gateway-mcp
    ///   agentic-gateway-mcp completions zsh > ~/.zfunc/_agentic-gateway-mcp
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },

    /// Launch interactive REPL mode.
    Repl,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command.unwrap_or(Commands::Serve { advertise: false }) {
        Commands::Serve { advertise: publish } => {
            let config = resolve_config(cli.max_jobs, cli.job_ttl, publish);
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(async {
                let handler = build_handler(&config, Transport::Stdio);
                if config.advertise {
                    advertise(&handler, Transport::Stdio, &LogPublisher).await;
                }
                let transport = StdioTransport::new(handler);
                transport.run().await
            })?;
        }

        #[cfg(feature = "http")]
        Commands::ServeHttp {
            addr,
            token,
            advertise: publish,
        } => {
            use agentic_gateway_mcp::transport::HttpTransport;

            let config = resolve_config(cli.max_jobs, cli.job_ttl, publish);
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(async {
                let handler = build_handler(&config, Transport::Http);
                if config.advertise {
                    advertise(&handler, Transport::Http, &LogPublisher).await;
                }

                // Resolve token: CLI flag > env var.
                let effective_token = token.or_else(|| std::env::var("GATEWAY_TOKEN").ok());
                if effective_token.is_some() {
                    tracing::info!("Auth: bearer token required");
                }

                let transport = HttpTransport::with_config(effective_token, handler);
                transport.run(&addr).await
            })?;
        }

        Commands::Info => {
            let tools = ToolRegistry::with_builtins();
            let info = serde_json::json!({
                "server": {
                    "name": "agentic-gateway-mcp",
                    "version": env!("CARGO_PKG_VERSION"),
                },
                "mcp_version": PROTOCOL_VERSION,
                "capabilities": SERVER_CAPABILITIES,
                "tools": tools.list().iter().map(|t| t.tool_id.clone()).collect::<Vec<_>>(),
                "tool_count": tools.len(),
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(
                shell,
                &mut cmd,
                "agentic-gateway-mcp",
                &mut std::io::stdout(),
            );
        }

        Commands::Repl => {
            let config = resolve_config(cli.max_jobs, cli.job_ttl, false);
            agentic_gateway_mcp::repl::run(config)?;
        }
    }

    Ok(())
}

fn build_handler(
    config: &agentic_gateway_mcp::GatewayConfig,
    transport: Transport,
) -> ProtocolHandler {
    let tools = Arc::new(ToolRegistry::with_builtins());
    let jobs = Arc::new(AsyncJobManager::new(config.job_manager_config()));
    ProtocolHandler::new(tools, jobs).with_transport(transport)
}
