//! Divination MCP server: entry point.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use divination_mcp::client::{run_binding, sample_arguments, ClientBinding, Deadlines};
use divination_mcp::config::{CliOverrides, ServerConfig, TransportKind, DEFAULT_HOST, DEFAULT_PORT};
use divination_mcp::tools::default_registry;
use divination_mcp::transport::StdioTransport;
use divination_mcp::types::{InitializeResult, SERVER_NAME};

#[derive(Parser)]
#[command(
    name = "divination-mcp",
    about = "MCP server for six-line (六爻) divination charting",
    version
)]
struct Cli {
    #[command(flatten)]
    serve: ServeArgs,

    /// Log level (trace, debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Clone, Default)]
struct ServeArgs {
    /// Transport to serve on. Also reads DIVINATION_MCP_TRANSPORT.
    #[arg(short, long, value_enum)]
    transport: Option<TransportKind>,

    /// HTTP listen host. Also reads DIVINATION_MCP_HOST.
    #[arg(long)]
    host: Option<String>,

    /// HTTP listen port. Also reads DIVINATION_MCP_PORT.
    #[arg(long)]
    port: Option<u16>,

    /// Streamable HTTP: answer with JSON bodies instead of event streams.
    /// Also reads DIVINATION_MCP_JSON_RESPONSE.
    #[arg(long)]
    json_response: bool,
}

impl ServeArgs {
    /// Subcommand flags win over the top-level ones.
    fn merged_over(self, outer: ServeArgs) -> CliOverrides {
        CliOverrides {
            transport: self.transport.or(outer.transport),
            host: self.host.or(outer.host),
            port: self.port.or(outer.port),
            json_response: self.json_response || outer.json_response,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start the MCP server (default).
    Serve(ServeArgs),

    /// Print server capabilities and tools as JSON.
    Info,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   divination-mcp completions bash > ~/.local/share/bash-completion/completions/divination-mcp
    ///   divination-mcp completions zsh > ~/.zfunc/_divination-mcp
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },

    /// Run the demo client: initialize, list tools, call the first tool.
    Client {
        /// Binding to connect over.
        #[arg(short, long, value_enum, default_value_t = TransportKind::Stdio)]
        transport: TransportKind,

        /// Server URL for sse / streamable-http. Defaults to the local server.
        #[arg(long)]
        url: Option<String>,

        /// Server command for stdio. Defaults to this binary.
        #[arg(long)]
        server: Option<String>,

        /// Extra arguments for the stdio server command (after `--`).
        #[arg(last = true)]
        server_args: Vec<String>,

        /// Tool arguments as JSON. Defaults to a fixed sample cast.
        #[arg(long)]
        arguments: Option<String>,

        /// Seconds to wait for initialize.
        #[arg(long, default_value_t = 30)]
        init_timeout: u64,

        /// Seconds to wait for tools/list.
        #[arg(long, default_value_t = 10)]
        list_timeout: u64,

        /// Seconds to wait for tools/call.
        #[arg(long, default_value_t = 30)]
        call_timeout: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command.unwrap_or_else(|| Commands::Serve(ServeArgs::default())) {
        Commands::Serve(args) => {
            let config = ServerConfig::resolve(args.merged_over(cli.serve))?;
            serve(config).await?;
        }

        Commands::Info => {
            let capabilities = InitializeResult::for_server();
            let tools = default_registry()?.list_tools();
            let info = serde_json::json!({
                "server": capabilities.server_info,
                "protocol_version": capabilities.protocol_version,
                "capabilities": capabilities.capabilities,
                "transports": ["stdio", "sse", "streamable-http"],
                "tools": tools.iter().map(|t| &t.name).collect::<Vec<_>>(),
                "tool_count": tools.len(),
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "divination-mcp", &mut std::io::stdout());
        }

        Commands::Client {
            transport,
            url,
            server,
            server_args,
            arguments,
            init_timeout,
            list_timeout,
            call_timeout,
        } => {
            let binding = client_binding(transport, url, server, server_args)?;
            let arguments = match arguments {
                Some(raw) => serde_json::from_str(&raw).context("--arguments is not valid JSON")?,
                None => sample_arguments(),
            };
            let deadlines = Deadlines {
                initialize: Duration::from_secs(init_timeout),
                list_tools: Duration::from_secs(list_timeout),
                call_tool: Duration::from_secs(call_timeout),
            };
            if let Err(e) = run_binding(&binding, &deadlines, arguments).await {
                tracing::error!("Demo failed at {}: {}", e.step, e.source);
                return Err(e.into());
            }
        }
    }

    Ok(())
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let registry = Arc::new(default_registry()?);
    tracing::info!("Starting {SERVER_NAME} {} server", config.transport);

    let outcome = match config.transport {
        TransportKind::Stdio => StdioTransport::new(registry).run().await,
        #[cfg(feature = "http")]
        TransportKind::Sse => {
            divination_mcp::transport::SseTransport::new(registry, &config.http)
                .run(&config.bind_addr())
                .await
        }
        #[cfg(feature = "http")]
        TransportKind::StreamableHttp => {
            divination_mcp::transport::StreamableHttpTransport::new(registry, &config.http)
                .run(&config.bind_addr())
                .await
        }
        #[cfg(not(feature = "http"))]
        other => anyhow::bail!("The {other} transport requires the `http` feature"),
    };

    match outcome {
        Ok(()) => {
            tracing::info!("{SERVER_NAME} server stopped");
            Ok(())
        }
        Err(e) => {
            tracing::error!("{SERVER_NAME} server failed: {e}");
            Err(e.into())
        }
    }
}

fn client_binding(
    transport: TransportKind,
    url: Option<String>,
    server: Option<String>,
    server_args: Vec<String>,
) -> anyhow::Result<ClientBinding> {
    let local = |path: &str| format!("http://{DEFAULT_HOST}:{DEFAULT_PORT}{path}");
    let binding = match transport {
        TransportKind::Stdio => {
            let command = match server {
                Some(command) => command,
                None => std::env::current_exe()
                    .context("Cannot locate the server binary")?
                    .to_string_lossy()
                    .into_owned(),
            };
            let args = if server_args.is_empty() {
                vec!["serve".to_string(), "--transport".to_string(), "stdio".to_string()]
            } else {
                server_args
            };
            ClientBinding::Stdio { command, args }
        }
        #[cfg(feature = "http")]
        TransportKind::Sse => ClientBinding::Sse {
            url: url.unwrap_or_else(|| local("/sse")),
        },
        #[cfg(feature = "http")]
        TransportKind::StreamableHttp => ClientBinding::StreamableHttp {
            url: url.unwrap_or_else(|| local("/mcp")),
        },
        #[cfg(not(feature = "http"))]
        other => {
            let _ = (url, local);
            anyhow::bail!("The {other} client requires the `http` feature")
        }
    };
    Ok(binding)
}
