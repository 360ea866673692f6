//! SysML MCP server CLI

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use sysml_mcp::{
    api,
    backend,
    config::{BackendKind, ServerConfig},
    oauth::SystemClock,
    AppState,
};
use tracing::{debug, info, Level};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(name = "sysml-mcp")]
#[command(about = "MCP server exposing SysML v2 projects and elements", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML)
    #[arg(short, long, global = true, env = "SYSML_MCP_CONFIG")]
    config: Option<PathBuf>,

    /// Set log level (RUST_LOG takes precedence when set)
    #[arg(short, long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Listen address (overrides server.bind_addr)
        #[arg(long)]
        addr: Option<SocketAddr>,

        /// Require a bearer token on /mcp
        #[arg(long)]
        require_auth: bool,

        /// Model store to use
        #[arg(long, value_enum)]
        backend: Option<BackendArg>,
    },

    /// Print the effective configuration with secrets masked
    Config,
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendArg {
    Http,
    Memory,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Http => BackendKind::Http,
            BackendArg::Memory => BackendKind::Memory,
        }
    }
}

fn init_tracing(log_level: &str) {
    let level = match log_level {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Keep HTTP client internals quiet unless asked for
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "sysml_mcp={level},tower_http={level},hyper=warn,reqwest=warn",
            level = level.as_str().to_lowercase()
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr) // Write logs to stderr, not stdout
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    debug!("SysML MCP v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut config =
        ServerConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Config => {
            print!("{}", config.redacted()?);
        }
        Commands::Serve {
            addr,
            require_auth,
            backend: backend_arg,
        } => {
            if let Some(addr) = addr {
                config.server.bind_addr = addr.to_string();
            }
            if require_auth {
                config.auth.require_auth = true;
            }
            if let Some(kind) = backend_arg {
                config.backend.kind = kind.into();
            }
            config.validate()?;

            let addr: SocketAddr = config
                .server
                .bind_addr
                .parse()
                .with_context(|| format!("Invalid bind address '{}'", config.server.bind_addr))?;

            let backend = backend::from_config(&config.backend)?;
            let state = AppState::from_config(&config, backend, Arc::new(SystemClock))?;

            info!(
                "Starting SysML MCP server v{} ({} OAuth clients)",
                env!("CARGO_PKG_VERSION"),
                config.auth.clients.len()
            );
            api::serve(addr, state).await?;
        }
    }

    Ok(())
}
