//! # Confluence MCP CLI (`confluence-mcp`)
//!
//! Serves read-only Confluence tools over MCP, and runs the same tools from
//! the command line for quick checks.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `confluence-mcp serve stdio` | MCP over stdin/stdout (what MCP hosts spawn) |
//! | `confluence-mcp serve http` | MCP over Streamable HTTP at `[server].bind` |
//! | `confluence-mcp search "<CQL>"` | Run `confluence_search` and print the result |
//! | `confluence-mcp get <ID>` | Run `confluence_get_content` and print the result |
//! | `confluence-mcp validate "<CQL>"` | Check CQL syntax without contacting the site |
//!
//! ## Examples
//!
//! ```bash
//! export CONFLUENCE_HOSTING=cloud
//! export CONFLUENCE_BASE_URL=https://acme.atlassian.net
//! export CONFLUENCE_EMAIL=me@acme.com CONFLUENCE_API_TOKEN=...
//!
//! confluence-mcp search 'type = page AND text ~ "deploy" ORDER BY lastmodified DESC' --limit 5
//! confluence-mcp get 123456 --representation view --labels
//! confluence-mcp --config ./confluence-mcp.toml serve http
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use confluence_mcp::config::{self, Config, LogConfig};
use confluence_mcp::confluence::create_gateway;
use confluence_mcp::cql::validate_cql;
use confluence_mcp::diagnostics::TracingDiagnostics;
use confluence_mcp::mcp::McpBridge;
use confluence_mcp::server;
use confluence_mcp::tools::{
    ToolContext, ToolRegistry, GET_CONTENT_TOOL_NAME, SEARCH_TOOL_NAME,
};

/// Read-only Confluence search and retrieval for AI tools over MCP.
///
/// Settings come from a TOML file (`--config`) and `CONFLUENCE_*`
/// environment variables, which override the file. A `.env` file in the
/// working directory is loaded first.
#[derive(Parser)]
#[command(name = "confluence-mcp", version)]
struct Cli {
    /// Path to configuration file (TOML). Without it, only the
    /// environment is used.
    #[arg(long, global = true, env = "CONFLUENCE_MCP_CONFIG")]
    config: Option<PathBuf>,

    /// Emit stderr logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the MCP server.
    Serve {
        #[command(subcommand)]
        transport: Transport,
    },

    /// Search with CQL.
    Search {
        /// CQL query, e.g. `type = page AND space = OPS`.
        cql: String,

        /// Maximum number of results (capped by `search_max_limit`).
        #[arg(long)]
        limit: Option<u32>,

        /// Offset of the first result.
        #[arg(long)]
        start: Option<u32>,

        /// Print JSON instead of Markdown.
        #[arg(long)]
        json: bool,
    },

    /// Fetch one page or blog post by id.
    Get {
        /// Content id.
        id: String,

        /// Body representation: storage, view or export_view.
        #[arg(long)]
        representation: Option<String>,

        /// Include labels.
        #[arg(long)]
        labels: bool,

        /// Maximum body characters.
        #[arg(long)]
        max_chars: Option<u64>,

        /// Print JSON instead of Markdown.
        #[arg(long)]
        json: bool,
    },

    /// Check CQL syntax. Prints `ok` or the first problem found.
    Validate {
        /// CQL query to check.
        cql: String,
    },
}

/// MCP transports.
#[derive(Subcommand)]
enum Transport {
    /// JSON-RPC over stdin/stdout.
    Stdio,
    /// Streamable HTTP at `[server].bind`.
    Http,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { cql } => match validate_cql(&cql) {
            Ok(()) => println!("ok"),
            Err(e) => {
                println!("{}", e);
                std::process::exit(1);
            }
        },
        Commands::Serve { transport } => {
            let cfg = load(cli.config.as_deref())?;
            init_tracing(cli.log_json, &cfg.log)?;
            let bind = cfg.server.bind.clone();
            let bridge = McpBridge::from_config(cfg);
            match transport {
                Transport::Stdio => server::run_stdio(bridge).await?,
                Transport::Http => server::run_http(bridge, &bind).await?,
            }
        }
        Commands::Search {
            cql,
            limit,
            start,
            json,
        } => {
            let cfg = load(cli.config.as_deref())?;
            init_tracing(cli.log_json, &cfg.log)?;
            let mut params = json!({ "cql": cql, "asMarkdown": !json });
            if let Some(limit) = limit {
                params["limit"] = json!(limit);
            }
            if let Some(start) = start {
                params["start"] = json!(start);
            }
            run_tool(cfg, SEARCH_TOOL_NAME, params).await?;
        }
        Commands::Get {
            id,
            representation,
            labels,
            max_chars,
            json,
        } => {
            let cfg = load(cli.config.as_deref())?;
            init_tracing(cli.log_json, &cfg.log)?;
            let mut params = json!({ "id": id, "includeLabels": labels, "asMarkdown": !json });
            if let Some(representation) = representation {
                params["representation"] = json!(representation);
            }
            if let Some(max_chars) = max_chars {
                params["bodyMaxChars"] = json!(max_chars);
            }
            run_tool(cfg, GET_CONTENT_TOOL_NAME, params).await?;
        }
    }

    Ok(())
}

/// File plus environment when `--config` is given, environment alone otherwise.
fn load(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => config::load_config(path),
        None => Config::from_env_only(),
    }
}

/// Runs one tool the way the MCP server would and prints its text output.
async fn run_tool(cfg: Config, name: &str, params: Value) -> anyhow::Result<()> {
    let gateway = create_gateway(&cfg, Arc::new(TracingDiagnostics));
    let ctx = ToolContext::new(Arc::new(cfg), gateway);
    let registry = ToolRegistry::with_builtins();

    let tool = registry
        .find(name)
        .ok_or_else(|| anyhow::anyhow!("no tool registered with name: {}", name))?;
    let output = tool.execute(params, &ctx).await?;

    if output.is_error {
        eprintln!("{}", output.text);
        std::process::exit(1);
    }
    println!("{}", output.text);
    Ok(())
}

/// Logs go to stderr: in stdio mode stdout belongs to the MCP client.
/// With `[log].file` set, a second plain-text sink appends to that file
/// at `[log].level`, independent of `RUST_LOG`.
fn init_tracing(json: bool, log: &LogConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr = if json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer().with_writer(std::io::stderr).boxed()
    };

    let file_layer = match log.file.as_deref() {
        Some(path) => {
            let path = Path::new(path);
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Arc::new(file))
                    .with_filter(log.level_filter()?),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stderr.with_filter(filter))
        .with(file_layer)
        .try_init()?;
    Ok(())
}
