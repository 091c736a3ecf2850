//! Command-line interface for clickhouse-bridge
//!
//! # Usage Examples
//!
//! ## HTTP API
//! ```bash
//! clickhouse-bridge serve --listen 0.0.0.0:8080 --batch-size 5000
//! ```
//!
//! ## One-off operations
//! ```bash
//! # Check a ClickHouse connection
//! clickhouse-bridge connect --config clickhouse.json
//!
//! # List the columns of a flat file
//! clickhouse-bridge schemas --config file.json
//!
//! # Copy a table into a flat file
//! clickhouse-bridge ingest --request ingest.json
//! ```
//!
//! The JSON files hold the same bodies the HTTP API accepts.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use clickhouse_bridge::server::{run_server, AppState};
use clickhouse_bridge::{operations, DEFAULT_BATCH_SIZE};
use serde::de::DeserializeOwned;
use serde_json::json;
use sync_core::{Config, IngestRequest};
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "clickhouse-bridge")]
#[command(about = "Move tables between ClickHouse and delimited flat files")]
#[command(long_about = None)]
struct Cli {
    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "text",
        env = "BRIDGE_LOG_FORMAT",
        global = true
    )]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0:8080", env = "BRIDGE_LISTEN")]
        listen: SocketAddr,

        /// Rows per batch when a request does not set batchSize
        #[arg(
            long,
            default_value_t = DEFAULT_BATCH_SIZE,
            env = "BRIDGE_BATCH_SIZE",
            value_parser = parse_batch_size
        )]
        batch_size: usize,
    },

    /// Check that the configured endpoint is reachable
    Connect {
        /// JSON file with the connection configuration
        #[arg(long, value_name = "PATH")]
        config: PathBuf,
    },

    /// Print the schemas the configured endpoint exposes
    Schemas {
        /// JSON file with the connection configuration
        #[arg(long, value_name = "PATH")]
        config: PathBuf,
    },

    /// Run one transfer
    Ingest {
        /// JSON file with the ingest request
        #[arg(long, value_name = "PATH")]
        request: PathBuf,

        /// Rows per batch when the request does not set batchSize
        #[arg(
            long,
            default_value_t = DEFAULT_BATCH_SIZE,
            env = "BRIDGE_BATCH_SIZE",
            value_parser = parse_batch_size
        )]
        batch_size: usize,
    },
}

fn parse_batch_size(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("batch size must be a positive integer".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(format!("invalid batch size {s:?}: {e}")),
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    // stdout is reserved for command results
    match format {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .json()
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Commands::Serve { listen, batch_size } => {
            run_server(listen, AppState { batch_size })
                .await
                .with_context(|| format!("Server on {listen} failed"))?;
        }
        Commands::Connect { config } => {
            let config: Config = read_json(&config)?;
            operations::connect(&config)
                .await
                .with_context(|| format!("Failed to connect to {}", config.source))?;
            println!("{}", json!({"status": "connected"}));
        }
        Commands::Schemas { config } => {
            let config: Config = read_json(&config)?;
            let schemas = operations::schemas(&config)
                .await
                .with_context(|| format!("Failed to discover schemas from {}", config.source))?;
            println!("{}", serde_json::to_string_pretty(&schemas)?);
        }
        Commands::Ingest {
            request,
            batch_size,
        } => {
            let request: IngestRequest = read_json(&request)?;
            let outcome = operations::ingest(&request, batch_size).await;
            let count = outcome.rows_transferred;
            outcome.into_result().with_context(|| {
                format!(
                    "Transfer {} -> {} failed after {count} rows",
                    request.source, request.target
                )
            })?;
            println!("{}", json!({"count": count}));
        }
    }

    Ok(())
}
