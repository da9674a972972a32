//! DriftKV CLI Client
//!
//! Command-line interface for talking to a DriftKV server.

use clap::{Parser, Subcommand};
use driftkv::{Client, ClientConfig};
use tracing_subscriber::{fmt, EnvFilter};

/// DriftKV CLI
#[derive(Parser, Debug)]
#[command(name = "driftkv-cli")]
#[command(about = "CLI for the DriftKV key-value store")]
#[command(version)]
struct Args {
    /// Server address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:6411")]
    server: String,

    /// Per-call timeout in milliseconds
    #[arg(short, long, default_value = "10000")]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,

        /// Expiration in seconds
        #[arg(short, long)]
        duration: Option<u64>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,driftkv=debug"));

    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();

    let config = ClientConfig::builder()
        .server_addr(&args.server)
        .call_timeout_ms(args.timeout_ms)
        .build();

    let client = match Client::with_config(config).await {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to connect to {}: {}", args.server, e);
            std::process::exit(1);
        }
    };

    let result = match &args.command {
        Commands::Get { key } => client.get(key).await,
        Commands::Set {
            key,
            value,
            duration,
        } => client.set(key, value.clone().into_bytes(), *duration).await,
    };

    match result {
        Ok(value) => println!("{}", value),
        Err(e) => {
            tracing::error!("Request failed: {}", e);
            std::process::exit(1);
        }
    }

    client.close();
}
