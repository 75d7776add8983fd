//! Sealdrop server binary

use clap::Parser;
use sealdrop_server::{run_server, ServerConfig};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "sealdrop-server")]
#[command(about = "Zero-trust storage and rendezvous server for end-to-end encrypted file sharing")]
#[command(version)]
struct Args {
    /// Host to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0", env = "SEALDROP_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "7600", env = "SEALDROP_PORT")]
    port: u16,

    /// SQLite database file
    #[arg(long, default_value = "data/sealdrop.db", env = "SEALDROP_DB")]
    database: PathBuf,

    /// Directory for ciphertext blobs
    #[arg(long, default_value = "storage", env = "SEALDROP_BLOBS")]
    blob_dir: PathBuf,

    /// Session lifetime in seconds
    #[arg(long, default_value = "86400", env = "SEALDROP_SESSION_TTL")]
    session_ttl: i64,

    /// Enable debug logging
    #[arg(short, long, env = "SEALDROP_DEBUG")]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig {
        host: args.host,
        port: args.port,
        database_path: args.database,
        blob_dir: args.blob_dir,
        session_ttl_secs: args.session_ttl,
        ..ServerConfig::default()
    };

    run_server(config).await
}
