//! Snapshare server binary.
//!
//! # Usage
//!
//! ```bash
//! # Development: self-signed certificate, uploads kept in memory
//! snapshare-server --bind 0.0.0.0:4433
//!
//! # Production: real certificate, uploads on disk
//! snapshare-server --bind 0.0.0.0:4433 --cert cert.pem --key key.pem --upload-dir ./uploads
//! ```

use std::path::PathBuf;

use clap::Parser;
use snapshare_server::{
    AssetConfig, AssetStore, DEFAULT_OUTBOUND_QUEUE_DEPTH, DEFAULT_SEED_GROUPS, DiskAssetStore,
    DriverConfig, MemoryAssetStore, Server, ServerError, ServerRuntimeConfig,
    assets::DEFAULT_MAX_UPLOAD_BYTES,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Snapshare group messaging and photo sharing server
#[derive(Parser, Debug)]
#[command(name = "snapshare-server")]
#[command(about = "Real-time group messaging and photo distribution server")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = "0.0.0.0:4433")]
    bind: String,

    /// Path to TLS certificate (PEM format)
    #[arg(short, long)]
    cert: Option<PathBuf>,

    /// Path to TLS private key (PEM format)
    #[arg(short, long)]
    key: Option<PathBuf>,

    /// Maximum concurrent connections
    #[arg(long, default_value_t = 10_000)]
    max_connections: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Directory for uploaded photos (kept in memory when omitted)
    #[arg(long)]
    upload_dir: Option<PathBuf>,

    /// Largest accepted upload in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    max_upload_bytes: usize,

    /// Group that exists at startup (repeatable)
    #[arg(long = "seed-group", default_values_t = DEFAULT_SEED_GROUPS.map(String::from))]
    seed_groups: Vec<String>,

    /// Frames buffered per connection before deliveries are dropped
    #[arg(long, default_value_t = DEFAULT_OUTBOUND_QUEUE_DEPTH)]
    outbound_queue: usize,
}

impl Args {
    fn into_config(self) -> ServerRuntimeConfig {
        ServerRuntimeConfig {
            bind_address: self.bind,
            cert_path: self.cert,
            key_path: self.key,
            driver: DriverConfig {
                max_connections: self.max_connections,
                seed_groups: self.seed_groups,
            },
            assets: AssetConfig { max_bytes: self.max_upload_bytes, ..Default::default() },
            upload_dir: self.upload_dir,
            outbound_queue_depth: self.outbound_queue,
        }
    }
}

async fn serve<S: AssetStore>(config: ServerRuntimeConfig, store: S) -> Result<(), ServerError> {
    let server = Server::bind(config, store)?;
    let addr = server.local_addr()?;
    tracing::info!(%addr, "listening");
    server.run().await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let config = args.into_config();
    tracing::info!(
        bind = %config.bind_address,
        groups = ?config.driver.seed_groups,
        "snapshare server starting"
    );

    match config.upload_dir.clone() {
        Some(dir) => {
            let store = DiskAssetStore::open(&dir)?;
            tracing::info!(dir = %dir.display(), "storing uploads on disk");
            serve(config, store).await?;
        },
        None => {
            tracing::warn!("no --upload-dir given; uploads are kept in memory");
            serve(config, MemoryAssetStore::new()).await?;
        },
    }

    Ok(())
}
