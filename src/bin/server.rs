//! colstore Server Binary
//!
//! Opens the database and serves the admin endpoints over HTTP.

use std::sync::Arc;

use clap::Parser;
use colstore::config::SyncStrategy;
use colstore::http::Server;
use colstore::{CollectionService, Config, Database};
use tracing_subscriber::{fmt, EnvFilter};

/// colstore Server
#[derive(Parser, Debug)]
#[command(name = "colstore-server")]
#[command(about = "Partitioned document-collection store with an HTTP admin API")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./colstore_data")]
    data_dir: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    listen: String,

    /// Maximum partitions per collection
    #[arg(short, long, default_value = "1024")]
    max_partitions: usize,

    /// Sync every document write instead of waiting for a flush
    #[arg(long)]
    sync_every_write: bool,
}

#[tokio::main]
async fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,colstore=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("colstore Server v{}", colstore::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);
    tracing::info!("Listen address: {}", args.listen);

    // Build config from args
    let sync_strategy = if args.sync_every_write {
        SyncStrategy::EveryWrite
    } else {
        SyncStrategy::OnFlush
    };
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .listen_addr(&args.listen)
        .max_partitions(args.max_partitions)
        .sync_strategy(sync_strategy)
        .build();

    // Open database
    let database = match Database::open(config.clone()) {
        Ok(db) => db,
        Err(e) => {
            tracing::error!("Failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Database initialized successfully");

    let service = Arc::new(CollectionService::new(database));
    let server = Server::new(config, service);

    if let Err(e) = server.run(shutdown_signal()).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}

/// Resolve on Ctrl+C
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C, initiating shutdown..."),
        Err(e) => tracing::error!("Failed to listen for Ctrl+C: {}", e),
    }
}
