use clap::Parser;
use lloggs::LoggingArgs;
use tracing::info;

use tempstore_server::{Config, StoreService, api, storage::FsStore};

#[derive(Parser)]
#[command(name = "tempstore-server")]
#[command(about = "Temporary file store with size limits and age-based eviction")]
struct Args {
    #[command(flatten)]
    config: Config,

    #[command(flatten)]
    logging: LoggingArgs,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();
    let _guard = args.logging.setup(|v| match v {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    })?;
    let config = args.config;

    info!(
        listen = %config.listen_addr,
        storage = ?config.storage_path,
        max_file_size = config.max_file_size,
        retention_secs = config.retention_secs,
        "Starting server"
    );

    // Initialize storage
    let store = FsStore::new(&config.storage_path);
    store.init().await?;

    // Build router
    let service = StoreService::new(store, &config);
    let app = api::router(service);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!("Listening on {}", config.listen_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
