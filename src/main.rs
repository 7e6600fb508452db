use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use stowage::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    fmt().with_env_filter(filter).init();

    // Startup banner at info level so something always prints at default verbosity
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    let config = AppConfig::from_env()?;
    info!(
        target: "stowage",
        "Stowage starting: RUST_LOG='{}', port={}, storage='{}', snapshot='{}'",
        rust_log,
        config.port,
        config.storage_location.display(),
        config.snapshot_path.display()
    );

    stowage::server::run(config).await
}
