//! Trade quota service - entry point.

use anyhow::Result;
use clap::Parser;
use quota_server::config::DEFAULT_CONFIG_PATH;
use tracing::info;

/// Per-user daily trade quota service
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via QUOTA_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    quota_telemetry::init_logging()?;

    info!("Starting quota-server v{}", env!("CARGO_PKG_VERSION"));

    // CLI arg > QUOTA_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("QUOTA_CONFIG").ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    info!(config_path = %config_path, "Loading configuration");
    let config = quota_server::AppConfig::load(&config_path)?;

    let app = quota_server::Application::new(config).await?;
    app.run().await?;

    Ok(())
}
