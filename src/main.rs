mod app;
mod audio;
mod config;
mod messages;
mod services;

use app::App;
use config::Config;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing, RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Starting chunk-recorder");

    // Load configuration
    let config = Config::load()?;
    config.validate()?;

    // Create LocalSet for !Send futures (needed for Recorder which holds cpal::Stream)
    let local = tokio::task::LocalSet::new();

    local
        .run_until(async move {
            let app = App::new(config)?;
            app.run().await
        })
        .await
}
