use anyhow::Result;
use flashbots_bundler::{
    bot::{BundleBot, ReactorExit},
    config::Config,
};
use tracing::{error, info, Level};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    info!("Starting Flashbots bundle searcher");

    // Load configuration
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Estimation failures abort here, before any block is processed
    let mut bot = BundleBot::new(config).await.map_err(|e| {
        error!("Failed to initialize bundler: {}", e);
        e
    })?;

    // Handle graceful shutdown
    tokio::select! {
        result = bot.start() => match result {
            Ok(ReactorExit::BundleIncluded { block_number }) => {
                info!("Bundle included in block {}, successfully done!!!", block_number);
                std::process::exit(0);
            }
            Ok(ReactorExit::StreamClosed) => info!("Block stream ended"),
            Err(e) => error!("Bundler error: {}", e),
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
            bot.stop().await;
        }
    }

    info!("Flashbots bundler shutdown complete");
    Ok(())
}
