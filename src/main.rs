use std::sync::Arc;

use color_eyre::eyre::Result;
use dotenv::dotenv;
use rostersync_core::clock::SystemClock;
use rostersync_discord_bot::config::BotConfig;
use rostersync_engine::{EngineConfig, start_engine};
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Load environment variables
    dotenv().ok();

    let engine_config = EngineConfig::from_env()?;

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(engine_config.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting RosterSync");

    let bot_config = BotConfig::from_env()?;
    let platform = Arc::new(rostersync_discord_bot::rest_platform(&bot_config));

    let engine = start_engine(engine_config, platform, Arc::new(SystemClock)).await;

    match rostersync_discord_bot::start_bot(bot_config, engine).await {
        Ok(_) => info!("Discord bot shut down gracefully"),
        Err(e) => error!("Discord bot error: {}", e),
    }

    Ok(())
}
