use std::sync::Arc;

use eyre::Result;
use serenity::{Client, http::Http, prelude::GatewayIntents};
use tracing::info;

use rostersync_engine::EngineHandle;

pub mod commands;
pub mod config;
pub mod handlers;
pub mod platform;
pub mod render;

pub use platform::DiscordPlatform;

/// REST client the engine uses for boards and direct messages, independent of the gateway.
pub fn rest_platform(config: &config::BotConfig) -> DiscordPlatform {
    let http = Http::new_with_application_id(&config.token, config.application_id);
    DiscordPlatform::new(Arc::new(http))
}

/// Start the Discord bot and forward interactions to the running engine.
///
/// Runs until the gateway connection is closed or fails.
pub async fn start_bot(config: config::BotConfig, engine: EngineHandle) -> Result<()> {
    info!("Starting Discord bot");

    let handler = handlers::Handler::new(config.clone(), engine);

    // Member listing for the weekly sweep needs the privileged members intent.
    let intents = GatewayIntents::non_privileged() | GatewayIntents::GUILD_MEMBERS;
    let mut client = Client::builder(&config.token, intents)
        .application_id(config.application_id)
        .event_handler(handler)
        .await?;

    info!("Connecting to Discord...");
    client.start().await?;

    Ok(())
}
