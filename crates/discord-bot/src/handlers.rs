use std::collections::HashMap;

use serenity::{
    async_trait,
    model::{
        application::{
            command::Command,
            interaction::{
                Interaction, InteractionResponseType,
                application_command::ApplicationCommandInteraction,
                message_component::MessageComponentInteraction,
            },
        },
        gateway::Ready,
    },
    prelude::*,
};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use rostersync_engine::{EngineHandle, Reply};

use crate::commands::{self, RosterCommand};
use crate::config::BotConfig;

/// Discord event handler that forwards interactions to the roster engine.
pub struct Handler {
    config: BotConfig,
    engine: EngineHandle,
}

impl Handler {
    pub fn new(config: BotConfig, engine: EngineHandle) -> Self {
        Self { config, engine }
    }

    async fn execute(&self, command: RosterCommand, user_id: &str, channel_id: &str) -> Reply {
        match command {
            RosterCommand::Board { group } => self.engine.post_board(group, channel_id).await,
            RosterCommand::Absent { start, end } => self.engine.add_absence(user_id, start, end).await,
            RosterCommand::Present => self.engine.clear_absences(user_id).await,
            RosterCommand::Notifications { enabled } => self.engine.set_notifications(user_id, enabled).await,
            RosterCommand::ClearRoster { group } => self.engine.clear_group(group).await,
            RosterCommand::Schedule { group, schedule } => self.engine.configure_schedule(group, schedule).await,
        }
    }

    async fn on_command(&self, ctx: &Context, command: &ApplicationCommandInteraction) -> serenity::Result<()> {
        let options: HashMap<String, Value> = command
            .data
            .options
            .iter()
            .filter_map(|o| o.value.clone().map(|v| (o.name.clone(), v)))
            .collect();

        let parsed = match commands::parse_command(&command.data.name, &options) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!("Rejected /{}: {}", command.data.name, e);
                return respond(ctx, command, Reply::from(e)).await;
            }
        };

        let user_id = command.user.id.0.to_string();
        let channel_id = command.channel_id.0.to_string();

        // Posting a board goes through the platform before the engine answers.
        if let RosterCommand::Board { .. } = parsed {
            command
                .create_interaction_response(&ctx.http, |r| {
                    r.kind(InteractionResponseType::DeferredChannelMessageWithSource)
                        .interaction_response_data(|m| m.ephemeral(true))
                })
                .await?;
            let reply = self.execute(parsed, &user_id, &channel_id).await;
            command
                .edit_original_interaction_response(&ctx.http, |r| r.content(reply.content))
                .await?;
            return Ok(());
        }

        let reply = self.execute(parsed, &user_id, &channel_id).await;
        respond(ctx, command, reply).await
    }

    async fn on_component(&self, ctx: &Context, component: &MessageComponentInteraction) -> serenity::Result<()> {
        let user_id = component.user.id.0.to_string();
        let reply = self.engine.toggle(&component.data.custom_id, &user_id).await;

        component
            .create_interaction_response(&ctx.http, |r| {
                r.kind(InteractionResponseType::ChannelMessageWithSource)
                    .interaction_response_data(|m| m.content(reply.content).ephemeral(reply.ephemeral))
            })
            .await
    }
}

async fn respond(ctx: &Context, command: &ApplicationCommandInteraction, reply: Reply) -> serenity::Result<()> {
    command
        .create_interaction_response(&ctx.http, |r| {
            r.kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|m| m.content(reply.content).ephemeral(reply.ephemeral))
        })
        .await
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("{} is connected!", ready.user.name);

        // Guild commands show up immediately, global ones are cached by Discord.
        if let Some(guild_id) = self.config.test_guild() {
            match guild_id
                .set_application_commands(&ctx.http, commands::register_commands)
                .await
            {
                Ok(cmds) => info!("Registered {} commands in guild {}", cmds.len(), guild_id),
                Err(why) => error!("Error registering guild commands: {:?}", why),
            }
        }

        match Command::set_global_application_commands(&ctx.http, commands::register_commands).await {
            Ok(cmds) => {
                for cmd in &cmds {
                    debug!("Command registered: /{} - {}", cmd.name, cmd.description);
                }
                info!("Registered {} global commands", cmds.len());
            }
            Err(why) => error!("Error registering global commands: {:?}", why),
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::ApplicationCommand(command) => {
                info!("Received command: /{} from {}", command.data.name, command.user.id);
                if let Err(why) = self.on_command(&ctx, &command).await {
                    error!("Failed to answer /{}: {:?}", command.data.name, why);
                }
            }
            Interaction::MessageComponent(component) => {
                if let Err(why) = self.on_component(&ctx, &component).await {
                    error!("Failed to answer button {}: {:?}", component.data.custom_id, why);
                }
            }
            other => warn!("Ignoring unsupported interaction {:?}", other.kind()),
        }
    }
}
