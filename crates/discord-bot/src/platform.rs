//! Serenity implementation of the chat platform the engine talks to.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serenity::http::Http;
use serenity::model::id::{ChannelId, GuildId, MessageId, UserId};
use tracing::debug;

use rostersync_core::board::BoardView;
use rostersync_core::platform::{ChatPlatform, MessageInfo, PlatformError, PlatformResult};

use crate::render;

/// Guild member pages are fetched this many at a time.
const MEMBER_PAGE_SIZE: u64 = 1000;

pub struct DiscordPlatform {
    http: Arc<Http>,
}

impl DiscordPlatform {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

pub fn parse_id(kind: &str, id: &str) -> PlatformResult<u64> {
    id.parse::<u64>()
        .map_err(|_| PlatformError::InvalidId(format!("{} id {:?}", kind, id)))
}

fn request_failed(e: serenity::Error) -> PlatformError {
    PlatformError::Request(e.to_string())
}

#[async_trait]
impl ChatPlatform for DiscordPlatform {
    async fn fetch_message(&self, channel_id: &str, message_id: &str) -> PlatformResult<Option<MessageInfo>> {
        let channel = ChannelId(parse_id("channel", channel_id)?);
        let message = MessageId(parse_id("message", message_id)?);

        match channel.message(&self.http, message).await {
            Ok(found) => Ok(Utc
                .timestamp_opt(found.timestamp.unix_timestamp(), 0)
                .single()
                .map(|created_at| MessageInfo { created_at })),
            Err(e) => {
                debug!("Could not fetch message {} in {}: {}", message_id, channel_id, e);
                Ok(None)
            }
        }
    }

    async fn post_board(&self, channel_id: &str, board: &BoardView) -> PlatformResult<String> {
        let channel = ChannelId(parse_id("channel", channel_id)?);

        let message = channel
            .send_message(&self.http, |m| {
                m.embed(|e| render::board_embed(e, board))
                    .components(|c| render::board_buttons(c, board))
            })
            .await
            .map_err(request_failed)?;

        Ok(message.id.0.to_string())
    }

    async fn edit_board(&self, channel_id: &str, message_id: &str, board: &BoardView) -> PlatformResult<()> {
        let channel = ChannelId(parse_id("channel", channel_id)?);
        let message = MessageId(parse_id("message", message_id)?);

        channel
            .edit_message(&self.http, message, |m| {
                m.embed(|e| render::board_embed(e, board))
                    .components(|c| render::board_buttons(c, board))
            })
            .await
            .map_err(request_failed)?;

        Ok(())
    }

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> PlatformResult<()> {
        let channel = ChannelId(parse_id("channel", channel_id)?);
        let message = MessageId(parse_id("message", message_id)?);

        channel
            .delete_message(&self.http, message)
            .await
            .map_err(request_failed)
    }

    async fn send_direct_message(&self, user_id: &str, content: &str) -> PlatformResult<()> {
        let user = UserId(parse_id("user", user_id)?);

        let channel = user
            .create_dm_channel(self.http.as_ref())
            .await
            .map_err(request_failed)?;
        channel
            .say(&self.http, content)
            .await
            .map_err(request_failed)?;

        Ok(())
    }

    async fn guild_members(&self, guild_id: &str) -> PlatformResult<Vec<String>> {
        let guild = GuildId(parse_id("guild", guild_id)?);
        let mut members = Vec::new();
        let mut after: Option<UserId> = None;

        loop {
            let page = guild
                .members(&self.http, Some(MEMBER_PAGE_SIZE), after)
                .await
                .map_err(request_failed)?;

            let full_page = page.len() as u64 == MEMBER_PAGE_SIZE;
            after = page.last().map(|m| m.user.id);
            members.extend(
                page.into_iter()
                    .filter(|m| !m.user.bot)
                    .map(|m| m.user.id.0.to_string()),
            );

            if !full_page {
                break;
            }
        }

        debug!("Fetched {} members of guild {}", members.len(), guild_id);
        Ok(members)
    }
}
