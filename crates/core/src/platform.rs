use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::board::BoardView;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid id: {0}")]
    InvalidId(String),

    #[error("Request failed: {0}")]
    Request(String),
}

pub type PlatformResult<T> = Result<T, PlatformError>;

/// Metadata of a fetched message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageInfo {
    pub created_at: DateTime<Utc>,
}

/// Operations consumed from the chat platform. Ids are the platform's string ids.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// `Ok(None)` when the message no longer exists or cannot be read.
    async fn fetch_message(&self, channel_id: &str, message_id: &str) -> PlatformResult<Option<MessageInfo>>;

    /// Posts a board and returns the new message id.
    async fn post_board(&self, channel_id: &str, board: &BoardView) -> PlatformResult<String>;

    async fn edit_board(&self, channel_id: &str, message_id: &str, board: &BoardView) -> PlatformResult<()>;

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> PlatformResult<()>;

    /// Best effort; may fail per recipient.
    async fn send_direct_message(&self, user_id: &str, content: &str) -> PlatformResult<()>;

    /// Non-bot members of a guild.
    async fn guild_members(&self, guild_id: &str) -> PlatformResult<Vec<String>>;
}
