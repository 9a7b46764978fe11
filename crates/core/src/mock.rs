use async_trait::async_trait;
use mockall::mock;

use crate::board::BoardView;
use crate::platform::{ChatPlatform, MessageInfo, PlatformResult};

// Mock platform for testing
mock! {
    pub Platform {}

    #[async_trait]
    impl ChatPlatform for Platform {
        async fn fetch_message(&self, channel_id: &str, message_id: &str) -> PlatformResult<Option<MessageInfo>>;
        async fn post_board(&self, channel_id: &str, board: &BoardView) -> PlatformResult<String>;
        async fn edit_board(&self, channel_id: &str, message_id: &str, board: &BoardView) -> PlatformResult<()>;
        async fn delete_message(&self, channel_id: &str, message_id: &str) -> PlatformResult<()>;
        async fn send_direct_message(&self, user_id: &str, content: &str) -> PlatformResult<()>;
        async fn guild_members(&self, guild_id: &str) -> PlatformResult<Vec<String>>;
    }
}
