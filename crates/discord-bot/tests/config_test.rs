use serenity::model::id::GuildId;

use rostersync_discord_bot::config::BotConfig;

fn config(test_guild_id: Option<u64>) -> BotConfig {
    BotConfig {
        token: "test_token".to_string(),
        application_id: 12345,
        test_guild_id,
    }
}

#[test]
fn test_no_test_guild_by_default() {
    assert_eq!(config(None).test_guild(), None);
}

#[test]
fn test_test_guild_from_id() {
    assert_eq!(config(Some(67890)).test_guild(), Some(GuildId(67890)));
}
