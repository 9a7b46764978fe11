use rostersync_core::platform::PlatformError;
use rostersync_discord_bot::platform::parse_id;

#[test]
fn test_parse_snowflake() {
    assert_eq!(parse_id("channel", "1029384756").unwrap(), 1029384756);
}

#[test]
fn test_parse_invalid_snowflake() {
    let result = parse_id("channel", "general");
    assert!(matches!(result, Err(PlatformError::InvalidId(_))), "{:?}", result);
}
