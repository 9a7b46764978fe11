use std::collections::HashMap;

use chrono::{NaiveDate, Weekday};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{Value, json};
use serenity::builder::CreateApplicationCommands;

use rostersync_core::errors::RosterError;
use rostersync_core::models::roster::GroupKind;
use rostersync_core::models::schedule::{GroupSchedule, SessionTime};
use rostersync_discord_bot::commands::{self, RosterCommand, parse_command, roster::parse_schedule};

fn options(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

#[test]
fn test_register_commands() {
    // Builders are opaque, so this only checks that registration does not panic
    let mut commands = CreateApplicationCommands::default();
    commands::register_commands(&mut commands);
}

#[test]
fn test_board_command() {
    let parsed = parse_command("board", &options(&[("group", json!("scrim"))])).unwrap();
    assert_eq!(parsed, RosterCommand::Board { group: GroupKind::Scrim });
}

#[test]
fn test_absent_single_day() {
    let parsed = parse_command("absent", &options(&[("from", json!("2026-10-20"))])).unwrap();
    let day = NaiveDate::from_ymd_opt(2026, 10, 20).unwrap();
    assert_eq!(parsed, RosterCommand::Absent { start: day, end: day });
}

#[test]
fn test_absent_range() {
    let parsed = parse_command(
        "absent",
        &options(&[("from", json!("2026-10-20")), ("until", json!("2026-10-25"))]),
    )
    .unwrap();
    assert_eq!(
        parsed,
        RosterCommand::Absent {
            start: NaiveDate::from_ymd_opt(2026, 10, 20).unwrap(),
            end: NaiveDate::from_ymd_opt(2026, 10, 25).unwrap(),
        }
    );
}

#[test]
fn test_notifications_toggle() {
    let parsed = parse_command("notifications", &options(&[("enabled", json!(false))])).unwrap();
    assert_eq!(parsed, RosterCommand::Notifications { enabled: false });
}

#[test]
fn test_schedule_command() {
    let parsed = parse_command(
        "schedule",
        &options(&[
            ("group", json!("scrim")),
            ("days", json!("wed")),
            ("time", json!("21:30")),
            ("games", json!(4)),
        ]),
    )
    .unwrap();

    assert_eq!(
        parsed,
        RosterCommand::Schedule {
            group: GroupKind::Scrim,
            schedule: GroupSchedule {
                sessions: vec![SessionTime::new(Weekday::Wed, 21, 30)],
                games: Some(4),
            },
        }
    );
}

#[test]
fn test_parse_schedule_days() {
    let schedule = parse_schedule("Fri, saturday ,sun", "20:00", None).unwrap();
    let days: Vec<Weekday> = schedule.sessions.iter().map(|s| s.day).collect();
    assert_eq!(days, vec![Weekday::Fri, Weekday::Sat, Weekday::Sun]);
}

#[rstest]
#[case::bad_group("board", &[("group", json!("casual"))])]
#[case::missing_group("roster-clear", &[])]
#[case::bad_date("absent", &[("from", json!("20/10/2026"))])]
#[case::bad_day("schedule", &[("group", json!("ranked")), ("days", json!("fri,funday")), ("time", json!("20:00"))])]
#[case::bad_time("schedule", &[("group", json!("ranked")), ("days", json!("fri")), ("time", json!("8pm"))])]
#[case::negative_games("schedule", &[("group", json!("scrim")), ("days", json!("wed")), ("time", json!("20:00")), ("games", json!(-1))])]
#[case::unknown_command("timezone", &[])]
fn test_rejected_commands(#[case] name: &str, #[case] pairs: &[(&str, Value)]) {
    let result = parse_command(name, &options(pairs));
    assert!(matches!(result, Err(RosterError::Validation(_))), "{:?}", result);
}
