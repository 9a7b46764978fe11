use chrono::{NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{from_str, to_string};
use serde_test::{Token, assert_tokens};
use rostersync_core::models::{
    absence::AbsenceWindow,
    board::BoardBinding,
    roster::{GroupKind, UnitKey, UnitSlot},
    schedule::{GroupSchedule, ScheduleConfigs, SessionTime},
};

#[rstest]
#[case("mon", UnitSlot::Day(Weekday::Mon))]
#[case("Friday", UnitSlot::Day(Weekday::Fri))]
#[case("game-1", UnitSlot::Game(1))]
#[case("GAME-5", UnitSlot::Game(5))]
fn test_unit_slot_parse(#[case] input: &str, #[case] expected: UnitSlot) {
    assert_eq!(input.parse::<UnitSlot>().unwrap(), expected);
}

#[rstest]
#[case("game-0")]
#[case("game-x")]
#[case("someday")]
#[case("")]
fn test_unit_slot_parse_rejects(#[case] input: &str) {
    assert!(input.parse::<UnitSlot>().is_err());
}

#[test]
fn test_unit_slot_serializes_as_string() {
    assert_tokens(&UnitSlot::Day(Weekday::Sat), &[Token::Str("sat")]);
    assert_tokens(&UnitSlot::Game(2), &[Token::Str("game-2")]);
}

#[test]
fn test_unit_key_display() {
    assert_eq!(UnitKey::day(GroupKind::Practice, Weekday::Tue).to_string(), "practice/tue");
    assert_eq!(UnitKey::game(3).to_string(), "scrim/game-3");
}

#[test]
fn test_group_kind_serialization() {
    assert_eq!(to_string(&GroupKind::Ranked).unwrap(), "\"ranked\"");
    assert_eq!(from_str::<GroupKind>("\"scrim\"").unwrap(), GroupKind::Scrim);
    assert_eq!("Practice".parse::<GroupKind>().unwrap(), GroupKind::Practice);
    assert!("casual".parse::<GroupKind>().is_err());
}

#[test]
fn test_absence_window_serialization() {
    let window = AbsenceWindow {
        participant_id: "123456789".to_string(),
        start_date: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2026, 10, 3).unwrap(),
        created_at: Utc.with_ymd_and_hms(2026, 9, 30, 12, 0, 0).unwrap(),
    };

    let json = to_string(&window).expect("Failed to serialize absence window");
    assert!(json.contains("\"participantId\":\"123456789\""));
    assert!(json.contains("\"startDate\":\"2026-10-01\""));

    let deserialized: AbsenceWindow = from_str(&json).expect("Failed to deserialize absence window");
    assert_eq!(deserialized, window);
}

#[test]
fn test_board_binding_expiry() {
    let now = Utc.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).unwrap();
    let mut binding = BoardBinding {
        group: GroupKind::Scrim,
        channel_id: "1".to_string(),
        message_id: "2".to_string(),
        posted_at: now,
        expires_at: None,
    };
    assert!(!binding.is_expired(now));

    binding.expires_at = Some(now);
    assert!(binding.is_expired(now));

    binding.expires_at = Some(now + chrono::Duration::minutes(1));
    assert!(!binding.is_expired(now));
}

#[test]
fn test_default_schedules_are_valid() {
    let configs = ScheduleConfigs::default();
    for group in GroupKind::ALL {
        configs.get(group).validate(group).expect("default schedule should validate");
    }

    assert_eq!(configs.ranked.sessions.len(), 3);
    assert_eq!(configs.practice.sessions.len(), 2);
    assert_eq!(configs.scrim.games, Some(3));
}

#[rstest]
#[case(GroupKind::Ranked, vec![Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu], None)]
#[case(GroupKind::Ranked, vec![], None)]
#[case(GroupKind::Practice, vec![Weekday::Mon, Weekday::Mon], None)]
#[case(GroupKind::Practice, vec![Weekday::Mon], Some(2))]
#[case(GroupKind::Scrim, vec![Weekday::Wed], Some(6))]
#[case(GroupKind::Scrim, vec![Weekday::Wed], None)]
#[case(GroupKind::Scrim, vec![Weekday::Wed, Weekday::Thu], Some(2))]
fn test_invalid_schedules(
    #[case] group: GroupKind,
    #[case] days: Vec<Weekday>,
    #[case] games: Option<u8>,
) {
    let schedule = GroupSchedule {
        sessions: days.into_iter().map(|d| SessionTime::new(d, 20, 0)).collect(),
        games,
    };
    assert!(schedule.validate(group).is_err());
}

#[test]
fn test_schedule_slots() {
    let scrim = GroupSchedule {
        sessions: vec![SessionTime::new(Weekday::Wed, 21, 30)],
        games: Some(2),
    };
    assert_eq!(scrim.slots(GroupKind::Scrim), vec![UnitSlot::Game(1), UnitSlot::Game(2)]);
    assert_eq!(
        scrim.session_for(UnitSlot::Game(2)).map(|s| s.time),
        NaiveTime::from_hms_opt(21, 30, 0)
    );

    let ranked = GroupSchedule::default_for(GroupKind::Ranked);
    assert_eq!(
        ranked.slots(GroupKind::Ranked),
        vec![
            UnitSlot::Day(Weekday::Fri),
            UnitSlot::Day(Weekday::Sat),
            UnitSlot::Day(Weekday::Sun)
        ]
    );
    assert_eq!(ranked.sessions[0].label(), "Friday 20:00");
}
