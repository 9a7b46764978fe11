use chrono::{Duration, NaiveDate, TimeZone, Utc, Weekday};
use chrono_tz::Europe::Berlin;
use pretty_assertions::assert_eq;
use rstest::rstest;
use rostersync_core::absence::AbsenceRegistry;
use rostersync_core::board::{BOARD_MAX_AGE, BoardView, ToggleAction, is_board_valid, scrim_board_expiry};
use rostersync_core::models::roster::{GroupKind, UnitKey};
use rostersync_core::models::schedule::ScheduleConfigs;
use rostersync_core::roster::RosterStore;

#[rstest]
#[case(true, Duration::zero(), true)]
#[case(true, Duration::days(6), true)]
#[case(true, BOARD_MAX_AGE - Duration::seconds(1), true)]
#[case(true, BOARD_MAX_AGE, false)]
#[case(true, Duration::days(30), false)]
#[case(false, Duration::zero(), false)]
#[case(false, Duration::days(1), false)]
fn test_is_board_valid(#[case] fetched: bool, #[case] age: Duration, #[case] expected: bool) {
    assert_eq!(is_board_valid(fetched, age), expected);
}

#[test]
fn test_scrim_expiry_before_scrim_day() {
    // Monday noon in Berlin; scrim is on Wednesday.
    let now = Utc.with_ymd_and_hms(2026, 10, 12, 10, 0, 0).unwrap();
    let expiry = scrim_board_expiry(now, Weekday::Wed, Berlin);
    // Thursday 00:00 Berlin (CEST) is Wednesday 22:00 UTC.
    assert_eq!(expiry, Utc.with_ymd_and_hms(2026, 10, 14, 22, 0, 0).unwrap());
}

#[test]
fn test_scrim_expiry_on_scrim_day() {
    let now = Utc.with_ymd_and_hms(2026, 10, 14, 18, 0, 0).unwrap();
    let expiry = scrim_board_expiry(now, Weekday::Wed, Berlin);
    assert_eq!(expiry, Utc.with_ymd_and_hms(2026, 10, 14, 22, 0, 0).unwrap());
}

#[test]
fn test_scrim_expiry_after_scrim_day() {
    let now = Utc.with_ymd_and_hms(2026, 10, 15, 9, 0, 0).unwrap();
    let expiry = scrim_board_expiry(now, Weekday::Wed, Berlin);
    // Next Wednesday is the 21st; the night it ends is the 22nd 00:00 CEST.
    assert_eq!(expiry, Utc.with_ymd_and_hms(2026, 10, 21, 22, 0, 0).unwrap());
}

#[rstest]
#[case("roster:ranked:fri", UnitKey::day(GroupKind::Ranked, Weekday::Fri))]
#[case("roster:practice:thu", UnitKey::day(GroupKind::Practice, Weekday::Thu))]
#[case("roster:scrim:game-3", UnitKey::game(3))]
fn test_toggle_action_round_trip(#[case] raw: &str, #[case] unit: UnitKey) {
    let action: ToggleAction = raw.parse().unwrap();
    assert_eq!(action.unit, unit);
    assert_eq!(action.to_string(), raw);
}

#[rstest]
#[case("match_yes")]
#[case("roster:ranked")]
#[case("roster:casual:fri")]
#[case("other:ranked:fri")]
fn test_toggle_action_rejects(#[case] raw: &str) {
    assert!(raw.parse::<ToggleAction>().is_err());
}

#[test]
fn test_board_view_reflects_state() {
    let mut store = RosterStore::new(&ScheduleConfigs::default());
    let friday = UnitKey::day(GroupKind::Ranked, Weekday::Fri);
    store.try_add(friday, "alice").unwrap();
    store.try_add(friday, "bob").unwrap();

    // Monday the 12th; the next Friday is the 16th.
    let today = NaiveDate::from_ymd_opt(2026, 10, 12).unwrap();
    let mut absences = AbsenceRegistry::new();
    absences
        .add("bob", NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(), NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(), Utc::now())
        .unwrap();

    let view = BoardView::build(GroupKind::Ranked, &store, &absences, today);

    assert_eq!(view.title, "Ranked sign-ups");
    assert_eq!(view.units.len(), 3);

    let unit = &view.units[0];
    assert_eq!(unit.label, "Friday");
    assert_eq!(unit.session.as_deref(), Some("Friday 20:00"));
    assert_eq!(unit.counter(), "2/5");
    assert_eq!(unit.action.to_string(), "roster:ranked:fri");
    assert!(!unit.members[0].absent);
    assert!(unit.members[1].absent);

    let text = view.to_text();
    assert!(text.contains("<@bob> (away)"));
    assert!(text.contains("nobody yet"));
}

#[test]
fn test_scrim_board_counter_uncapped() {
    let mut store = RosterStore::new(&ScheduleConfigs::default());
    store.try_add(UnitKey::game(1), "alice").unwrap();

    let view = BoardView::build(GroupKind::Scrim, &store, &AbsenceRegistry::new(), NaiveDate::from_ymd_opt(2026, 10, 12).unwrap());
    assert_eq!(view.units[0].counter(), "1");
    assert_eq!(view.units[0].session.as_deref(), Some("Wednesday 20:00"));
}
