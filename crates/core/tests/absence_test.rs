use chrono::{NaiveDate, TimeZone, Utc};
use chrono_tz::Europe::Berlin;
use pretty_assertions::assert_eq;
use rstest::rstest;
use rostersync_core::absence::AbsenceRegistry;
use rostersync_core::errors::RosterError;

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, day).unwrap()
}

fn registry() -> AbsenceRegistry {
    let created = Utc.with_ymd_and_hms(2026, 10, 1, 8, 0, 0).unwrap();
    let mut registry = AbsenceRegistry::new();
    registry.add("alice", date(10), date(12), created).unwrap();
    registry.add("alice", date(11), date(20), created).unwrap();
    registry.add("bob", date(15), date(15), created).unwrap();
    registry
}

#[rstest]
#[case("alice", 9, false)]
#[case("alice", 10, true)]
#[case("alice", 12, true)]
#[case("alice", 20, true)]
#[case("alice", 21, false)]
#[case("bob", 14, false)]
#[case("bob", 15, true)]
#[case("bob", 16, false)]
#[case("carol", 15, false)]
fn test_is_absent_on(#[case] participant: &str, #[case] day: u32, #[case] expected: bool) {
    assert_eq!(registry().is_absent_on(participant, date(day)), expected);
}

#[test]
fn test_rejects_inverted_window() {
    let mut registry = AbsenceRegistry::new();
    let result = registry.add("alice", date(12), date(10), Utc::now());
    assert!(matches!(result, Err(RosterError::Validation(_))));
    assert!(registry.windows().is_empty());
}

#[test]
fn test_is_absent_today_uses_local_date() {
    let registry = registry();
    // 22:30 UTC on the 14th is already the 15th in Berlin (UTC+2 in October).
    let late_evening = Utc.with_ymd_and_hms(2026, 10, 14, 22, 30, 0).unwrap();
    assert!(registry.is_absent_today("bob", late_evening, Berlin));
    assert!(!registry.is_absent_today("bob", late_evening, chrono_tz::UTC));
}

#[test]
fn test_clear_and_prune() {
    let mut registry = registry();
    assert_eq!(registry.windows_for("alice").count(), 2);

    assert_eq!(registry.prune_before(date(13)), 1);
    assert_eq!(registry.windows_for("alice").count(), 1);

    assert_eq!(registry.clear_participant("alice"), 1);
    assert_eq!(registry.clear_participant("alice"), 0);
    assert_eq!(registry.windows().len(), 1);
}
