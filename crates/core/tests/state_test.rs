use chrono::{NaiveDate, TimeZone, Utc, Weekday};
use chrono_tz::Europe::Berlin;
use pretty_assertions::assert_eq;
use rostersync_core::models::board::BoardBinding;
use rostersync_core::models::roster::{GroupKind, RosterUnit, UnitKey, UnitSlot};
use rostersync_core::models::schedule::{GroupSchedule, ScheduleConfigs, SessionTime};
use rostersync_core::models::snapshot::SNAPSHOT_VERSION;
use rostersync_core::notify::{NotificationKind, NotifyAction, Phase};
use rostersync_core::state::AppState;

fn friday() -> UnitKey {
    UnitKey::day(GroupKind::Ranked, Weekday::Fri)
}

fn populated() -> AppState {
    let mut state = AppState::new(&ScheduleConfigs::default());
    for i in 1..=5 {
        state.rosters.try_add(friday(), &format!("user{}", i)).unwrap();
    }
    state.rosters.try_add(UnitKey::game(2), "scrimmer").unwrap();
    state
        .absences
        .add(
            "user2",
            NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(),
            NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
            Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap(),
        )
        .unwrap();
    state.opt_outs.insert("user3".to_string());
    state.bindings.insert(BoardBinding {
        group: GroupKind::Ranked,
        channel_id: "100".to_string(),
        message_id: "200".to_string(),
        posted_at: Utc.with_ymd_and_hms(2026, 10, 10, 0, 0, 0).unwrap(),
        expires_at: None,
    });
    state
}

#[test]
fn test_snapshot_round_trip_through_state() {
    let now = Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap();
    let state = populated();
    let snapshot = state.to_snapshot(now);

    assert_eq!(snapshot.version, SNAPSHOT_VERSION);
    assert_eq!(snapshot.timestamp, now);

    let restored = AppState::restore(snapshot.clone(), &ScheduleConfigs::default());
    assert_eq!(restored.to_snapshot(now), snapshot);
    assert_eq!(restored.rosters, state.rosters);
}

#[test]
fn test_restore_prefers_stored_schedule() {
    let now = Utc::now();
    let mut state = populated();
    let custom = GroupSchedule {
        sessions: vec![SessionTime::new(Weekday::Fri, 18, 30)],
        games: None,
    };
    state.rosters.reconfigure(GroupKind::Ranked, custom.clone()).unwrap();

    let restored = AppState::restore(state.to_snapshot(now), &ScheduleConfigs::default());
    assert_eq!(restored.rosters.group(GroupKind::Ranked).schedule, custom);
    assert_eq!(restored.rosters.members(friday()).len(), 5);
}

#[test]
fn test_restore_rejects_invalid_stored_schedule() {
    let mut snapshot = populated().to_snapshot(Utc::now());
    snapshot.schedule_configs.scrim.games = Some(12);

    let restored = AppState::restore(snapshot, &ScheduleConfigs::default());
    assert_eq!(restored.rosters.group(GroupKind::Scrim).schedule, GroupSchedule::default_for(GroupKind::Scrim));
    assert_eq!(restored.rosters.members(UnitKey::game(2)), &["scrimmer".to_string()]);
}

#[test]
fn test_restore_repairs_corrupted_units() {
    let mut snapshot = populated().to_snapshot(Utc::now());
    let ranked = snapshot
        .roster_groups
        .iter_mut()
        .find(|g| g.group == GroupKind::Ranked)
        .unwrap();
    ranked.units = vec![RosterUnit {
        slot: UnitSlot::Day(Weekday::Fri),
        capacity: Some(5),
        members: ["a", "a", "b", "c", "d", "e", "f"].map(String::from).to_vec(),
    }];

    let restored = AppState::restore(snapshot, &ScheduleConfigs::default());
    assert_eq!(restored.rosters.members(friday()), &["a", "b", "c", "d", "e"].map(String::from));
}

#[test]
fn test_restore_primes_full_units() {
    let snapshot = populated().to_snapshot(Utc::now());
    let mut restored = AppState::restore(snapshot, &ScheduleConfigs::default());

    assert_eq!(restored.notifications.state(friday()).unwrap().phase, Phase::Full);

    restored.rosters.remove(friday(), "user5").unwrap();
    let actions = restored.notifications.on_size_change(friday(), 4, 5, Utc::now());
    assert_eq!(actions, vec![NotifyAction::Dispatch(NotificationKind::Cancel)]);
}

#[test]
fn test_recipients_skip_absent_and_opted_out() {
    let state = populated();
    let friday_evening = Utc.with_ymd_and_hms(2026, 10, 16, 17, 0, 0).unwrap();

    let recipients = state.recipients(friday(), friday_evening, Berlin);
    assert_eq!(recipients, ["user1", "user4", "user5"].map(String::from).to_vec());

    let next_week = Utc.with_ymd_and_hms(2026, 10, 23, 17, 0, 0).unwrap();
    assert_eq!(state.recipients(friday(), next_week, Berlin).len(), 4);
}
