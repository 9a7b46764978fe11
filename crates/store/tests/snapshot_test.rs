use chrono::{NaiveDate, TimeZone, Utc, Weekday};
use pretty_assertions::assert_eq;
use rstest::rstest;
use tempfile::TempDir;

use rostersync_core::errors::RosterError;
use rostersync_core::models::roster::{GroupKind, UnitKey};
use rostersync_core::models::schedule::ScheduleConfigs;
use rostersync_core::models::snapshot::Snapshot;
use rostersync_core::state::AppState;
use rostersync_store::SnapshotManager;

fn manager(dir: &TempDir) -> SnapshotManager {
    SnapshotManager::new(dir.path().join("data").join("rosters.json"))
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, day).unwrap()
}

fn sample_snapshot() -> Snapshot {
    let mut state = AppState::new(&ScheduleConfigs::default());
    state
        .rosters
        .try_add(UnitKey::day(GroupKind::Ranked, Weekday::Fri), "alice")
        .unwrap();
    state.rosters.try_add(UnitKey::game(1), "bob").unwrap();
    state.opt_outs.insert("carol".to_string());
    state.to_snapshot(Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap())
}

#[tokio::test]
async fn test_load_missing_returns_none() {
    let dir = TempDir::new().unwrap();
    assert_eq!(manager(&dir).load().await.unwrap(), None);
}

#[tokio::test]
async fn test_save_then_load() {
    let dir = TempDir::new().unwrap();
    let manager = manager(&dir);
    let snapshot = sample_snapshot();

    manager.save(&snapshot).await.unwrap();
    assert_eq!(manager.load().await.unwrap(), Some(snapshot));
}

#[tokio::test]
async fn test_save_leaves_no_temp_file() {
    let dir = TempDir::new().unwrap();
    let manager = manager(&dir);
    manager.save(&sample_snapshot()).await.unwrap();
    manager.save(&sample_snapshot()).await.unwrap();

    let names: Vec<String> = std::fs::read_dir(dir.path().join("data"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["rosters.json".to_string()]);
}

#[tokio::test]
async fn test_saved_document_uses_camel_case_fields() {
    let dir = TempDir::new().unwrap();
    let manager = manager(&dir);
    manager.save(&sample_snapshot()).await.unwrap();

    let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(manager.path()).unwrap()).unwrap();
    for field in ["version", "timestamp", "scheduleConfigs", "rosterGroups", "absenceWindows"] {
        assert!(raw.get(field).is_some(), "missing {}", field);
    }
}

#[rstest]
#[case::garbage("not json at all")]
#[case::truncated("{\"version\": 1, \"timestamp\": ")]
#[case::wrong_shape("{\"version\": 1, \"timestamp\": \"2026-10-16T09:00:00Z\", \"rosterGroups\": 3}")]
#[tokio::test]
async fn test_corrupt_snapshot_is_reported(#[case] contents: &str) {
    let dir = TempDir::new().unwrap();
    let manager = manager(&dir);
    std::fs::create_dir_all(manager.path().parent().unwrap()).unwrap();
    std::fs::write(manager.path(), contents).unwrap();

    let error = manager.load().await.unwrap_err();
    assert!(matches!(error, RosterError::CorruptSnapshot(_)), "{:?}", error);
}

#[tokio::test]
async fn test_future_version_is_rejected() {
    let dir = TempDir::new().unwrap();
    let manager = manager(&dir);
    let mut snapshot = sample_snapshot();
    snapshot.version = 99;
    manager.save(&snapshot).await.unwrap();

    assert!(matches!(
        manager.load().await,
        Err(RosterError::CorruptSnapshot(_))
    ));
}

#[tokio::test]
async fn test_quarantine_moves_file_aside() {
    let dir = TempDir::new().unwrap();
    let manager = manager(&dir);
    let mut snapshot = sample_snapshot();
    snapshot.version = 99;
    manager.save(&snapshot).await.unwrap();
    let original = std::fs::read(manager.path()).unwrap();

    let moved = manager
        .quarantine(Utc.with_ymd_and_hms(2026, 10, 16, 9, 30, 0).unwrap())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(moved.file_name().unwrap(), "rosters.json.corrupt-20261016T093000Z");
    assert_eq!(std::fs::read(&moved).unwrap(), original);
    assert!(manager.load().await.unwrap().is_none());
}

#[tokio::test]
async fn test_quarantine_without_file() {
    let dir = TempDir::new().unwrap();
    let moved = manager(&dir).quarantine(Utc::now()).await.unwrap();
    assert_eq!(moved, None);
}

#[tokio::test]
async fn test_unversioned_document_is_accepted() {
    let dir = TempDir::new().unwrap();
    let manager = manager(&dir);
    let mut raw = serde_json::to_value(sample_snapshot()).unwrap();
    raw.as_object_mut().unwrap().remove("version");
    raw.as_object_mut().unwrap().remove("absenceWindows");
    std::fs::create_dir_all(manager.path().parent().unwrap()).unwrap();
    std::fs::write(manager.path(), raw.to_string()).unwrap();

    let loaded = manager.load().await.unwrap().unwrap();
    assert_eq!(loaded.version, 0);
    assert!(loaded.absence_windows.is_empty());
}

#[tokio::test]
async fn test_absences_survive_restart() {
    let dir = TempDir::new().unwrap();
    let created = Utc.with_ymd_and_hms(2026, 10, 1, 8, 0, 0).unwrap();

    let mut state = AppState::new(&ScheduleConfigs::default());
    state.absences.add("alice", date(20), date(22), created).unwrap();
    state.absences.add("alice", date(27), date(27), created).unwrap();
    state.absences.add("bob", date(18), date(25), created).unwrap();
    manager(&dir)
        .save(&state.to_snapshot(Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap()))
        .await
        .unwrap();

    // A fresh manager stands in for a restarted process.
    let loaded = manager(&dir).load().await.unwrap().unwrap();
    let restored = AppState::restore(loaded, &ScheduleConfigs::default());

    assert_eq!(restored.absences.windows().len(), 3);
    assert_eq!(restored.absences.windows(), state.absences.windows());
    assert!(restored.absences.is_absent_on("alice", date(21)));
    assert!(!restored.absences.is_absent_on("alice", date(24)));
    assert!(restored.absences.is_absent_on("bob", date(24)));
}

#[tokio::test]
async fn test_backups_are_pruned_to_newest() {
    let dir = TempDir::new().unwrap();
    let manager = manager(&dir);
    let snapshot = sample_snapshot();

    for day in 10..=15 {
        manager.save_backup(&snapshot, date(day), 3).await.unwrap();
    }

    let names: Vec<String> = manager
        .backups()
        .await
        .unwrap()
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec![
            "rosters-2026-10-13.json".to_string(),
            "rosters-2026-10-14.json".to_string(),
            "rosters-2026-10-15.json".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_backup_is_loadable_snapshot() {
    let dir = TempDir::new().unwrap();
    let manager = manager(&dir);
    let snapshot = sample_snapshot();

    let path = manager.save_backup(&snapshot, date(16), 14).await.unwrap();
    assert_eq!(SnapshotManager::new(path).load().await.unwrap(), Some(snapshot));
}
