use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use eyre::WrapErr;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use rostersync_core::errors::{RosterError, RosterResult};
use rostersync_core::models::snapshot::{SNAPSHOT_VERSION, Snapshot};

const BACKUP_DIR: &str = "backups";

/// Owns the on-disk snapshot document.
///
/// Writes go to a sibling `.tmp` file which is then renamed over the target, so a
/// reader either sees the previous document or the new one, never a partial write.
#[derive(Debug, Clone)]
pub struct SnapshotManager {
    path: PathBuf,
}

impl SnapshotManager {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serializes and atomically replaces the snapshot file.
    pub async fn save(&self, snapshot: &Snapshot) -> RosterResult<()> {
        let json = serde_json::to_vec_pretty(snapshot).wrap_err("Failed to serialize snapshot")?;
        write_atomic(&self.path, &json).await?;
        debug!("Saved snapshot to {}", self.path.display());
        Ok(())
    }

    /// Returns `None` when no snapshot has been written yet.
    pub async fn load(&self) -> RosterResult<Option<Snapshot>> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No snapshot at {}, starting fresh", self.path.display());
                return Ok(None);
            }
            Err(e) => {
                return Err(eyre::Report::new(e)
                    .wrap_err(format!("Failed to read snapshot {}", self.path.display()))
                    .into());
            }
        };

        let snapshot: Snapshot =
            serde_json::from_slice(&bytes).map_err(|e| RosterError::CorruptSnapshot(e.to_string()))?;

        if snapshot.version > SNAPSHOT_VERSION {
            return Err(RosterError::CorruptSnapshot(format!(
                "snapshot version {} is newer than supported version {}",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }

        info!(
            "Loaded snapshot v{} taken at {}",
            snapshot.version, snapshot.timestamp
        );
        Ok(Some(snapshot))
    }

    /// Moves an unreadable snapshot aside as `<path>.corrupt-<timestamp>` so the next
    /// save cannot overwrite it. Returns `None` when there is no file to move.
    pub async fn quarantine(&self, now: DateTime<Utc>) -> RosterResult<Option<PathBuf>> {
        let mut name: OsString = self.path.as_os_str().to_owned();
        name.push(format!(".corrupt-{}", now.format("%Y%m%dT%H%M%SZ")));
        let target = PathBuf::from(name);

        match fs::rename(&self.path, &target).await {
            Ok(()) => {
                warn!("Moved unreadable snapshot to {}", target.display());
                Ok(Some(target))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(eyre::Report::new(e)
                .wrap_err(format!("Failed to move {} aside", self.path.display()))
                .into()),
        }
    }

    /// Writes a dated copy into the backup directory and keeps only the newest `keep`.
    pub async fn save_backup(&self, snapshot: &Snapshot, date: NaiveDate, keep: usize) -> RosterResult<PathBuf> {
        let dir = self.backup_dir();
        let target = dir.join(format!("{}-{}.json", self.stem(), date.format("%Y-%m-%d")));

        let json = serde_json::to_vec_pretty(snapshot).wrap_err("Failed to serialize backup")?;
        write_atomic(&target, &json).await?;
        info!("Wrote backup {}", target.display());

        let removed = self.prune_backups(keep).await?;
        if removed > 0 {
            debug!("Pruned {} old backups", removed);
        }

        Ok(target)
    }

    /// Backup files of this snapshot, oldest first.
    pub async fn backups(&self) -> RosterResult<Vec<PathBuf>> {
        let dir = self.backup_dir();
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(eyre::Report::new(e)
                    .wrap_err(format!("Failed to list backups in {}", dir.display()))
                    .into());
            }
        };

        let prefix = format!("{}-", self.stem());
        let mut backups = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .wrap_err("Failed to read backup directory entry")?
        {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(&prefix) && name.ends_with(".json") {
                backups.push(entry.path());
            }
        }

        backups.sort();
        Ok(backups)
    }

    async fn prune_backups(&self, keep: usize) -> RosterResult<usize> {
        let backups = self.backups().await?;
        let excess = backups.len().saturating_sub(keep);

        for old in &backups[..excess] {
            if let Err(e) = fs::remove_file(old).await {
                warn!("Failed to remove old backup {}: {}", old.display(), e);
            }
        }

        Ok(excess)
    }

    fn backup_dir(&self) -> PathBuf {
        self.path
            .parent()
            .map(|p| p.join(BACKUP_DIR))
            .unwrap_or_else(|| PathBuf::from(BACKUP_DIR))
    }

    fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "snapshot".to_string())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> RosterResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .wrap_err_with(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let tmp = temp_path(path);
    let mut file = fs::File::create(&tmp)
        .await
        .wrap_err_with(|| format!("Failed to create {}", tmp.display()))?;
    file.write_all(bytes)
        .await
        .wrap_err_with(|| format!("Failed to write {}", tmp.display()))?;
    file.sync_all()
        .await
        .wrap_err_with(|| format!("Failed to flush {}", tmp.display()))?;
    drop(file);

    fs::rename(&tmp, path)
        .await
        .wrap_err_with(|| format!("Failed to move {} into place", tmp.display()))?;

    Ok(())
}
