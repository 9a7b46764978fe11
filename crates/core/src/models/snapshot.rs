use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::absence::AbsenceWindow;
use crate::models::board::BoardBinding;
use crate::models::roster::{GroupKind, RosterUnit};
use crate::models::schedule::ScheduleConfigs;

/// Version written by this build. Older documents without a version read as `0`.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSnapshot {
    pub group: GroupKind,
    pub units: Vec<RosterUnit>,
}

/// Everything needed to rebuild the in-memory state after a restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub version: u32,
    pub timestamp: DateTime<Utc>,
    pub schedule_configs: ScheduleConfigs,
    pub roster_groups: Vec<GroupSnapshot>,
    #[serde(default)]
    pub absence_windows: Vec<AbsenceWindow>,
    #[serde(default)]
    pub board_bindings: Vec<BoardBinding>,
    #[serde(default)]
    pub notification_opt_outs: Vec<String>,
}
