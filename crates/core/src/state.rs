//! The application state aggregate and its conversion to and from snapshots.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::{info, warn};

use crate::absence::AbsenceRegistry;
use crate::models::board::BoardBinding;
use crate::models::roster::{GroupKind, UnitKey};
use crate::models::snapshot::{GroupSnapshot, SNAPSHOT_VERSION, Snapshot};
use crate::models::schedule::ScheduleConfigs;
use crate::notify::NotificationCoordinator;
use crate::roster::RosterStore;

/// Board bindings keyed by (channel, group).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardBindings {
    bindings: HashMap<(String, GroupKind), BoardBinding>,
}

impl BoardBindings {
    pub fn get(&self, channel_id: &str, group: GroupKind) -> Option<&BoardBinding> {
        self.bindings.get(&(channel_id.to_string(), group))
    }

    /// Records a binding, returning the one it replaced.
    pub fn insert(&mut self, binding: BoardBinding) -> Option<BoardBinding> {
        self.bindings
            .insert((binding.channel_id.clone(), binding.group), binding)
    }

    pub fn remove(&mut self, channel_id: &str, group: GroupKind) -> Option<BoardBinding> {
        self.bindings.remove(&(channel_id.to_string(), group))
    }

    pub fn for_group(&self, group: GroupKind) -> Vec<BoardBinding> {
        self.bindings
            .values()
            .filter(|b| b.group == group)
            .cloned()
            .collect()
    }

    pub fn expired(&self, now: DateTime<Utc>) -> Vec<BoardBinding> {
        self.bindings
            .values()
            .filter(|b| b.is_expired(now))
            .cloned()
            .collect()
    }

    /// All bindings in a stable order (group, then channel).
    pub fn all(&self) -> Vec<BoardBinding> {
        let mut all: Vec<BoardBinding> = self.bindings.values().cloned().collect();
        all.sort_by(|a, b| (a.group, &a.channel_id).cmp(&(b.group, &b.channel_id)));
        all
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// All mutable state of the service, owned by a single coordinating task.
#[derive(Debug)]
pub struct AppState {
    pub rosters: RosterStore,
    pub absences: AbsenceRegistry,
    pub notifications: NotificationCoordinator,
    pub bindings: BoardBindings,
    pub opt_outs: BTreeSet<String>,
}

impl AppState {
    pub fn new(schedules: &ScheduleConfigs) -> Self {
        Self {
            rosters: RosterStore::new(schedules),
            absences: AbsenceRegistry::new(),
            notifications: NotificationCoordinator::new(),
            bindings: BoardBindings::default(),
            opt_outs: BTreeSet::new(),
        }
    }

    /// Rebuilds state from a snapshot. Loaded schedules win over `defaults` unless they
    /// fail validation; membership is merged into fresh units and then validated.
    pub fn restore(snapshot: Snapshot, defaults: &ScheduleConfigs) -> Self {
        let mut schedules = defaults.clone();
        for group in GroupKind::ALL {
            let loaded = snapshot.schedule_configs.get(group);
            match loaded.validate(group) {
                Ok(()) => schedules.set(group, loaded.clone()),
                Err(e) => warn!("Ignoring stored {} schedule, using default: {}", group, e),
            }
        }

        let mut state = Self::new(&schedules);
        for GroupSnapshot { group, units } in snapshot.roster_groups {
            state.rosters.restore(group, units);
        }

        let repaired = state.rosters.validate_all();
        if repaired > 0 {
            warn!("Repaired {} roster units while restoring snapshot", repaired);
        }

        state.absences = AbsenceRegistry::from_windows(snapshot.absence_windows);
        for binding in snapshot.board_bindings {
            state.bindings.insert(binding);
        }
        state.opt_outs = snapshot.notification_opt_outs.into_iter().collect();

        for group in state.rosters.groups() {
            for unit in &group.units {
                if let Some(capacity) = unit.capacity {
                    state
                        .notifications
                        .prime(UnitKey::new(group.kind, unit.slot), unit.len(), capacity);
                }
            }
        }

        info!(
            "Restored snapshot from {} ({} absences, {} boards)",
            snapshot.timestamp,
            state.absences.windows().len(),
            state.bindings.len()
        );
        state
    }

    pub fn to_snapshot(&self, now: DateTime<Utc>) -> Snapshot {
        Snapshot {
            version: SNAPSHOT_VERSION,
            timestamp: now,
            schedule_configs: self.rosters.schedules(),
            roster_groups: self
                .rosters
                .groups()
                .iter()
                .map(|g| GroupSnapshot {
                    group: g.kind,
                    units: g.units.clone(),
                })
                .collect(),
            absence_windows: self.absences.windows().to_vec(),
            board_bindings: self.bindings.all(),
            notification_opt_outs: self.opt_outs.iter().cloned().collect(),
        }
    }

    /// Members of `unit` that should receive a notification right now.
    pub fn recipients(&self, unit: UnitKey, now: DateTime<Utc>, tz: Tz) -> Vec<String> {
        self.rosters
            .members(unit)
            .iter()
            .filter(|m| !self.opt_outs.contains(m.as_str()))
            .filter(|m| !self.absences.is_absent_today(m, now, tz))
            .cloned()
            .collect()
    }
}
