//! Membership of every roster unit.
//!
//! All mutation goes through [`RosterStore`], which enforces two invariants at the
//! mutation boundary: a unit never holds the same participant twice, and a capped
//! unit never holds more members than its capacity. [`RosterStore::validate`] is the
//! only place that repairs state after the fact (snapshot loads, bulk admin edits).

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::errors::{RosterError, RosterResult};
use crate::models::roster::{GroupKind, RosterUnit, UnitKey, UnitSlot};
use crate::models::schedule::{GroupSchedule, ScheduleConfigs};

/// A group of units sharing one schedule configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterGroup {
    pub kind: GroupKind,
    pub schedule: GroupSchedule,
    pub units: Vec<RosterUnit>,
}

impl RosterGroup {
    fn empty(kind: GroupKind, schedule: GroupSchedule) -> Self {
        let units = schedule
            .slots(kind)
            .into_iter()
            .map(|slot| RosterUnit::new(slot, kind.unit_capacity()))
            .collect();

        Self {
            kind,
            schedule,
            units,
        }
    }

    pub fn unit(&self, slot: UnitSlot) -> Option<&RosterUnit> {
        self.units.iter().find(|u| u.slot == slot)
    }

    fn unit_mut(&mut self, slot: UnitSlot) -> Option<&mut RosterUnit> {
        self.units.iter_mut().find(|u| u.slot == slot)
    }

    pub fn keys(&self) -> impl Iterator<Item = UnitKey> + '_ {
        self.units.iter().map(|u| UnitKey::new(self.kind, u.slot))
    }
}

/// Outcome of a toggle: which way the participant moved and the sizes around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Joined { size: usize },
    Left { previous: usize, size: usize },
}

impl Toggle {
    pub fn size(&self) -> usize {
        match self {
            Toggle::Joined { size } | Toggle::Left { size, .. } => *size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterStore {
    groups: Vec<RosterGroup>,
}

impl RosterStore {
    /// Creates empty units for every configured slot.
    pub fn new(schedules: &ScheduleConfigs) -> Self {
        let groups = GroupKind::ALL
            .iter()
            .map(|kind| RosterGroup::empty(*kind, schedules.get(*kind).clone()))
            .collect();

        Self { groups }
    }

    fn index(kind: GroupKind) -> usize {
        match kind {
            GroupKind::Ranked => 0,
            GroupKind::Practice => 1,
            GroupKind::Scrim => 2,
        }
    }

    pub fn group(&self, kind: GroupKind) -> &RosterGroup {
        &self.groups[Self::index(kind)]
    }

    fn group_mut(&mut self, kind: GroupKind) -> &mut RosterGroup {
        &mut self.groups[Self::index(kind)]
    }

    pub fn groups(&self) -> &[RosterGroup] {
        &self.groups
    }

    pub fn unit(&self, key: UnitKey) -> Option<&RosterUnit> {
        self.group(key.group).unit(key.slot)
    }

    fn unit_mut(&mut self, key: UnitKey) -> RosterResult<&mut RosterUnit> {
        self.group_mut(key.group)
            .unit_mut(key.slot)
            .ok_or_else(|| RosterError::UnknownUnit(key.to_string()))
    }

    pub fn members(&self, key: UnitKey) -> &[String] {
        self.unit(key).map(|u| u.members.as_slice()).unwrap_or(&[])
    }

    /// Current schedule configuration of all groups.
    pub fn schedules(&self) -> ScheduleConfigs {
        ScheduleConfigs {
            ranked: self.group(GroupKind::Ranked).schedule.clone(),
            practice: self.group(GroupKind::Practice).schedule.clone(),
            scrim: self.group(GroupKind::Scrim).schedule.clone(),
        }
    }

    pub fn is_signed_up(&self, kind: GroupKind, participant: &str) -> bool {
        self.group(kind).units.iter().any(|u| u.contains(participant))
    }

    /// Adds `participant` to the unit and returns the new size.
    pub fn try_add(&mut self, key: UnitKey, participant: &str) -> RosterResult<usize> {
        let unit = self.unit_mut(key)?;

        if unit.contains(participant) {
            return Err(RosterError::AlreadyMember {
                unit: key,
                participant: participant.to_string(),
            });
        }

        if let Some(capacity) = unit.capacity {
            if unit.members.len() >= capacity {
                return Err(RosterError::CapacityExceeded {
                    unit: key,
                    capacity,
                });
            }
        }

        unit.members.push(participant.to_string());
        debug!("{} joined {} ({} members)", participant, key, unit.members.len());
        Ok(unit.members.len())
    }

    /// Removes `participant` from the unit and returns the size before removal.
    pub fn remove(&mut self, key: UnitKey, participant: &str) -> RosterResult<usize> {
        let unit = self.unit_mut(key)?;
        let previous = unit.members.len();

        let Some(position) = unit.members.iter().position(|m| m == participant) else {
            return Err(RosterError::NotMember {
                unit: key,
                participant: participant.to_string(),
            });
        };

        unit.members.remove(position);
        debug!("{} left {} ({} members)", participant, key, unit.members.len());
        Ok(previous)
    }

    /// Leaves the unit if signed up, joins otherwise.
    pub fn toggle(&mut self, key: UnitKey, participant: &str) -> RosterResult<Toggle> {
        let is_member = self
            .unit(key)
            .ok_or_else(|| RosterError::UnknownUnit(key.to_string()))?
            .contains(participant);

        if is_member {
            let previous = self.remove(key, participant)?;
            Ok(Toggle::Left {
                previous,
                size: previous - 1,
            })
        } else {
            let size = self.try_add(key, participant)?;
            Ok(Toggle::Joined { size })
        }
    }

    /// Empties a unit, returning the members it held.
    pub fn clear_unit(&mut self, key: UnitKey) -> RosterResult<Vec<String>> {
        let unit = self.unit_mut(key)?;
        let removed = std::mem::take(&mut unit.members);
        if !removed.is_empty() {
            info!("Cleared {} ({} members)", key, removed.len());
        }
        Ok(removed)
    }

    /// Empties every unit of a group, returning the keys that held members.
    pub fn clear_group(&mut self, kind: GroupKind) -> Vec<UnitKey> {
        let group = self.group_mut(kind);
        let mut cleared = Vec::new();
        for unit in &mut group.units {
            if !unit.members.is_empty() {
                unit.members.clear();
                cleared.push(UnitKey::new(kind, unit.slot));
            }
        }
        info!("Cleared {} roster ({} units had members)", kind, cleared.len());
        cleared
    }

    /// Repairs duplicate and over-capacity units in a group. Returns the number of
    /// units that needed repair.
    pub fn validate(&mut self, kind: GroupKind) -> usize {
        let mut repaired = 0;

        for unit in &mut self.group_mut(kind).units {
            let key = UnitKey::new(kind, unit.slot);
            let mut seen = HashSet::new();
            let before = unit.members.len();
            unit.members.retain(|m| seen.insert(m.clone()));
            let duplicates = before - unit.members.len();
            if duplicates > 0 {
                warn!("Repaired {}: removed {} duplicate members", key, duplicates);
            }

            let mut truncated = 0;
            if let Some(capacity) = unit.capacity {
                if unit.members.len() > capacity {
                    truncated = unit.members.len() - capacity;
                    unit.members.truncate(capacity);
                    warn!(
                        "Repaired {}: truncated {} members over capacity {}",
                        key, truncated, capacity
                    );
                }
            }

            if duplicates > 0 || truncated > 0 {
                repaired += 1;
            }
        }

        repaired
    }

    pub fn validate_all(&mut self) -> usize {
        GroupKind::ALL.iter().map(|kind| self.validate(*kind)).sum()
    }

    /// Applies a new schedule to a group, keeping members of slots that remain configured.
    pub fn reconfigure(&mut self, kind: GroupKind, schedule: GroupSchedule) -> RosterResult<()> {
        schedule.validate(kind)?;

        let old = std::mem::replace(self.group_mut(kind), RosterGroup::empty(kind, schedule));
        self.restore(kind, old.units);
        info!("Reconfigured {} roster", kind);
        Ok(())
    }

    /// Merges loaded units into the currently configured (fresh) units of a group.
    /// Units whose slot is no longer configured are dropped.
    pub fn restore(&mut self, kind: GroupKind, units: Vec<RosterUnit>) {
        let group = self.group_mut(kind);
        for loaded in units {
            match group.unit_mut(loaded.slot) {
                Some(unit) => unit.members = loaded.members,
                None if !loaded.members.is_empty() => warn!(
                    "Dropping {} members of {}/{}: slot is no longer configured",
                    loaded.members.len(),
                    kind,
                    loaded.slot
                ),
                None => {}
            }
        }
    }
}
