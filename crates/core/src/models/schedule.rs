use std::collections::HashSet;

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::errors::{RosterError, RosterResult};
use crate::models::roster::{GroupKind, UnitSlot, weekday_name};

/// Upper bound on the number of scrim games per week.
pub const MAX_SCRIM_GAMES: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTime {
    pub day: Weekday,
    pub time: NaiveTime,
}

impl SessionTime {
    pub fn new(day: Weekday, hour: u32, minute: u32) -> Self {
        Self {
            day,
            time: NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN),
        }
    }

    pub fn label(&self) -> String {
        format!("{} {}", weekday_name(self.day), self.time.format("%H:%M"))
    }
}

/// Schedule configuration shared by all units of a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSchedule {
    pub sessions: Vec<SessionTime>,
    /// Number of scrim games; only meaningful for the scrim group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub games: Option<u8>,
}

impl GroupSchedule {
    pub fn default_for(group: GroupKind) -> Self {
        match group {
            GroupKind::Ranked => Self {
                sessions: vec![
                    SessionTime::new(Weekday::Fri, 20, 0),
                    SessionTime::new(Weekday::Sat, 20, 0),
                    SessionTime::new(Weekday::Sun, 20, 0),
                ],
                games: None,
            },
            GroupKind::Practice => Self {
                sessions: vec![
                    SessionTime::new(Weekday::Tue, 19, 0),
                    SessionTime::new(Weekday::Thu, 19, 0),
                ],
                games: None,
            },
            GroupKind::Scrim => Self {
                sessions: vec![SessionTime::new(Weekday::Wed, 20, 0)],
                games: Some(3),
            },
        }
    }

    /// Checks the schedule against the shape allowed for `group`.
    pub fn validate(&self, group: GroupKind) -> RosterResult<()> {
        let max_sessions = match group {
            GroupKind::Ranked => 3,
            GroupKind::Practice => 2,
            GroupKind::Scrim => 1,
        };

        if self.sessions.is_empty() || self.sessions.len() > max_sessions {
            return Err(RosterError::Validation(format!(
                "{} needs between 1 and {} session days, got {}",
                group.title(),
                max_sessions,
                self.sessions.len()
            )));
        }

        let mut seen = HashSet::new();
        for session in &self.sessions {
            if !seen.insert(session.day) {
                return Err(RosterError::Validation(format!(
                    "{} is listed twice for {}",
                    weekday_name(session.day),
                    group.title()
                )));
            }
        }

        match (group, self.games) {
            (GroupKind::Scrim, Some(games)) if (1..=MAX_SCRIM_GAMES).contains(&games) => Ok(()),
            (GroupKind::Scrim, games) => Err(RosterError::Validation(format!(
                "Scrim needs between 1 and {} games, got {}",
                MAX_SCRIM_GAMES,
                games.map_or_else(|| "none".to_string(), |g| g.to_string())
            ))),
            (_, Some(_)) => Err(RosterError::Validation(format!(
                "{} does not take a game count",
                group.title()
            ))),
            (_, None) => Ok(()),
        }
    }

    /// Unit slots implied by this schedule, in board order.
    pub fn slots(&self, group: GroupKind) -> Vec<UnitSlot> {
        match group {
            GroupKind::Scrim => (1..=self.games.unwrap_or(1)).map(UnitSlot::Game).collect(),
            _ => self.sessions.iter().map(|s| UnitSlot::Day(s.day)).collect(),
        }
    }

    /// Session time for a unit; scrim games all share the single scrim session.
    pub fn session_for(&self, slot: UnitSlot) -> Option<&SessionTime> {
        match slot {
            UnitSlot::Day(day) => self.sessions.iter().find(|s| s.day == day),
            UnitSlot::Game(_) => self.sessions.first(),
        }
    }
}

/// Schedules of the three live groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfigs {
    pub ranked: GroupSchedule,
    pub practice: GroupSchedule,
    pub scrim: GroupSchedule,
}

impl Default for ScheduleConfigs {
    fn default() -> Self {
        Self {
            ranked: GroupSchedule::default_for(GroupKind::Ranked),
            practice: GroupSchedule::default_for(GroupKind::Practice),
            scrim: GroupSchedule::default_for(GroupKind::Scrim),
        }
    }
}

impl ScheduleConfigs {
    pub fn get(&self, group: GroupKind) -> &GroupSchedule {
        match group {
            GroupKind::Ranked => &self.ranked,
            GroupKind::Practice => &self.practice,
            GroupKind::Scrim => &self.scrim,
        }
    }

    pub fn set(&mut self, group: GroupKind, schedule: GroupSchedule) {
        match group {
            GroupKind::Ranked => self.ranked = schedule,
            GroupKind::Practice => self.practice = schedule,
            GroupKind::Scrim => self.scrim = schedule,
        }
    }
}
