//! Board rendering model and binding validity rules.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::absence::AbsenceRegistry;
use crate::clock::{local_date, local_midnight, next_weekday_on_or_after};
use crate::errors::RosterError;
use crate::models::roster::{GroupKind, UnitKey, UnitSlot};
use crate::roster::RosterStore;

/// Boards older than this are replaced even if the message still exists.
pub const BOARD_MAX_AGE: Duration = Duration::days(7);

const ACTION_PREFIX: &str = "roster";

/// A board is usable only if its message could be fetched and is younger than
/// [`BOARD_MAX_AGE`].
pub fn is_board_valid(fetch_succeeded: bool, age: Duration) -> bool {
    fetch_succeeded && age < BOARD_MAX_AGE
}

/// Expiry of a scrim board posted at `now`: the local midnight that ends the next
/// occurrence of the scrim day. A board posted on scrim day expires that night.
pub fn scrim_board_expiry(now: DateTime<Utc>, scrim_day: chrono::Weekday, tz: Tz) -> DateTime<Utc> {
    let day = next_weekday_on_or_after(local_date(now, tz), scrim_day);
    local_midnight(day + Duration::days(1), tz)
}

/// Button payload identifying the unit a participant wants to toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleAction {
    pub unit: UnitKey,
}

impl ToggleAction {
    pub fn new(unit: UnitKey) -> Self {
        Self { unit }
    }
}

impl fmt::Display for ToggleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", ACTION_PREFIX, self.unit.group, self.unit.slot)
    }
}

impl FromStr for ToggleAction {
    type Err = RosterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(ACTION_PREFIX), Some(group), Some(slot)) => {
                let group: GroupKind = group.parse()?;
                let slot: UnitSlot = slot.parse()?;
                Ok(Self::new(UnitKey::new(group, slot)))
            }
            _ => Err(RosterError::UnknownUnit(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberView {
    pub participant_id: String,
    pub absent: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitView {
    pub action: ToggleAction,
    pub label: String,
    pub session: Option<String>,
    pub members: Vec<MemberView>,
    pub capacity: Option<usize>,
}

impl UnitView {
    /// Counter shown next to the unit, e.g. "3/5" or "7" for uncapped units.
    pub fn counter(&self) -> String {
        match self.capacity {
            Some(capacity) => format!("{}/{}", self.members.len(), capacity),
            None => self.members.len().to_string(),
        }
    }
}

/// Everything a platform adapter needs to draw a board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardView {
    pub group: GroupKind,
    pub title: String,
    pub units: Vec<UnitView>,
    pub rendered_on: NaiveDate,
}

impl BoardView {
    /// Builds the view from the state at call time.
    pub fn build(group: GroupKind, rosters: &RosterStore, absences: &AbsenceRegistry, today: NaiveDate) -> Self {
        let roster_group = rosters.group(group);

        let units = roster_group
            .units
            .iter()
            .map(|unit| {
                let session = roster_group.schedule.session_for(unit.slot);
                let session_date = session.map(|s| next_weekday_on_or_after(today, s.day));
                UnitView {
                    action: ToggleAction::new(UnitKey::new(group, unit.slot)),
                    label: unit.slot.label(),
                    session: session.map(|s| s.label()),
                    members: unit
                        .members
                        .iter()
                        .map(|m| MemberView {
                            participant_id: m.clone(),
                            absent: session_date.is_some_and(|d| absences.is_absent_on(m, d)),
                        })
                        .collect(),
                    capacity: unit.capacity,
                }
            })
            .collect();

        Self {
            group,
            title: format!("{} sign-ups", group.title()),
            units,
            rendered_on: today,
        }
    }

    /// Plain-text rendering used in logs and by adapters without rich embeds.
    pub fn to_text(&self) -> String {
        let mut text = format!("**{}**\n", self.title);
        for unit in &self.units {
            text.push_str(&format!("\n**{}** ({})", unit.label, unit.counter()));
            if let Some(session) = &unit.session {
                text.push_str(&format!(" - {}", session));
            }
            text.push('\n');
            if unit.members.is_empty() {
                text.push_str("  nobody yet\n");
            }
            for member in &unit.members {
                let marker = if member.absent { " (away)" } else { "" };
                text.push_str(&format!("  - <@{}>{}\n", member.participant_id, marker));
            }
        }
        text
    }
}
