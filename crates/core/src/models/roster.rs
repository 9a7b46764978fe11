use std::fmt;
use std::str::FromStr;

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::errors::RosterError;

/// Capacity of every ranked and practice unit.
pub const ROSTER_CAPACITY: usize = 5;

/// The three weekly boards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    Ranked,
    Practice,
    Scrim,
}

impl GroupKind {
    pub const ALL: [GroupKind; 3] = [GroupKind::Ranked, GroupKind::Practice, GroupKind::Scrim];

    pub fn as_str(&self) -> &'static str {
        match self {
            GroupKind::Ranked => "ranked",
            GroupKind::Practice => "practice",
            GroupKind::Scrim => "scrim",
        }
    }

    /// Human readable name used on boards and in notifications.
    pub fn title(&self) -> &'static str {
        match self {
            GroupKind::Ranked => "Ranked",
            GroupKind::Practice => "Practice",
            GroupKind::Scrim => "Scrim",
        }
    }

    /// Capacity of units in this group, `None` when uncapped.
    pub fn unit_capacity(&self) -> Option<usize> {
        match self {
            GroupKind::Ranked | GroupKind::Practice => Some(ROSTER_CAPACITY),
            GroupKind::Scrim => None,
        }
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupKind {
    type Err = RosterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ranked" => Ok(GroupKind::Ranked),
            "practice" => Ok(GroupKind::Practice),
            "scrim" => Ok(GroupKind::Scrim),
            other => Err(RosterError::Validation(format!("Unknown roster group '{}'", other))),
        }
    }
}

/// Identity of a unit inside its group: a session day or a scrim game number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum UnitSlot {
    Day(Weekday),
    Game(u8),
}

impl UnitSlot {
    /// Board label, e.g. "Friday" or "Game 2".
    pub fn label(&self) -> String {
        match self {
            UnitSlot::Day(day) => weekday_name(*day).to_string(),
            UnitSlot::Game(n) => format!("Game {}", n),
        }
    }
}

impl fmt::Display for UnitSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitSlot::Day(day) => f.write_str(weekday_code(*day)),
            UnitSlot::Game(n) => write!(f, "game-{}", n),
        }
    }
}

impl FromStr for UnitSlot {
    type Err = RosterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        if let Some(number) = s.strip_prefix("game-") {
            let n = number
                .parse::<u8>()
                .map_err(|_| RosterError::UnknownUnit(s.clone()))?;
            if n == 0 {
                return Err(RosterError::UnknownUnit(s));
            }
            return Ok(UnitSlot::Game(n));
        }

        s.parse::<Weekday>()
            .map(UnitSlot::Day)
            .map_err(|_| RosterError::UnknownUnit(s))
    }
}

impl TryFrom<String> for UnitSlot {
    type Error = RosterError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<UnitSlot> for String {
    fn from(slot: UnitSlot) -> Self {
        slot.to_string()
    }
}

/// Fully qualified unit identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitKey {
    pub group: GroupKind,
    pub slot: UnitSlot,
}

impl UnitKey {
    pub fn new(group: GroupKind, slot: UnitSlot) -> Self {
        Self { group, slot }
    }

    pub fn day(group: GroupKind, day: Weekday) -> Self {
        Self::new(group, UnitSlot::Day(day))
    }

    pub fn game(number: u8) -> Self {
        Self::new(GroupKind::Scrim, UnitSlot::Game(number))
    }
}

impl fmt::Display for UnitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group, self.slot)
    }
}

/// One signup bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterUnit {
    pub slot: UnitSlot,
    pub capacity: Option<usize>,
    pub members: Vec<String>,
}

impl RosterUnit {
    pub fn new(slot: UnitSlot, capacity: Option<usize>) -> Self {
        Self {
            slot,
            capacity,
            members: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.capacity.is_some_and(|capacity| self.members.len() >= capacity)
    }

    pub fn contains(&self, participant: &str) -> bool {
        self.members.iter().any(|member| member == participant)
    }
}

pub(crate) fn weekday_code(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "mon",
        Weekday::Tue => "tue",
        Weekday::Wed => "wed",
        Weekday::Thu => "thu",
        Weekday::Fri => "fri",
        Weekday::Sat => "sat",
        Weekday::Sun => "sun",
    }
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}
