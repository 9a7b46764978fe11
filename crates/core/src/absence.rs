use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::debug;

use crate::clock::local_date;
use crate::errors::{RosterError, RosterResult};
use crate::models::absence::AbsenceWindow;

/// Tracks the date windows in which participants are away.
#[derive(Debug, Clone, Default)]
pub struct AbsenceRegistry {
    windows: Vec<AbsenceWindow>,
}

impl AbsenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_windows(windows: Vec<AbsenceWindow>) -> Self {
        Self { windows }
    }

    /// Registers a new window. Overlapping windows for the same participant are allowed.
    pub fn add(
        &mut self,
        participant: &str,
        start: NaiveDate,
        end: NaiveDate,
        created_at: DateTime<Utc>,
    ) -> RosterResult<&AbsenceWindow> {
        if end < start {
            return Err(RosterError::Validation(format!(
                "Absence ends ({}) before it starts ({})",
                end, start
            )));
        }

        debug!("Adding absence for {}: {} to {}", participant, start, end);
        self.windows.push(AbsenceWindow {
            participant_id: participant.to_string(),
            start_date: start,
            end_date: end,
            created_at,
        });

        Ok(&self.windows[self.windows.len() - 1])
    }

    /// Removes every window held by `participant`, returning how many were dropped.
    pub fn clear_participant(&mut self, participant: &str) -> usize {
        let before = self.windows.len();
        self.windows.retain(|w| w.participant_id != participant);
        before - self.windows.len()
    }

    /// Drops windows that ended before `today`.
    pub fn prune_before(&mut self, today: NaiveDate) -> usize {
        let before = self.windows.len();
        self.windows.retain(|w| w.end_date >= today);
        before - self.windows.len()
    }

    pub fn is_absent_on(&self, participant: &str, date: NaiveDate) -> bool {
        self.windows
            .iter()
            .any(|w| w.participant_id == participant && w.covers(date))
    }

    pub fn is_absent_today(&self, participant: &str, now: DateTime<Utc>, tz: Tz) -> bool {
        self.is_absent_on(participant, local_date(now, tz))
    }

    pub fn windows_for<'a>(&'a self, participant: &'a str) -> impl Iterator<Item = &'a AbsenceWindow> + 'a {
        self.windows.iter().filter(move |w| w.participant_id == participant)
    }

    pub fn windows(&self) -> &[AbsenceWindow] {
        &self.windows
    }
}
