//! Quorum notification state machine.
//!
//! Every capped unit owns a [`NotificationState`]. Membership changes are fed in
//! through [`NotificationCoordinator::on_size_change`], which answers with explicit
//! [`NotifyAction`]s: dispatch now, arm a deferred dispatch, or disarm one. The
//! caller owns the actual timers and reports back through
//! [`NotificationCoordinator::on_timer_elapsed`] with the token it was given.
//!
//! Each (unit, kind) pair dispatches at most once per [`NOTIFICATION_COOLDOWN`].
//! Transitions inside the cooldown set a pending flag and arm a single timer for the
//! end of the window; when it fires the *current* size decides whether to send.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::debug;

use crate::models::roster::UnitKey;

/// Minimum spacing between two dispatches of the same kind for the same unit.
pub const NOTIFICATION_COOLDOWN: Duration = Duration::hours(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    /// The unit reached quorum.
    Found,
    /// The unit dropped below quorum after having been full.
    Cancel,
}

impl NotificationKind {
    /// Whether a unit of this size still warrants this kind of notification.
    pub fn applies(&self, size: usize, capacity: usize) -> bool {
        match self {
            NotificationKind::Found => size == capacity,
            NotificationKind::Cancel => size > 0 && size < capacity,
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationKind::Found => f.write_str("found"),
            NotificationKind::Cancel => f.write_str("cancel"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Waiting,
    Full,
    Cancelled,
}

/// Opaque handle identifying one armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(u64);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KindState {
    pub last_dispatch_at: Option<DateTime<Utc>>,
    pub pending: bool,
    pub timer: Option<TimerToken>,
}

impl KindState {
    fn cooldown_remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        let last = self.last_dispatch_at?;
        let elapsed = now - last;
        (elapsed < NOTIFICATION_COOLDOWN).then(|| NOTIFICATION_COOLDOWN - elapsed)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationState {
    pub phase: Phase,
    pub found: KindState,
    pub cancel: KindState,
    pub last_reminder_on: Option<NaiveDate>,
}

impl NotificationState {
    pub fn kind(&self, kind: NotificationKind) -> &KindState {
        match kind {
            NotificationKind::Found => &self.found,
            NotificationKind::Cancel => &self.cancel,
        }
    }

    fn kind_mut(&mut self, kind: NotificationKind) -> &mut KindState {
        match kind {
            NotificationKind::Found => &mut self.found,
            NotificationKind::Cancel => &mut self.cancel,
        }
    }
}

/// What the caller must do after feeding a change into the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyAction {
    Dispatch(NotificationKind),
    Arm {
        kind: NotificationKind,
        token: TimerToken,
        delay: Duration,
    },
    Disarm {
        kind: NotificationKind,
        token: TimerToken,
    },
}

#[derive(Debug, Default)]
pub struct NotificationCoordinator {
    states: HashMap<UnitKey, NotificationState>,
    next_token: u64,
}

impl NotificationCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, unit: UnitKey) -> Option<&NotificationState> {
        self.states.get(&unit)
    }

    /// Feeds the new size of a capped unit after a membership change.
    pub fn on_size_change(
        &mut self,
        unit: UnitKey,
        size: usize,
        capacity: usize,
        now: DateTime<Utc>,
    ) -> Vec<NotifyAction> {
        let phase = self.states.entry(unit).or_default().phase;

        if size == 0 {
            if phase != Phase::Waiting {
                debug!("{} emptied, back to waiting", unit);
            }
            self.entry(unit).phase = Phase::Waiting;
            return Vec::new();
        }

        if size >= capacity && phase != Phase::Full {
            self.entry(unit).phase = Phase::Full;
            return self.attempt(unit, NotificationKind::Found, now);
        }

        if size < capacity && phase == Phase::Full {
            self.entry(unit).phase = Phase::Cancelled;
            return self.attempt(unit, NotificationKind::Cancel, now);
        }

        Vec::new()
    }

    /// Handles a fired timer. Returns the kind to dispatch, if any.
    pub fn on_timer_elapsed(
        &mut self,
        unit: UnitKey,
        kind: NotificationKind,
        token: TimerToken,
        size: usize,
        capacity: usize,
        now: DateTime<Utc>,
    ) -> Option<NotificationKind> {
        let state = self.states.get_mut(&unit)?.kind_mut(kind);

        if state.timer != Some(token) {
            debug!("Ignoring stale {} timer for {}", kind, unit);
            return None;
        }

        state.timer = None;
        let was_pending = std::mem::take(&mut state.pending);

        if was_pending && kind.applies(size, capacity) {
            state.last_dispatch_at = Some(now);
            debug!("Deferred {} notification for {} is due", kind, unit);
            Some(kind)
        } else {
            debug!("Deferred {} notification for {} no longer applies", kind, unit);
            None
        }
    }

    /// Sets the phase of a freshly restored unit without dispatching anything.
    pub fn prime(&mut self, unit: UnitKey, size: usize, capacity: usize) {
        let state = self.entry(unit);
        state.phase = if size >= capacity {
            Phase::Full
        } else {
            Phase::Waiting
        };
    }

    /// Returns the unit to `waiting` and hands back any live timers to disarm.
    /// Dispatch timestamps are kept so the cooldown still holds across resets.
    pub fn reset(&mut self, unit: UnitKey) -> Vec<NotifyAction> {
        let Some(state) = self.states.get_mut(&unit) else {
            return Vec::new();
        };

        state.phase = Phase::Waiting;
        state.last_reminder_on = None;

        let mut actions = Vec::new();
        for kind in [NotificationKind::Found, NotificationKind::Cancel] {
            let kind_state = state.kind_mut(kind);
            kind_state.pending = false;
            if let Some(token) = kind_state.timer.take() {
                actions.push(NotifyAction::Disarm { kind, token });
            }
        }
        actions
    }

    /// True at most once per calendar day, and only while the unit is full.
    pub fn take_reminder(&mut self, unit: UnitKey, today: NaiveDate) -> bool {
        let Some(state) = self.states.get_mut(&unit) else {
            return false;
        };

        if state.phase != Phase::Full || state.last_reminder_on == Some(today) {
            return false;
        }

        state.last_reminder_on = Some(today);
        true
    }

    fn entry(&mut self, unit: UnitKey) -> &mut NotificationState {
        self.states.entry(unit).or_default()
    }

    fn attempt(
        &mut self,
        unit: UnitKey,
        kind: NotificationKind,
        now: DateTime<Utc>,
    ) -> Vec<NotifyAction> {
        let next_token = self.next_token;
        let state = self.states.entry(unit).or_default().kind_mut(kind);

        match state.cooldown_remaining(now) {
            None => {
                state.last_dispatch_at = Some(now);
                state.pending = false;
                let mut actions = vec![NotifyAction::Dispatch(kind)];
                if let Some(token) = state.timer.take() {
                    actions.push(NotifyAction::Disarm { kind, token });
                }
                actions
            }
            Some(remaining) => {
                state.pending = true;
                if let Some(live) = state.timer {
                    debug!(
                        "{} notification for {} already deferred ({:?}); not arming another timer",
                        kind, unit, live
                    );
                    return Vec::new();
                }

                let token = TimerToken(next_token);
                state.timer = Some(token);
                self.next_token += 1;
                debug!(
                    "Deferring {} notification for {} by {}s",
                    kind,
                    unit,
                    remaining.num_seconds()
                );
                vec![NotifyAction::Arm {
                    kind,
                    token,
                    delay: remaining,
                }]
            }
        }
    }
}
