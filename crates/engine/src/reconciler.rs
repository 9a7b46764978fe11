//! Keeps posted boards in line with state: replaces deleted or aged boards, edits
//! live ones in place and removes scrim boards once their day is over.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::{debug, info, warn};

use rostersync_core::board::{BoardView, is_board_valid, scrim_board_expiry};
use rostersync_core::clock::local_date;
use rostersync_core::errors::{RosterError, RosterResult};
use rostersync_core::models::board::BoardBinding;
use rostersync_core::models::roster::GroupKind;
use rostersync_core::platform::ChatPlatform;
use rostersync_core::state::AppState;

/// What `ensure_board` had to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardOutcome {
    /// The bound message was still valid and has been edited in place.
    Edited(BoardBinding),
    /// A fresh message was posted and bound.
    Posted(BoardBinding),
}

impl BoardOutcome {
    pub fn binding(&self) -> &BoardBinding {
        match self {
            BoardOutcome::Edited(binding) | BoardOutcome::Posted(binding) => binding,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub checked: usize,
    pub posted: Vec<BoardBinding>,
    pub failed: usize,
}

pub struct BoardReconciler<'a> {
    platform: &'a dyn ChatPlatform,
    timezone: Tz,
}

impl<'a> BoardReconciler<'a> {
    pub fn new(platform: &'a dyn ChatPlatform, timezone: Tz) -> Self {
        Self { platform, timezone }
    }

    pub fn render(&self, state: &AppState, group: GroupKind, now: DateTime<Utc>) -> BoardView {
        BoardView::build(
            group,
            &state.rosters,
            &state.absences,
            local_date(now, self.timezone),
        )
    }

    /// Makes sure `channel_id` shows a current board for `group`. Membership is never
    /// touched; only the binding may be replaced.
    pub async fn ensure_board(
        &self,
        state: &mut AppState,
        group: GroupKind,
        channel_id: &str,
        now: DateTime<Utc>,
    ) -> RosterResult<BoardOutcome> {
        let view = self.render(state, group, now);

        if let Some(binding) = state.bindings.get(channel_id, group).cloned() {
            match self.check(&binding, now).await {
                Ok(()) => match self
                    .platform
                    .edit_board(channel_id, &binding.message_id, &view)
                    .await
                {
                    Ok(()) => return Ok(BoardOutcome::Edited(binding)),
                    Err(e) => warn!(
                        "{}",
                        RosterError::StaleBoard {
                            channel_id: channel_id.to_string(),
                            reason: format!("edit failed: {}", e),
                        }
                    ),
                },
                Err(stale) => info!("{}", stale),
            }

            if let Err(e) = self
                .platform
                .delete_message(channel_id, &binding.message_id)
                .await
            {
                debug!("Could not delete stale board {}: {}", binding.message_id, e);
            }
        }

        let message_id = self
            .platform
            .post_board(channel_id, &view)
            .await
            .map_err(|e| {
                RosterError::ReconcileFailed(format!(
                    "posting {} board in {} failed: {}",
                    group, channel_id, e
                ))
            })?;

        let binding = BoardBinding {
            group,
            channel_id: channel_id.to_string(),
            message_id,
            posted_at: now,
            expires_at: self.expiry_for(state, group, now),
        };
        state.bindings.insert(binding.clone());
        info!("Posted {} board {} in {}", group, binding.message_id, channel_id);

        Ok(BoardOutcome::Posted(binding))
    }

    /// Re-renders every board of `group`, replacing those that can no longer be edited.
    pub async fn refresh_group(&self, state: &mut AppState, group: GroupKind, now: DateTime<Utc>) -> ReconcileReport {
        let view = self.render(state, group, now);
        let mut report = ReconcileReport::default();

        for binding in state.bindings.for_group(group) {
            report.checked += 1;
            if self
                .platform
                .edit_board(&binding.channel_id, &binding.message_id, &view)
                .await
                .is_ok()
            {
                continue;
            }

            match self.ensure_board(state, group, &binding.channel_id, now).await {
                Ok(BoardOutcome::Posted(posted)) => report.posted.push(posted),
                Ok(BoardOutcome::Edited(_)) => {}
                Err(e) => {
                    warn!("{}", e);
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Deletes scrim boards whose expiry has passed and drops their bindings.
    pub async fn sweep_expired(&self, state: &mut AppState, now: DateTime<Utc>) -> Vec<BoardBinding> {
        let expired = state.bindings.expired(now);

        for binding in &expired {
            self.retire(state, binding).await;
        }

        if !expired.is_empty() {
            info!("Removed {} expired boards", expired.len());
        }
        expired
    }

    /// Removes one binding and its message; a message that is already gone is fine.
    pub async fn retire(&self, state: &mut AppState, binding: &BoardBinding) {
        if let Err(e) = self
            .platform
            .delete_message(&binding.channel_id, &binding.message_id)
            .await
        {
            debug!("Could not delete board {}: {}", binding.message_id, e);
        }
        state.bindings.remove(&binding.channel_id, binding.group);
    }

    /// Runs `ensure_board` for every known binding. Failures are logged and counted.
    pub async fn reconcile_all(&self, state: &mut AppState, now: DateTime<Utc>) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        for binding in state.bindings.all() {
            report.checked += 1;
            match self
                .ensure_board(state, binding.group, &binding.channel_id, now)
                .await
            {
                Ok(BoardOutcome::Posted(posted)) => report.posted.push(posted),
                Ok(BoardOutcome::Edited(_)) => {}
                Err(e) => {
                    warn!("{}", e);
                    report.failed += 1;
                }
            }
        }

        debug!(
            "Reconciled {} boards ({} reposted, {} failed)",
            report.checked,
            report.posted.len(),
            report.failed
        );
        report
    }

    async fn check(&self, binding: &BoardBinding, now: DateTime<Utc>) -> RosterResult<()> {
        let fetched = match self
            .platform
            .fetch_message(&binding.channel_id, &binding.message_id)
            .await
        {
            Ok(fetched) => fetched,
            Err(e) => {
                debug!("Fetching board {} failed: {}", binding.message_id, e);
                None
            }
        };

        let age = fetched
            .map(|info| now - info.created_at)
            .unwrap_or_else(|| now - binding.posted_at);

        if is_board_valid(fetched.is_some(), age) {
            return Ok(());
        }

        let reason = if fetched.is_none() {
            "message is gone".to_string()
        } else {
            format!("message is {} days old", age.num_days())
        };
        Err(RosterError::StaleBoard {
            channel_id: binding.channel_id.clone(),
            reason,
        })
    }

    fn expiry_for(&self, state: &AppState, group: GroupKind, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if group != GroupKind::Scrim {
            return None;
        }
        let scrim_day = state.rosters.group(group).schedule.sessions.first()?.day;
        Some(scrim_board_expiry(now, scrim_day, self.timezone))
    }
}
