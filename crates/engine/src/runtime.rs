//! The engine actor.
//!
//! A single task owns [`AppState`] and drains a mailbox of [`Command`]s in arrival
//! order. Every mutation and notification decision happens before the first
//! `.await` of a handler, and the actor's reply is sent right after it. Timers
//! never touch state; they only post a command back into the mailbox.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use rostersync_core::board::ToggleAction;
use rostersync_core::clock::{Clock, local_date};
use rostersync_core::errors::{RosterError, RosterResult};
use rostersync_core::models::board::BoardBinding;
use rostersync_core::models::roster::{GroupKind, UnitKey, UnitSlot};
use rostersync_core::models::schedule::GroupSchedule;
use rostersync_core::models::snapshot::Snapshot;
use rostersync_core::notify::{NotificationKind, NotifyAction, TimerToken};
use rostersync_core::platform::ChatPlatform;
use rostersync_core::roster::Toggle;
use rostersync_core::state::AppState;
use rostersync_store::SnapshotManager;

use crate::config::EngineConfig;
use crate::dispatch::{self, DeliveryReport};
use crate::maintenance::{self, MaintenanceJob};
use crate::reconciler::{BoardOutcome, BoardReconciler};
use crate::reply::Reply;

const MAILBOX_CAPACITY: usize = 256;

pub type ReplySender = oneshot::Sender<Reply>;

#[derive(Debug)]
pub enum Command {
    Toggle {
        action_id: String,
        participant: String,
        reply: ReplySender,
    },
    AddAbsence {
        participant: String,
        start: NaiveDate,
        end: NaiveDate,
        reply: ReplySender,
    },
    ClearAbsences {
        participant: String,
        reply: ReplySender,
    },
    SetNotifications {
        participant: String,
        enabled: bool,
        reply: ReplySender,
    },
    PostBoard {
        group: GroupKind,
        channel_id: String,
        reply: ReplySender,
    },
    ClearGroup {
        group: GroupKind,
        reply: ReplySender,
    },
    ConfigureSchedule {
        group: GroupKind,
        schedule: GroupSchedule,
        reply: ReplySender,
    },
    DebounceElapsed {
        unit: UnitKey,
        kind: NotificationKind,
        token: TimerToken,
    },
    RefreshBoards {
        group: GroupKind,
    },
    ExpireBoard {
        channel_id: String,
        group: GroupKind,
    },
    Maintenance {
        job: MaintenanceJob,
        attempt: u8,
    },
    Inspect {
        reply: oneshot::Sender<Snapshot>,
    },
}

/// Cloneable front door to a running engine.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    mailbox: mpsc::Sender<Command>,
}

impl EngineHandle {
    pub async fn toggle(&self, action_id: &str, participant: &str) -> Reply {
        self.request(|reply| Command::Toggle {
            action_id: action_id.to_string(),
            participant: participant.to_string(),
            reply,
        })
        .await
    }

    pub async fn add_absence(&self, participant: &str, start: NaiveDate, end: NaiveDate) -> Reply {
        self.request(|reply| Command::AddAbsence {
            participant: participant.to_string(),
            start,
            end,
            reply,
        })
        .await
    }

    pub async fn clear_absences(&self, participant: &str) -> Reply {
        self.request(|reply| Command::ClearAbsences {
            participant: participant.to_string(),
            reply,
        })
        .await
    }

    pub async fn set_notifications(&self, participant: &str, enabled: bool) -> Reply {
        self.request(|reply| Command::SetNotifications {
            participant: participant.to_string(),
            enabled,
            reply,
        })
        .await
    }

    pub async fn post_board(&self, group: GroupKind, channel_id: &str) -> Reply {
        self.request(|reply| Command::PostBoard {
            group,
            channel_id: channel_id.to_string(),
            reply,
        })
        .await
    }

    pub async fn clear_group(&self, group: GroupKind) -> Reply {
        self.request(|reply| Command::ClearGroup { group, reply }).await
    }

    pub async fn configure_schedule(&self, group: GroupKind, schedule: GroupSchedule) -> Reply {
        self.request(|reply| Command::ConfigureSchedule {
            group,
            schedule,
            reply,
        })
        .await
    }

    /// Queues a maintenance job outside its schedule.
    pub async fn run_maintenance(&self, job: MaintenanceJob) {
        if self
            .mailbox
            .send(Command::Maintenance { job, attempt: 0 })
            .await
            .is_err()
        {
            warn!("Engine is not running, dropping {}", job);
        }
    }

    /// A snapshot of the current state, taken after every queued command has run.
    pub async fn snapshot(&self) -> Option<Snapshot> {
        let (reply, receiver) = oneshot::channel();
        self.mailbox.send(Command::Inspect { reply }).await.ok()?;
        receiver.await.ok()
    }

    async fn request(&self, build: impl FnOnce(ReplySender) -> Command) -> Reply {
        let (reply, receiver) = oneshot::channel();
        if self.mailbox.send(build(reply)).await.is_err() {
            return Reply::unavailable();
        }
        receiver.await.unwrap_or_else(|_| Reply::unavailable())
    }
}

pub struct Engine {
    state: AppState,
    config: EngineConfig,
    platform: Arc<dyn ChatPlatform>,
    snapshots: SnapshotManager,
    clock: Arc<dyn Clock>,
    mailbox: mpsc::Sender<Command>,
    inbox: mpsc::Receiver<Command>,
    debounce_timers: HashMap<TimerToken, JoinHandle<()>>,
    expiry_timers: HashMap<(String, GroupKind), JoinHandle<()>>,
    pending_renders: HashSet<GroupKind>,
}

impl Engine {
    pub fn new(config: EngineConfig, platform: Arc<dyn ChatPlatform>, clock: Arc<dyn Clock>) -> (Self, EngineHandle) {
        let (mailbox, inbox) = mpsc::channel(MAILBOX_CAPACITY);
        let handle = EngineHandle {
            mailbox: mailbox.clone(),
        };

        let engine = Self {
            state: AppState::new(&config.schedules),
            snapshots: SnapshotManager::new(config.snapshot_path.clone()),
            config,
            platform,
            clock,
            mailbox,
            inbox,
            debounce_timers: HashMap::new(),
            expiry_timers: HashMap::new(),
            pending_renders: HashSet::new(),
        };

        (engine, handle)
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn mailbox(&self) -> mpsc::Sender<Command> {
        self.mailbox.clone()
    }

    /// Restores the snapshot, removes expired scrim boards and reconciles the rest.
    /// Never fails: an unreadable snapshot is moved aside and the engine starts empty.
    pub async fn startup(&mut self) {
        let now = self.clock.now();
        let mut writable = true;
        match self.snapshots.load().await {
            Ok(Some(snapshot)) => self.state = AppState::restore(snapshot, &self.config.schedules),
            Ok(None) => {}
            Err(e) => {
                error!("Could not load snapshot, starting with empty state: {}", e);
                if let Err(e) = self.snapshots.quarantine(now).await {
                    error!("Keeping unreadable snapshot in place, not saving at startup: {}", e);
                    writable = false;
                }
            }
        }

        let reconciler = BoardReconciler::new(self.platform.as_ref(), self.config.timezone);
        reconciler.sweep_expired(&mut self.state, now).await;
        let report = reconciler.reconcile_all(&mut self.state, now).await;
        if report.failed > 0 {
            warn!("{} boards could not be reconciled at startup", report.failed);
        }

        for binding in self.state.bindings.all() {
            self.arm_expiry(&binding);
        }

        if writable {
            if let Err(e) = self.persist().await {
                error!("Failed to save snapshot after startup: {}", e);
            }
        }
        info!(
            "Engine ready with {} boards",
            self.state.bindings.len()
        );
    }

    /// Drains the mailbox for the life of the process.
    pub async fn run(mut self) {
        while let Some(command) = self.inbox.recv().await {
            self.handle(command).await;
        }
        info!("Engine mailbox closed, stopping");
    }

    pub async fn handle(&mut self, command: Command) {
        match command {
            Command::Toggle {
                action_id,
                participant,
                reply,
            } => self.on_toggle(&action_id, &participant, reply).await,
            Command::AddAbsence {
                participant,
                start,
                end,
                reply,
            } => self.on_add_absence(&participant, start, end, reply).await,
            Command::ClearAbsences { participant, reply } => {
                let removed = self.state.absences.clear_participant(&participant);
                let _ = reply.send(Reply::ephemeral(match removed {
                    0 => "You had no absences registered.".to_string(),
                    n => format!("Removed {} absence(s). Welcome back!", n),
                }));
                if removed > 0 {
                    self.schedule_all_renders();
                    self.persist_logged().await;
                }
            }
            Command::SetNotifications {
                participant,
                enabled,
                reply,
            } => {
                let changed = if enabled {
                    self.state.opt_outs.remove(&participant)
                } else {
                    self.state.opt_outs.insert(participant)
                };
                let _ = reply.send(Reply::ephemeral(if enabled {
                    "Roster notifications are on."
                } else {
                    "Roster notifications are off. You will not get direct messages about rosters."
                }));
                if changed {
                    self.persist_logged().await;
                }
            }
            Command::PostBoard {
                group,
                channel_id,
                reply,
            } => {
                let result = self.post_board(group, &channel_id).await;
                let _ = reply.send(match result {
                    Ok(_) => Reply::ephemeral(format!("{} board is up.", group.title())),
                    Err(e) => e.into(),
                });
            }
            Command::ClearGroup { group, reply } => self.on_clear_group(group, reply).await,
            Command::ConfigureSchedule {
                group,
                schedule,
                reply,
            } => self.on_configure(group, schedule, reply).await,
            Command::DebounceElapsed { unit, kind, token } => self.on_debounce_elapsed(unit, kind, token).await,
            Command::RefreshBoards { group } => {
                self.pending_renders.remove(&group);
                self.refresh(group).await;
            }
            Command::ExpireBoard { channel_id, group } => self.on_expire_board(&channel_id, group).await,
            Command::Maintenance { job, attempt } => self.on_maintenance(job, attempt).await,
            Command::Inspect { reply } => {
                let _ = reply.send(self.state.to_snapshot(self.clock.now()));
            }
        }
    }

    async fn on_toggle(&mut self, action_id: &str, participant: &str, reply: ReplySender) {
        let now = self.clock.now();
        let outcome = self.apply_toggle(action_id, participant, now);

        let (unit, toggle, actions) = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                let _ = reply.send(e.into());
                return;
            }
        };

        let text = match toggle {
            Toggle::Joined { .. } => format!("You joined {} {}.", unit.group.title(), unit.slot.label()),
            Toggle::Left { .. } => format!("You left {} {}.", unit.group.title(), unit.slot.label()),
        };
        let _ = reply.send(Reply::ephemeral(text));

        self.execute(unit, actions).await;
        self.schedule_render(unit.group);
        self.persist_logged().await;
    }

    fn apply_toggle(
        &mut self,
        action_id: &str,
        participant: &str,
        now: DateTime<Utc>,
    ) -> RosterResult<(UnitKey, Toggle, Vec<NotifyAction>)> {
        let action: ToggleAction = action_id.parse()?;
        let unit = action.unit;
        let toggle = self.state.rosters.toggle(unit, participant)?;
        debug!("{} toggled {}: {:?}", participant, unit, toggle);

        let actions = match self.capacity(unit) {
            Some(capacity) => self
                .state
                .notifications
                .on_size_change(unit, toggle.size(), capacity, now),
            None => Vec::new(),
        };

        Ok((unit, toggle, actions))
    }

    async fn on_add_absence(&mut self, participant: &str, start: NaiveDate, end: NaiveDate, reply: ReplySender) {
        let now = self.clock.now();
        let today = local_date(now, self.config.timezone);

        if end < today {
            let _ = reply.send(RosterError::Validation(format!("{} is already in the past", end)).into());
            return;
        }

        match self.state.absences.add(participant, start, end, now) {
            Ok(window) => {
                let text = if window.start_date == window.end_date {
                    format!("Marked you away on {}.", window.start_date)
                } else {
                    format!(
                        "Marked you away from {} to {}.",
                        window.start_date, window.end_date
                    )
                };
                let _ = reply.send(Reply::ephemeral(text));
            }
            Err(e) => {
                let _ = reply.send(e.into());
                return;
            }
        }

        self.schedule_all_renders();
        self.persist_logged().await;
    }

    async fn on_clear_group(&mut self, group: GroupKind, reply: ReplySender) {
        let cleared = self.state.rosters.clear_group(group);
        let keys: Vec<UnitKey> = self.state.rosters.group(group).keys().collect();
        let disarms: Vec<(UnitKey, Vec<NotifyAction>)> = keys
            .into_iter()
            .map(|unit| (unit, self.state.notifications.reset(unit)))
            .collect();

        let _ = reply.send(Reply::public(format!(
            "Cleared the {} roster ({} units had sign-ups).",
            group,
            cleared.len()
        )));

        for (unit, actions) in disarms {
            self.execute(unit, actions).await;
        }
        self.schedule_render(group);
        self.persist_logged().await;
    }

    async fn on_configure(&mut self, group: GroupKind, schedule: GroupSchedule, reply: ReplySender) {
        let before: Vec<UnitKey> = self.state.rosters.group(group).keys().collect();

        if let Err(e) = self.state.rosters.reconfigure(group, schedule) {
            let _ = reply.send(e.into());
            return;
        }

        let after: HashSet<UnitKey> = self.state.rosters.group(group).keys().collect();
        let dropped: Vec<(UnitKey, Vec<NotifyAction>)> = before
            .into_iter()
            .filter(|unit| !after.contains(unit))
            .map(|unit| (unit, self.state.notifications.reset(unit)))
            .collect();

        let sessions = self
            .state
            .rosters
            .group(group)
            .schedule
            .sessions
            .iter()
            .map(|s| s.label())
            .collect::<Vec<_>>()
            .join(", ");
        let _ = reply.send(Reply::public(format!(
            "{} schedule updated: {}.",
            group.title(),
            sessions
        )));

        for (unit, actions) in dropped {
            self.execute(unit, actions).await;
        }
        self.refresh(group).await;
        self.persist_logged().await;
    }

    async fn on_debounce_elapsed(&mut self, unit: UnitKey, kind: NotificationKind, token: TimerToken) {
        self.debounce_timers.remove(&token);

        let Some(capacity) = self.capacity(unit) else {
            return;
        };
        let size = self.state.rosters.members(unit).len();
        let now = self.clock.now();

        if let Some(kind) = self
            .state
            .notifications
            .on_timer_elapsed(unit, kind, token, size, capacity, now)
        {
            self.dispatch(unit, kind).await;
        }
    }

    async fn on_expire_board(&mut self, channel_id: &str, group: GroupKind) {
        self.expiry_timers.remove(&(channel_id.to_string(), group));

        let now = self.clock.now();
        let Some(binding) = self.state.bindings.get(channel_id, group).cloned() else {
            return;
        };
        if !binding.is_expired(now) {
            // Re-posted since the timer was armed.
            self.arm_expiry(&binding);
            return;
        }

        BoardReconciler::new(self.platform.as_ref(), self.config.timezone)
            .retire(&mut self.state, &binding)
            .await;
        info!("Scrim board {} in {} expired", binding.message_id, channel_id);
        self.persist_logged().await;
    }

    async fn on_maintenance(&mut self, job: MaintenanceJob, attempt: u8) {
        info!("Running {} (attempt {})", job, attempt + 1);

        let Err(e) = self.run_job(job).await else {
            return;
        };

        if maintenance::should_retry(attempt) {
            warn!(
                "{} failed, retrying in {}s: {}",
                job,
                self.config.retry_delay.as_secs(),
                e
            );
            self.send_later(
                self.config.retry_delay,
                Command::Maintenance {
                    job,
                    attempt: attempt + 1,
                },
            );
        } else {
            error!("{} failed again, waiting for the next scheduled run: {}", job, e);
        }
    }

    /// Runs one maintenance job to completion.
    pub async fn run_job(&mut self, job: MaintenanceJob) -> RosterResult<()> {
        let now = self.clock.now();
        let today = local_date(now, self.config.timezone);

        match job {
            MaintenanceJob::DailyRollover => self.rollover(today).await,
            MaintenanceJob::Backup => {
                let snapshot = self.state.to_snapshot(now);
                self.snapshots
                    .save_backup(&snapshot, today, self.config.backup_keep)
                    .await?;
                Ok(())
            }
            MaintenanceJob::Reminders => {
                self.send_reminders(today).await;
                Ok(())
            }
            MaintenanceJob::WeeklySweep => self.weekly_sweep(now).await,
            MaintenanceJob::Reconcile => {
                let report = BoardReconciler::new(self.platform.as_ref(), self.config.timezone)
                    .reconcile_all(&mut self.state, now)
                    .await;
                for binding in &report.posted {
                    self.arm_expiry(binding);
                }
                if !report.posted.is_empty() {
                    self.persist().await?;
                }
                if report.failed > 0 {
                    return Err(RosterError::ReconcileFailed(format!(
                        "{} of {} boards failed",
                        report.failed, report.checked
                    )));
                }
                Ok(())
            }
        }
    }

    async fn rollover(&mut self, today: NaiveDate) -> RosterResult<()> {
        let ended = (today - Duration::days(1)).weekday();
        let mut reset = Vec::new();

        for group in GroupKind::ALL {
            let roster_group = self.state.rosters.group(group);
            let units: Vec<UnitKey> = roster_group
                .keys()
                .filter(|unit| match unit.slot {
                    UnitSlot::Day(day) => day == ended,
                    UnitSlot::Game(_) => roster_group.schedule.sessions.iter().any(|s| s.day == ended),
                })
                .collect();

            for unit in units {
                self.state.rosters.clear_unit(unit)?;
                reset.push((unit, self.state.notifications.reset(unit)));
            }
        }

        let pruned = self.state.absences.prune_before(today);
        info!(
            "Rolled over to {}: cleared {} units, pruned {} absences",
            today,
            reset.len(),
            pruned
        );

        for (unit, actions) in reset {
            self.execute(unit, actions).await;
        }
        for group in GroupKind::ALL {
            self.refresh(group).await;
        }
        self.persist().await
    }

    async fn send_reminders(&mut self, today: NaiveDate) {
        let now = self.clock.now();
        let weekday = today.weekday();
        let mut due = Vec::new();

        for group in self.state.rosters.groups() {
            for unit in group.keys() {
                let is_today = group
                    .schedule
                    .session_for(unit.slot)
                    .is_some_and(|s| s.day == weekday);
                if is_today && self.state.rosters.unit(unit).is_some_and(|u| u.capacity.is_some()) {
                    due.push(unit);
                }
            }
        }

        for unit in due {
            if !self.state.notifications.take_reminder(unit, today) {
                continue;
            }
            let recipients = self.state.recipients(unit, now, self.config.timezone);
            let session = self.state.rosters.group(unit.group).schedule.session_for(unit.slot).copied();
            let text = dispatch::reminder_text(unit, session.as_ref());
            dispatch::send_batch(self.platform.as_ref(), &recipients, &text).await;
        }
    }

    async fn weekly_sweep(&mut self, now: DateTime<Utc>) -> RosterResult<()> {
        let Some(guild_id) = self.config.guild_id.clone() else {
            debug!("No guild configured, skipping weekly sweep");
            return Ok(());
        };

        let members = self
            .platform
            .guild_members(&guild_id)
            .await
            .map_err(|e| RosterError::DeliveryFailed {
                recipient: format!("guild {}", guild_id),
                reason: e.to_string(),
            })?;

        let targets: Vec<String> = members
            .into_iter()
            .filter(|m| !self.state.rosters.is_signed_up(GroupKind::Ranked, m))
            .filter(|m| !self.state.opt_outs.contains(m))
            .filter(|m| !self.state.absences.is_absent_today(m, now, self.config.timezone))
            .collect();

        info!("Weekly sweep reaching {} members", targets.len());
        dispatch::send_batch(self.platform.as_ref(), &targets, &dispatch::sweep_text()).await;
        Ok(())
    }

    async fn post_board(&mut self, group: GroupKind, channel_id: &str) -> RosterResult<BoardOutcome> {
        let now = self.clock.now();
        let outcome = BoardReconciler::new(self.platform.as_ref(), self.config.timezone)
            .ensure_board(&mut self.state, group, channel_id, now)
            .await?;

        if let BoardOutcome::Posted(binding) = &outcome {
            self.arm_expiry(binding);
            self.persist_logged().await;
        }
        Ok(outcome)
    }

    async fn refresh(&mut self, group: GroupKind) {
        let now = self.clock.now();
        let report = BoardReconciler::new(self.platform.as_ref(), self.config.timezone)
            .refresh_group(&mut self.state, group, now)
            .await;

        for binding in &report.posted {
            self.arm_expiry(binding);
        }
        if !report.posted.is_empty() {
            self.persist_logged().await;
        }
    }

    async fn execute(&mut self, unit: UnitKey, actions: Vec<NotifyAction>) {
        for action in actions {
            match action {
                NotifyAction::Dispatch(kind) => {
                    self.dispatch(unit, kind).await;
                }
                NotifyAction::Arm { kind, token, delay } => {
                    let handle = self.send_later(
                        delay.to_std().unwrap_or_default(),
                        Command::DebounceElapsed { unit, kind, token },
                    );
                    self.debounce_timers.insert(token, handle);
                }
                NotifyAction::Disarm { token, .. } => {
                    if let Some(handle) = self.debounce_timers.remove(&token) {
                        handle.abort();
                    }
                }
            }
        }
    }

    async fn dispatch(&mut self, unit: UnitKey, kind: NotificationKind) -> DeliveryReport {
        let now = self.clock.now();
        let recipients = self.state.recipients(unit, now, self.config.timezone);
        let session = self.state.rosters.group(unit.group).schedule.session_for(unit.slot).copied();
        let text = dispatch::notification_text(kind, unit, session.as_ref());

        info!("Sending {} notification for {} to {} members", kind, unit, recipients.len());
        dispatch::send_batch(self.platform.as_ref(), &recipients, &text).await
    }

    /// Coalesces board refreshes per group; the render reads state when it runs.
    fn schedule_render(&mut self, group: GroupKind) {
        if self.state.bindings.for_group(group).is_empty() || !self.pending_renders.insert(group) {
            return;
        }
        self.send_later(self.config.board_edit_delay, Command::RefreshBoards { group });
    }

    fn schedule_all_renders(&mut self) {
        for group in GroupKind::ALL {
            self.schedule_render(group);
        }
    }

    fn arm_expiry(&mut self, binding: &BoardBinding) {
        let Some(expires_at) = binding.expires_at else {
            return;
        };
        let delay = (expires_at - self.clock.now()).to_std().unwrap_or_default();
        let handle = self.send_later(
            delay,
            Command::ExpireBoard {
                channel_id: binding.channel_id.clone(),
                group: binding.group,
            },
        );
        if let Some(previous) = self
            .expiry_timers
            .insert((binding.channel_id.clone(), binding.group), handle)
        {
            previous.abort();
        }
    }

    fn send_later(&self, delay: StdDuration, command: Command) -> JoinHandle<()> {
        let mailbox = self.mailbox.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = mailbox.send(command).await;
        })
    }

    fn capacity(&self, unit: UnitKey) -> Option<usize> {
        self.state.rosters.unit(unit).and_then(|u| u.capacity)
    }

    async fn persist(&self) -> RosterResult<()> {
        self.snapshots
            .save(&self.state.to_snapshot(self.clock.now()))
            .await
    }

    async fn persist_logged(&self) {
        if let Err(e) = self.persist().await {
            error!("Failed to save snapshot: {}", e);
        }
    }
}

/// Builds the engine, restores state and starts both the actor and its schedules.
pub async fn start_engine(
    config: EngineConfig,
    platform: Arc<dyn ChatPlatform>,
    clock: Arc<dyn Clock>,
) -> EngineHandle {
    let (mut engine, handle) = Engine::new(config.clone(), platform, clock.clone());
    engine.startup().await;

    maintenance::spawn_schedules(&config, engine.mailbox(), clock);
    tokio::spawn(engine.run());

    handle
}
