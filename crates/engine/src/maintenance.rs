//! Recurring jobs and when they run.
//!
//! Each job has a [`Cadence`]; a small task per job sleeps until [`next_run`] and then
//! posts a [`Command::Maintenance`] into the engine mailbox. The jobs themselves run
//! inside the engine (see `Engine::run_job`). A failed job is retried exactly once
//! after the configured delay.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use rostersync_core::clock::{Clock, local_date, local_instant, next_weekday_on_or_after};

use crate::config::EngineConfig;
use crate::runtime::Command;

/// Attempts after the first one.
pub const MAX_RETRIES: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaintenanceJob {
    /// Clears the units of the day that just ended and prunes old absences.
    DailyRollover,
    Backup,
    Reminders,
    WeeklySweep,
    Reconcile,
}

impl MaintenanceJob {
    pub const ALL: [MaintenanceJob; 5] = [
        MaintenanceJob::DailyRollover,
        MaintenanceJob::Backup,
        MaintenanceJob::Reminders,
        MaintenanceJob::WeeklySweep,
        MaintenanceJob::Reconcile,
    ];

    pub fn cadence(&self, config: &EngineConfig) -> Cadence {
        match self {
            MaintenanceJob::DailyRollover => Cadence::Daily { hour: 0 },
            MaintenanceJob::Backup => Cadence::Daily {
                hour: config.backup_hour,
            },
            MaintenanceJob::Reminders => Cadence::Daily {
                hour: config.reminder_hour,
            },
            MaintenanceJob::WeeklySweep => Cadence::Weekly {
                day: config.sweep_weekday,
                hour: config.sweep_hour,
            },
            MaintenanceJob::Reconcile => Cadence::Every(
                Duration::from_std(config.reconcile_interval).unwrap_or_else(|_| Duration::hours(1)),
            ),
        }
    }
}

impl fmt::Display for MaintenanceJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MaintenanceJob::DailyRollover => "daily rollover",
            MaintenanceJob::Backup => "backup",
            MaintenanceJob::Reminders => "reminders",
            MaintenanceJob::WeeklySweep => "weekly sweep",
            MaintenanceJob::Reconcile => "board reconcile",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// Every day at the start of `hour`, local time.
    Daily { hour: u32 },
    /// Once a week on `day` at the start of `hour`, local time.
    Weekly { day: Weekday, hour: u32 },
    Every(Duration),
}

/// The next instant strictly after `now` at which a job with `cadence` is due.
pub fn next_run(cadence: Cadence, now: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    let today = local_date(now, tz);
    match cadence {
        Cadence::Daily { hour } => {
            let at = hour_of_day(hour);
            let candidate = local_instant(today, at, tz);
            if candidate > now {
                candidate
            } else {
                local_instant(today + Duration::days(1), at, tz)
            }
        }
        Cadence::Weekly { day, hour } => {
            let at = hour_of_day(hour);
            let date = next_weekday_on_or_after(today, day);
            let candidate = local_instant(date, at, tz);
            if candidate > now {
                candidate
            } else {
                local_instant(date + Duration::days(7), at, tz)
            }
        }
        Cadence::Every(period) => now + period,
    }
}

/// Whether a job that failed on `attempt` gets another try.
pub fn should_retry(attempt: u8) -> bool {
    attempt < MAX_RETRIES
}

fn hour_of_day(hour: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour.min(23), 0, 0).unwrap_or(NaiveTime::MIN)
}

/// Spawns one scheduling task per job. Tasks stop once the engine is gone.
pub fn spawn_schedules(
    config: &EngineConfig,
    mailbox: mpsc::Sender<Command>,
    clock: Arc<dyn Clock>,
) -> Vec<JoinHandle<()>> {
    MaintenanceJob::ALL
        .into_iter()
        .map(|job| {
            let cadence = job.cadence(config);
            let timezone = config.timezone;
            let mailbox = mailbox.clone();
            let clock = clock.clone();

            tokio::spawn(async move {
                let mut last_due: Option<DateTime<Utc>> = None;
                loop {
                    let now = clock.now();
                    // The wall clock may trail the timer slightly; never schedule the same slot twice.
                    let from = last_due.map_or(now, |last| last.max(now));
                    let due = next_run(cadence, from, timezone);
                    last_due = Some(due);
                    debug!("Next {} at {}", job, due);
                    tokio::time::sleep((due - now).to_std().unwrap_or_default()).await;

                    if mailbox
                        .send(Command::Maintenance { job, attempt: 0 })
                        .await
                        .is_err()
                    {
                        info!("Engine stopped, ending {} schedule", job);
                        break;
                    }
                }
            })
        })
        .collect()
}
