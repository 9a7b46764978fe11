//! # Engine Configuration Module
//!
//! Loads the engine settings from environment variables, falling back to defaults
//! for everything except malformed values.
//!
//! ## Environment Variables
//!
//! - `SNAPSHOT_PATH`: Location of the snapshot document (default: "data/rosters.json")
//! - `ROSTER_TIMEZONE`: IANA zone all calendar dates are read in (default: "Europe/Berlin")
//! - `LOG_LEVEL`: Logging level (default: "info")
//! - `BOARD_EDIT_DELAY_MS`: Delay before a board is re-rendered after a toggle (default: 1500)
//! - `MAINTENANCE_RETRY_DELAY_SECONDS`: Delay before a failed job's single retry (default: 300)
//! - `BACKUP_HOUR` / `BACKUP_KEEP`: Local hour of the daily backup and how many to keep (default: 4 / 14)
//! - `REMINDER_HOUR`: Local hour of the daily reminders (default: 12)
//! - `SWEEP_WEEKDAY` / `SWEEP_HOUR`: When the weekly sign-up sweep runs (default: "mon" / 18)
//! - `RECONCILE_INTERVAL_MINUTES`: Period of the board reconcile (default: 60)
//! - `GUILD_ID`: Guild whose members the weekly sweep reaches (optional, sweep disabled without it)

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::Weekday;
use chrono_tz::Tz;
use eyre::{Result, WrapErr, eyre};
use tracing::Level;

use rostersync_core::models::schedule::ScheduleConfigs;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub snapshot_path: PathBuf,

    /// Zone used for absence dates, rollover and expiry.
    pub timezone: Tz,

    pub log_level: Level,

    pub board_edit_delay: Duration,

    pub retry_delay: Duration,

    pub backup_hour: u32,
    pub backup_keep: usize,

    pub reminder_hour: u32,

    pub sweep_weekday: Weekday,
    pub sweep_hour: u32,

    pub reconcile_interval: Duration,

    pub guild_id: Option<String>,

    /// Schedules used when the snapshot has none (or an invalid one).
    pub schedules: ScheduleConfigs,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from("data/rosters.json"),
            timezone: chrono_tz::Europe::Berlin,
            log_level: Level::INFO,
            board_edit_delay: Duration::from_millis(1500),
            retry_delay: Duration::from_secs(300),
            backup_hour: 4,
            backup_keep: 14,
            reminder_hour: 12,
            sweep_weekday: Weekday::Mon,
            sweep_hour: 18,
            reconcile_interval: Duration::from_secs(60 * 60),
            guild_id: None,
            schedules: ScheduleConfigs::default(),
        }
    }
}

impl EngineConfig {
    /// Creates a new EngineConfig from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed, or an hour is out of range.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let snapshot_path = env::var("SNAPSHOT_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.snapshot_path);

        let timezone = match env::var("ROSTER_TIMEZONE") {
            Ok(name) => name
                .parse::<Tz>()
                .map_err(|e| eyre!("Invalid ROSTER_TIMEZONE value {}: {}", name, e))?,
            Err(_) => defaults.timezone,
        };

        let log_level = parse_log_level(&env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()));

        let board_edit_delay = Duration::from_millis(parse_var("BOARD_EDIT_DELAY_MS", 1500)?);
        let retry_delay = Duration::from_secs(parse_var("MAINTENANCE_RETRY_DELAY_SECONDS", 300)?);

        let backup_hour = parse_hour("BACKUP_HOUR", defaults.backup_hour)?;
        let backup_keep = parse_var("BACKUP_KEEP", defaults.backup_keep)?;
        let reminder_hour = parse_hour("REMINDER_HOUR", defaults.reminder_hour)?;

        let sweep_weekday = match env::var("SWEEP_WEEKDAY") {
            Ok(day) => day
                .parse::<Weekday>()
                .map_err(|_| eyre!("Invalid SWEEP_WEEKDAY value: {}", day))?,
            Err(_) => defaults.sweep_weekday,
        };
        let sweep_hour = parse_hour("SWEEP_HOUR", defaults.sweep_hour)?;

        let reconcile_minutes: u64 = parse_var("RECONCILE_INTERVAL_MINUTES", 60)?;
        if reconcile_minutes == 0 {
            return Err(eyre!("RECONCILE_INTERVAL_MINUTES must be at least 1"));
        }

        let guild_id = env::var("GUILD_ID").ok().filter(|id| !id.trim().is_empty());

        Ok(Self {
            snapshot_path,
            timezone,
            log_level,
            board_edit_delay,
            retry_delay,
            backup_hour,
            backup_keep,
            reminder_hour,
            sweep_weekday,
            sweep_hour,
            reconcile_interval: Duration::from_secs(reconcile_minutes * 60),
            guild_id,
            schedules: defaults.schedules,
        })
    }
}

pub fn parse_log_level(value: &str) -> Level {
    match value {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .wrap_err_with(|| format!("Invalid {} value", name)),
        Err(_) => Ok(default),
    }
}

fn parse_hour(name: &str, default: u32) -> Result<u32> {
    let hour = parse_var(name, default)?;
    if hour > 23 {
        return Err(eyre!("{} must be between 0 and 23, got {}", name, hour));
    }
    Ok(hour)
}
