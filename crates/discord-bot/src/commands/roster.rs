use std::collections::HashMap;

use chrono::{NaiveDate, NaiveTime, Weekday};
use serde_json::Value;
use serenity::builder::{CreateApplicationCommand, CreateApplicationCommandOption};
use serenity::model::application::command::CommandOptionType;
use serenity::model::Permissions;

use rostersync_core::errors::{RosterError, RosterResult};
use rostersync_core::models::roster::GroupKind;
use rostersync_core::models::schedule::{GroupSchedule, MAX_SCRIM_GAMES, SessionTime};

/// A slash command with its options parsed into domain values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterCommand {
    Board { group: GroupKind },
    Absent { start: NaiveDate, end: NaiveDate },
    Present,
    Notifications { enabled: bool },
    ClearRoster { group: GroupKind },
    Schedule { group: GroupKind, schedule: GroupSchedule },
}

fn add_group_choices(option: &mut CreateApplicationCommandOption) -> &mut CreateApplicationCommandOption {
    for group in GroupKind::ALL {
        option.add_string_choice(group.title(), group.as_str());
    }
    option
}

pub fn board_command() -> CreateApplicationCommand {
    let mut command = CreateApplicationCommand::default();
    command
        .name("board")
        .description("Post a sign-up board in this channel")
        .dm_permission(false)
        .default_member_permissions(Permissions::MANAGE_GUILD)
        .create_option(|option| {
            add_group_choices(
                option
                    .name("group")
                    .description("Which roster the board is for")
                    .kind(CommandOptionType::String)
                    .required(true),
            )
        });
    command
}

pub fn absent_command() -> CreateApplicationCommand {
    let mut command = CreateApplicationCommand::default();
    command
        .name("absent")
        .description("Tell the team you are away")
        .dm_permission(false)
        .create_option(|option| {
            option
                .name("from")
                .description("First day away (YYYY-MM-DD)")
                .kind(CommandOptionType::String)
                .required(true)
        })
        .create_option(|option| {
            option
                .name("until")
                .description("Last day away (YYYY-MM-DD), defaults to the first day")
                .kind(CommandOptionType::String)
                .required(false)
        });
    command
}

pub fn present_command() -> CreateApplicationCommand {
    let mut command = CreateApplicationCommand::default();
    command
        .name("present")
        .description("Remove all your registered absences")
        .dm_permission(false);
    command
}

pub fn notifications_command() -> CreateApplicationCommand {
    let mut command = CreateApplicationCommand::default();
    command
        .name("notifications")
        .description("Turn roster direct messages on or off")
        .dm_permission(false)
        .create_option(|option| {
            option
                .name("enabled")
                .description("Whether you want to receive direct messages")
                .kind(CommandOptionType::Boolean)
                .required(true)
        });
    command
}

pub fn clear_command() -> CreateApplicationCommand {
    let mut command = CreateApplicationCommand::default();
    command
        .name("roster-clear")
        .description("Empty every unit of a roster")
        .dm_permission(false)
        .default_member_permissions(Permissions::MANAGE_GUILD)
        .create_option(|option| {
            add_group_choices(
                option
                    .name("group")
                    .description("Which roster to clear")
                    .kind(CommandOptionType::String)
                    .required(true),
            )
        });
    command
}

pub fn schedule_command() -> CreateApplicationCommand {
    let mut command = CreateApplicationCommand::default();
    command
        .name("schedule")
        .description("Change the session days of a roster")
        .dm_permission(false)
        .default_member_permissions(Permissions::MANAGE_GUILD)
        .create_option(|option| {
            add_group_choices(
                option
                    .name("group")
                    .description("Which roster to change")
                    .kind(CommandOptionType::String)
                    .required(true),
            )
        })
        .create_option(|option| {
            option
                .name("days")
                .description("Comma separated days, e.g. fri,sat,sun")
                .kind(CommandOptionType::String)
                .required(true)
        })
        .create_option(|option| {
            option
                .name("time")
                .description("Start time in HH:MM")
                .kind(CommandOptionType::String)
                .required(true)
        })
        .create_option(|option| {
            option
                .name("games")
                .description("Number of scrim games")
                .kind(CommandOptionType::Integer)
                .min_int_value(1u8)
                .max_int_value(MAX_SCRIM_GAMES)
                .required(false)
        });
    command
}

fn get_str<'a>(options: &'a HashMap<String, Value>, name: &str) -> Option<&'a str> {
    options.get(name).and_then(|v| v.as_str())
}

fn require_str<'a>(options: &'a HashMap<String, Value>, name: &str) -> RosterResult<&'a str> {
    get_str(options, name).ok_or_else(|| RosterError::Validation(format!("Missing option '{}'", name)))
}

pub fn parse_date(raw: &str) -> RosterResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| RosterError::Validation(format!("'{}' is not a date, use YYYY-MM-DD", raw)))
}

/// Builds a schedule from the raw `days`, `time` and `games` options.
pub fn parse_schedule(days: &str, time: &str, games: Option<u8>) -> RosterResult<GroupSchedule> {
    let time = NaiveTime::parse_from_str(time.trim(), "%H:%M")
        .map_err(|_| RosterError::Validation(format!("'{}' is not a time, use HH:MM", time)))?;

    let sessions = days
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(|d| {
            d.parse::<Weekday>()
                .map(|day| SessionTime { day, time })
                .map_err(|_| RosterError::Validation(format!("'{}' is not a day of the week", d)))
        })
        .collect::<RosterResult<Vec<_>>>()?;

    Ok(GroupSchedule { sessions, games })
}

pub fn parse_command(name: &str, options: &HashMap<String, Value>) -> RosterResult<RosterCommand> {
    match name {
        "board" => Ok(RosterCommand::Board {
            group: require_str(options, "group")?.parse()?,
        }),
        "absent" => {
            let start = parse_date(require_str(options, "from")?)?;
            let end = match get_str(options, "until") {
                Some(raw) => parse_date(raw)?,
                None => start,
            };
            Ok(RosterCommand::Absent { start, end })
        }
        "present" => Ok(RosterCommand::Present),
        "notifications" => {
            let enabled = options
                .get("enabled")
                .and_then(|v| v.as_bool())
                .ok_or_else(|| RosterError::Validation("Missing option 'enabled'".to_string()))?;
            Ok(RosterCommand::Notifications { enabled })
        }
        "roster-clear" => Ok(RosterCommand::ClearRoster {
            group: require_str(options, "group")?.parse()?,
        }),
        "schedule" => {
            let group: GroupKind = require_str(options, "group")?.parse()?;
            let games = match options.get("games").and_then(|v| v.as_i64()) {
                Some(n) => Some(u8::try_from(n).map_err(|_| {
                    RosterError::Validation(format!("{} is not a valid number of games", n))
                })?),
                None => None,
            };
            let schedule = parse_schedule(require_str(options, "days")?, require_str(options, "time")?, games)?;
            Ok(RosterCommand::Schedule { group, schedule })
        }
        other => Err(RosterError::Validation(format!("Unknown command '{}'", other))),
    }
}
