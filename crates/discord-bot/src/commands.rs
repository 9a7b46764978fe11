use serenity::builder::CreateApplicationCommands;

pub mod roster;

pub use roster::{RosterCommand, parse_command};

/// Register every slash command the bot answers.
pub fn register_commands(commands: &mut CreateApplicationCommands) -> &mut CreateApplicationCommands {
    for build in [
        roster::board_command,
        roster::absent_command,
        roster::present_command,
        roster::notifications_command,
        roster::clear_command,
        roster::schedule_command,
    ] {
        commands.create_application_command(|command| {
            *command = build();
            command
        });
    }

    commands
}
