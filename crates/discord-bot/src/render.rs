//! Turns a [`BoardView`] into an embed and a row of toggle buttons.

use serenity::builder::{CreateComponents, CreateEmbed};
use serenity::model::application::component::ButtonStyle;
use serenity::utils::Color;

use rostersync_core::board::{BoardView, UnitView};
use rostersync_core::models::roster::GroupKind;

/// Discord allows at most five buttons per row.
const BUTTONS_PER_ROW: usize = 5;

pub fn group_color(group: GroupKind) -> Color {
    match group {
        GroupKind::Ranked => Color::GOLD,
        GroupKind::Practice => Color::DARK_GREEN,
        GroupKind::Scrim => Color::BLUE,
    }
}

/// Field name and value for one unit.
pub fn unit_field(unit: &UnitView) -> (String, String) {
    let name = format!("{} ({})", unit.label, unit.counter());

    let mut lines = Vec::new();
    if let Some(session) = &unit.session {
        lines.push(format!("*{}*", session));
    }
    if unit.members.is_empty() {
        lines.push("nobody yet".to_string());
    }
    for member in &unit.members {
        if member.absent {
            lines.push(format!("<@{}> (away)", member.participant_id));
        } else {
            lines.push(format!("<@{}>", member.participant_id));
        }
    }

    (name, lines.join("\n"))
}

/// Full units get a muted button; joining is still attempted and answered by the engine.
pub fn button_style(unit: &UnitView) -> ButtonStyle {
    match unit.capacity {
        Some(capacity) if unit.members.len() >= capacity => ButtonStyle::Secondary,
        _ => ButtonStyle::Primary,
    }
}

pub fn board_embed<'a>(embed: &'a mut CreateEmbed, board: &BoardView) -> &'a mut CreateEmbed {
    embed
        .title(&board.title)
        .description("Press a button to join or leave. Press it again to leave.")
        .color(group_color(board.group));

    for unit in &board.units {
        let (name, value) = unit_field(unit);
        embed.field(name, value, true);
    }

    embed.footer(|f| f.text(format!("Updated {}", board.rendered_on.format("%A %d %B"))))
}

pub fn board_buttons<'a>(components: &'a mut CreateComponents, board: &BoardView) -> &'a mut CreateComponents {
    for chunk in board.units.chunks(BUTTONS_PER_ROW) {
        components.create_action_row(|row| {
            for unit in chunk {
                row.create_button(|b| {
                    b.custom_id(unit.action.to_string())
                        .label(&unit.label)
                        .style(button_style(unit))
                });
            }
            row
        });
    }
    components
}
