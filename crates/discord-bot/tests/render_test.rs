use chrono::Weekday;
use pretty_assertions::assert_eq;
use serenity::model::application::component::ButtonStyle;

use rostersync_core::board::{MemberView, ToggleAction, UnitView};
use rostersync_core::models::roster::{GroupKind, UnitKey};
use rostersync_discord_bot::render::{button_style, unit_field};

fn ranked_friday(members: &[(&str, bool)]) -> UnitView {
    UnitView {
        action: ToggleAction::new(UnitKey::day(GroupKind::Ranked, Weekday::Fri)),
        label: "Friday".to_string(),
        session: Some("Friday 20:00".to_string()),
        members: members
            .iter()
            .map(|(id, absent)| MemberView {
                participant_id: id.to_string(),
                absent: *absent,
            })
            .collect(),
        capacity: Some(5),
    }
}

#[test]
fn test_empty_unit_field() {
    let (name, value) = unit_field(&ranked_friday(&[]));
    assert_eq!(name, "Friday (0/5)");
    assert_eq!(value, "*Friday 20:00*\nnobody yet");
}

#[test]
fn test_absent_members_are_marked() {
    let (name, value) = unit_field(&ranked_friday(&[("1", false), ("2", true)]));
    assert_eq!(name, "Friday (2/5)");
    assert_eq!(value, "*Friday 20:00*\n<@1>\n<@2> (away)");
}

#[test]
fn test_full_unit_button_is_muted() {
    let full = ranked_friday(&[("1", false), ("2", false), ("3", false), ("4", false), ("5", false)]);
    assert!(matches!(button_style(&full), ButtonStyle::Secondary));
    assert!(matches!(button_style(&ranked_friday(&[("1", false)])), ButtonStyle::Primary));
}

#[test]
fn test_button_id_round_trips_to_unit() {
    let unit = ranked_friday(&[]);
    let parsed: ToggleAction = unit.action.to_string().parse().unwrap();
    assert_eq!(parsed, unit.action);
}
