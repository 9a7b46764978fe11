//! Direct-message texts and best-effort batch delivery.

use tracing::{debug, info, warn};

use rostersync_core::errors::RosterError;
use rostersync_core::models::roster::UnitKey;
use rostersync_core::models::schedule::SessionTime;
use rostersync_core::notify::NotificationKind;
use rostersync_core::platform::ChatPlatform;

/// Outcome of a batch send.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: Vec<String>,
}

fn unit_title(unit: UnitKey, session: Option<&SessionTime>) -> String {
    match session {
        Some(session) => format!("{} {} ({})", unit.group.title(), unit.slot.label(), session.label()),
        None => format!("{} {}", unit.group.title(), unit.slot.label()),
    }
}

pub fn notification_text(kind: NotificationKind, unit: UnitKey, session: Option<&SessionTime>) -> String {
    let title = unit_title(unit, session);
    match kind {
        NotificationKind::Found => format!(
            "Roster found! {} is full and will take place. See you there.",
            title
        ),
        NotificationKind::Cancel => format!(
            "Heads up: {} is no longer full and is off for now. It will be back on once the spot is filled.",
            title
        ),
    }
}

pub fn reminder_text(unit: UnitKey, session: Option<&SessionTime>) -> String {
    format!("Reminder: you are signed up for {} today.", unit_title(unit, session))
}

pub fn sweep_text() -> String {
    "You are not signed up for any ranked day this week. Use the ranked board to join, \
     or `/absent` if you are away."
        .to_string()
}

/// Sends `content` to every recipient. A failed delivery is logged and skipped;
/// it neither aborts the batch nor gets retried.
pub async fn send_batch(platform: &dyn ChatPlatform, recipients: &[String], content: &str) -> DeliveryReport {
    let mut report = DeliveryReport::default();

    for recipient in recipients {
        match platform.send_direct_message(recipient, content).await {
            Ok(()) => report.delivered += 1,
            Err(e) => {
                let failure = RosterError::DeliveryFailed {
                    recipient: recipient.clone(),
                    reason: e.to_string(),
                };
                warn!("{}", failure);
                report.failed.push(recipient.clone());
            }
        }
    }

    if report.failed.is_empty() {
        debug!("Delivered {} direct messages", report.delivered);
    } else {
        info!(
            "Delivered {} direct messages, {} failed",
            report.delivered,
            report.failed.len()
        );
    }

    report
}
