use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::roster::GroupKind;

/// Association between a posted board message and the group it renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardBinding {
    pub group: GroupKind,
    pub channel_id: String,
    pub message_id: String,
    pub posted_at: DateTime<Utc>,
    /// Set for scrim boards only; the board is deleted once this instant passes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl BoardBinding {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}
