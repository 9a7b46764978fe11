use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A participant's opt-out window; both ends are inclusive local calendar dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbsenceWindow {
    pub participant_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl AbsenceWindow {
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}
