use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{is_real_phone, UNKNOWN_PHONE};

/// One conversation thread per team and counterparty.
///
/// `score` is a cache of the sum of the chat's score events and
/// `pipeline_state_id` is derived from it; both change only through
/// `ScoreService::apply_score`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chat {
    pub id: i64,
    pub team_id: i64,
    pub name: String,
    pub number: String,
    pub score: i64,
    pub pipeline_state_id: Option<i64>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Chat {
    pub fn new(team_id: i64, name: String, number: Option<String>) -> Self {
        Self {
            id: 0,
            team_id,
            name,
            number: number.unwrap_or_else(|| UNKNOWN_PHONE.to_string()),
            score: 0,
            pipeline_state_id: None,
            created_by: None,
            created_at: Utc::now(),
        }
    }

    pub fn has_placeholder_number(&self) -> bool {
        !is_real_phone(Some(&self.number))
    }
}
