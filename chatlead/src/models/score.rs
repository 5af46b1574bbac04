use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ScoreOrigin;

/// A delta the scoring engine (or a person) wants applied to a chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreDelta {
    pub origin: ScoreOrigin,
    pub delta: i64,
    pub reason: String,
}

impl ScoreDelta {
    pub fn rule(delta: i64, reason: impl Into<String>) -> Self {
        Self {
            origin: ScoreOrigin::Rule,
            delta,
            reason: reason.into(),
        }
    }
}

/// Append-only audit row. The events of a chat always sum to its score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreEvent {
    pub id: i64,
    pub chat_id: i64,
    pub origin: ScoreOrigin,
    pub reason: String,
    pub delta: i64,
    pub created_at: DateTime<Utc>,
}

impl ScoreEvent {
    pub fn from_delta(chat_id: i64, delta: &ScoreDelta) -> Self {
        Self {
            id: 0,
            chat_id,
            origin: delta.origin,
            reason: delta.reason.clone(),
            delta: delta.delta,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PipelineState {
    pub id: i64,
    pub name: String,
    pub score_min: i64,
    pub score_max: i64,
}

impl PipelineState {
    pub fn contains(&self, score: i64) -> bool {
        self.score_min <= score && score <= self.score_max
    }
}

/// One bucket transition of a chat. `state_id` is `None` when the new score
/// falls outside every configured range.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineChange {
    pub id: i64,
    pub chat_id: i64,
    pub state_id: Option<i64>,
    pub changed_at: DateTime<Utc>,
}

/// Comparison of a chat's cached score with its event log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreAudit {
    pub chat_id: i64,
    pub cached_score: i64,
    pub event_sum: i64,
    pub consistent: bool,
    pub pipeline_state_id: Option<i64>,
    pub events: Vec<ScoreEvent>,
}
