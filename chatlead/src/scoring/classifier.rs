use crate::error::{ChatleadError, Result};
use crate::models::PipelineState;

/// Maps a score to the pipeline bucket whose inclusive range contains it.
#[derive(Debug, Clone, Default)]
pub struct PipelineClassifier {
    states: Vec<PipelineState>,
}

impl PipelineClassifier {
    /// Rejects inverted or overlapping ranges. Gaps are allowed and classify
    /// to no bucket.
    pub fn new(mut states: Vec<PipelineState>) -> Result<Self> {
        for state in &states {
            if state.score_min > state.score_max {
                return Err(ChatleadError::InputRejected(format!(
                    "pipeline state '{}' has min {} above max {}",
                    state.name, state.score_min, state.score_max
                )));
            }
        }

        states.sort_by_key(|s| (s.score_min, s.score_max));
        for pair in states.windows(2) {
            if pair[1].score_min <= pair[0].score_max {
                return Err(ChatleadError::InputRejected(format!(
                    "pipeline states '{}' [{}, {}] and '{}' [{}, {}] overlap",
                    pair[0].name,
                    pair[0].score_min,
                    pair[0].score_max,
                    pair[1].name,
                    pair[1].score_min,
                    pair[1].score_max
                )));
            }
        }

        Ok(Self { states })
    }

    pub fn states(&self) -> &[PipelineState] {
        &self.states
    }

    pub fn classify(&self, score: i64) -> Option<i64> {
        self.state_for(score).map(|s| s.id)
    }

    pub fn state_for(&self, score: i64) -> Option<&PipelineState> {
        self.states.iter().find(|s| s.contains(score))
    }
}
