use crate::db::Store;
use crate::error::{ChatleadError, Result};
use crate::models::{Chat, ScoreAudit, ScoreDelta, ScoreEvent};
use crate::scoring::PipelineClassifier;

/// The single write path for chat scores.
///
/// Every change appends one event per delta, then stores the new total and
/// the bucket derived from it, so the event log always sums to the cached
/// score.
#[derive(Debug, Clone)]
pub struct ScoreService {
    classifier: PipelineClassifier,
}

impl ScoreService {
    pub fn new(classifier: PipelineClassifier) -> Self {
        Self { classifier }
    }

    /// Build from the pipeline states currently stored. Invalid ranges are
    /// rejected here rather than misclassifying later.
    pub async fn load<S: Store + ?Sized>(store: &S) -> Result<Self> {
        let states = store.list_pipeline_states().await?;
        Ok(Self::new(PipelineClassifier::new(states)?))
    }

    pub fn classifier(&self) -> &PipelineClassifier {
        &self.classifier
    }

    /// Apply `deltas` to `chat` in order and recompute its bucket. A bucket
    /// change is recorded in the pipeline history.
    pub async fn apply_score<S: Store + ?Sized>(
        &self,
        store: &S,
        chat: &mut Chat,
        deltas: &[ScoreDelta],
    ) -> Result<()> {
        let mut score = chat.score;
        for delta in deltas {
            score += delta.delta;
            store
                .create_score_event(&ScoreEvent::from_delta(chat.id, delta))
                .await?;
        }

        let state_id = self.classifier.classify(score);
        store.update_chat_score(chat.id, score, state_id).await?;
        if state_id != chat.pipeline_state_id {
            store.record_pipeline_change(chat.id, state_id).await?;
            tracing::info!(
                chat_id = chat.id,
                from = ?chat.pipeline_state_id,
                to = ?state_id,
                score,
                "Pipeline state changed"
            );
        }

        tracing::debug!(chat_id = chat.id, events = deltas.len(), score, "Applied score");
        chat.score = score;
        chat.pipeline_state_id = state_id;
        Ok(())
    }

    /// Record a manual or external adjustment for a stored chat.
    pub async fn adjust<S: Store + ?Sized>(
        &self,
        store: &S,
        chat_id: i64,
        delta: ScoreDelta,
    ) -> Result<Chat> {
        let mut chat = store
            .get_chat(chat_id)
            .await?
            .ok_or_else(|| ChatleadError::NotFound(format!("chat {chat_id}")))?;
        self.apply_score(store, &mut chat, std::slice::from_ref(&delta))
            .await?;
        Ok(chat)
    }

    /// Recompute the event sum and compare it with the cached score.
    pub async fn verify_log<S: Store + ?Sized>(store: &S, chat_id: i64) -> Result<ScoreAudit> {
        let chat = store
            .get_chat(chat_id)
            .await?
            .ok_or_else(|| ChatleadError::NotFound(format!("chat {chat_id}")))?;
        let event_sum = store.sum_score_events(chat_id).await?;
        let events = store.list_score_events(chat_id).await?;

        if event_sum != chat.score {
            tracing::warn!(chat_id, cached = chat.score, event_sum, "Score log out of sync");
        }

        Ok(ScoreAudit {
            chat_id,
            cached_score: chat.score,
            event_sum,
            consistent: event_sum == chat.score,
            pipeline_state_id: chat.pipeline_state_id,
            events,
        })
    }
}
