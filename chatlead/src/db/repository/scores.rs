use chrono::Utc;
use libsql::{params, Connection};

use super::parse_timestamp;
use crate::error::Result;
use crate::models::{PipelineChange, PipelineState, ScoreEvent, ScoreOrigin};

pub struct ScoreEventRepository;

impl ScoreEventRepository {
    pub async fn create(conn: &Connection, event: &ScoreEvent) -> Result<i64> {
        conn.execute(
            r#"
            INSERT INTO score_events (chat_id, origin, reason, delta, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                event.chat_id,
                event.origin.to_string(),
                event.reason.clone(),
                event.delta,
                event.created_at.to_rfc3339(),
            ],
        )
        .await?;

        Ok(conn.last_insert_rowid())
    }

    pub async fn list_by_chat(conn: &Connection, chat_id: i64) -> Result<Vec<ScoreEvent>> {
        let mut rows = conn
            .query(
                r#"
                SELECT id, chat_id, origin, reason, delta, created_at
                FROM score_events
                WHERE chat_id = ?1
                ORDER BY id ASC
                "#,
                params![chat_id],
            )
            .await?;

        let mut events = Vec::new();
        while let Some(row) = rows.next().await? {
            events.push(ScoreEvent {
                id: row.get(0)?,
                chat_id: row.get(1)?,
                origin: row.get::<String>(2)?.parse().unwrap_or(ScoreOrigin::External),
                reason: row.get(3)?,
                delta: row.get(4)?,
                created_at: parse_timestamp(&row.get::<String>(5)?),
            });
        }
        Ok(events)
    }

    pub async fn sum_by_chat(conn: &Connection, chat_id: i64) -> Result<i64> {
        let total = conn
            .query(
                "SELECT COALESCE(SUM(delta), 0) FROM score_events WHERE chat_id = ?1",
                params![chat_id],
            )
            .await?
            .next()
            .await?
            .map(|row| row.get::<i64>(0))
            .transpose()?
            .unwrap_or(0);
        Ok(total)
    }
}

pub struct PipelineRepository;

impl PipelineRepository {
    pub async fn list_states(conn: &Connection) -> Result<Vec<PipelineState>> {
        let mut rows = conn
            .query(
                "SELECT id, name, score_min, score_max FROM pipeline_states ORDER BY score_min, id",
                (),
            )
            .await?;

        let mut states = Vec::new();
        while let Some(row) = rows.next().await? {
            states.push(PipelineState {
                id: row.get(0)?,
                name: row.get(1)?,
                score_min: row.get(2)?,
                score_max: row.get(3)?,
            });
        }
        Ok(states)
    }

    pub async fn create_state(
        conn: &Connection,
        name: &str,
        score_min: i64,
        score_max: i64,
    ) -> Result<i64> {
        conn.execute(
            "INSERT INTO pipeline_states (name, score_min, score_max) VALUES (?1, ?2, ?3)",
            params![name, score_min, score_max],
        )
        .await?;
        Ok(conn.last_insert_rowid())
    }

    pub async fn record_change(conn: &Connection, chat_id: i64, state_id: Option<i64>) -> Result<()> {
        conn.execute(
            "INSERT INTO pipeline_history (chat_id, state_id, changed_at) VALUES (?1, ?2, ?3)",
            params![chat_id, state_id, Utc::now().to_rfc3339()],
        )
        .await?;
        Ok(())
    }

    pub async fn list_history(conn: &Connection, chat_id: i64) -> Result<Vec<PipelineChange>> {
        let mut rows = conn
            .query(
                r#"
                SELECT id, chat_id, state_id, changed_at
                FROM pipeline_history
                WHERE chat_id = ?1
                ORDER BY id ASC
                "#,
                params![chat_id],
            )
            .await?;

        let mut history = Vec::new();
        while let Some(row) = rows.next().await? {
            history.push(PipelineChange {
                id: row.get(0)?,
                chat_id: row.get(1)?,
                state_id: row.get(2)?,
                changed_at: parse_timestamp(&row.get::<String>(3)?),
            });
        }
        Ok(history)
    }
}
