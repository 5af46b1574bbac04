use libsql::{params, Connection};

use super::parse_timestamp;
use crate::error::Result;
use crate::models::Chat;
use crate::processing::{name_key, normalize_phone};

const CHAT_COLUMNS: &str =
    "id, team_id, name, number, score, pipeline_state_id, created_by, created_at";

pub struct ChatRepository;

impl ChatRepository {
    pub async fn create(conn: &Connection, chat: &Chat) -> Result<i64> {
        conn.execute(
            r#"
            INSERT INTO chats (
                team_id, name, name_key, number, number_digits, score,
                pipeline_state_id, created_by, created_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9
            )
            "#,
            params![
                chat.team_id,
                chat.name.clone(),
                name_key(&chat.name),
                chat.number.clone(),
                normalize_phone(&chat.number, false),
                chat.score,
                chat.pipeline_state_id,
                chat.created_by,
                chat.created_at.to_rfc3339(),
            ],
        )
        .await?;

        Ok(conn.last_insert_rowid())
    }

    pub async fn get_by_id(conn: &Connection, id: i64) -> Result<Option<Chat>> {
        let sql = format!("SELECT {CHAT_COLUMNS} FROM chats WHERE id = ?1");
        let mut rows = conn.query(&sql, params![id]).await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_chat(&row)?))
        } else {
            Ok(None)
        }
    }

    /// Candidates for a phone comparison: stored numbers that end with
    /// `digits_suffix`, or that are themselves a suffix of it.
    pub async fn find_by_number_suffix(
        conn: &Connection,
        team_id: i64,
        digits_suffix: &str,
    ) -> Result<Vec<Chat>> {
        let digits = normalize_phone(digits_suffix, false);
        if digits.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            r#"
            SELECT {CHAT_COLUMNS} FROM chats
            WHERE team_id = ?1
              AND number_digits != ''
              AND (number_digits LIKE '%' || ?2 OR ?2 LIKE '%' || number_digits)
            ORDER BY id
            "#
        );
        let mut rows = conn.query(&sql, params![team_id, digits]).await?;

        let mut chats = Vec::new();
        while let Some(row) = rows.next().await? {
            chats.push(Self::row_to_chat(&row)?);
        }
        Ok(chats)
    }

    pub async fn find_by_name(conn: &Connection, team_id: i64, name: &str) -> Result<Vec<Chat>> {
        let key = name_key(name);
        if key.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {CHAT_COLUMNS} FROM chats WHERE team_id = ?1 AND name_key = ?2 ORDER BY id"
        );
        let mut rows = conn.query(&sql, params![team_id, key]).await?;

        let mut chats = Vec::new();
        while let Some(row) = rows.next().await? {
            chats.push(Self::row_to_chat(&row)?);
        }
        Ok(chats)
    }

    pub async fn update_identity(conn: &Connection, id: i64, name: &str, number: &str) -> Result<()> {
        conn.execute(
            r#"
            UPDATE chats SET
                name = ?2,
                name_key = ?3,
                number = ?4,
                number_digits = ?5
            WHERE id = ?1
            "#,
            params![id, name, name_key(name), number, normalize_phone(number, false)],
        )
        .await?;
        Ok(())
    }

    pub async fn update_score(
        conn: &Connection,
        id: i64,
        score: i64,
        pipeline_state_id: Option<i64>,
    ) -> Result<()> {
        conn.execute(
            "UPDATE chats SET score = ?2, pipeline_state_id = ?3 WHERE id = ?1",
            params![id, score, pipeline_state_id],
        )
        .await?;
        Ok(())
    }

    fn row_to_chat(row: &libsql::Row) -> Result<Chat> {
        Ok(Chat {
            id: row.get(0)?,
            team_id: row.get(1)?,
            name: row.get(2)?,
            number: row.get(3)?,
            score: row.get(4)?,
            pipeline_state_id: row.get(5)?,
            created_by: row.get(6)?,
            created_at: parse_timestamp(&row.get::<String>(7)?),
        })
    }
}
