use libsql::{params, Connection};

use super::parse_timestamp;
use crate::error::Result;
use crate::models::{Attachment, MediaKind, Message, MessageKind};

pub struct MessageRepository;

impl MessageRepository {
    pub async fn create(conn: &Connection, message: &Message) -> Result<i64> {
        conn.execute(
            r#"
            INSERT INTO messages (
                chat_id, contact_id, kind, text, author_raw, from_me, created_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7
            )
            "#,
            params![
                message.chat_id,
                message.contact_id,
                message.kind.to_string(),
                message.text.clone(),
                message.author_raw.clone(),
                i64::from(message.from_me),
                message.created_at.to_rfc3339(),
            ],
        )
        .await?;

        Ok(conn.last_insert_rowid())
    }

    pub async fn list_by_chat(conn: &Connection, chat_id: i64) -> Result<Vec<Message>> {
        let mut rows = conn
            .query(
                r#"
                SELECT id, chat_id, contact_id, kind, text, author_raw, from_me, created_at
                FROM messages
                WHERE chat_id = ?1
                ORDER BY id ASC
                "#,
                params![chat_id],
            )
            .await?;

        let mut messages = Vec::new();
        while let Some(row) = rows.next().await? {
            messages.push(Message {
                id: row.get(0)?,
                chat_id: row.get(1)?,
                contact_id: row.get(2)?,
                kind: row.get::<String>(3)?.parse().unwrap_or(MessageKind::Text),
                text: row.get(4)?,
                author_raw: row.get(5)?,
                from_me: row.get::<i64>(6)? != 0,
                created_at: parse_timestamp(&row.get::<String>(7)?),
            });
        }
        Ok(messages)
    }
}

pub struct AttachmentRepository;

impl AttachmentRepository {
    pub async fn create(conn: &Connection, attachment: &Attachment) -> Result<i64> {
        conn.execute(
            r#"
            INSERT INTO attachments (
                message_id, kind, filename, path, mime_type, size
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6
            )
            "#,
            params![
                attachment.message_id,
                attachment.kind.to_string(),
                attachment.filename.clone(),
                attachment.path.clone(),
                attachment.mime_type.clone(),
                attachment.size,
            ],
        )
        .await?;

        Ok(conn.last_insert_rowid())
    }

    pub async fn list_by_chat(conn: &Connection, chat_id: i64) -> Result<Vec<Attachment>> {
        let mut rows = conn
            .query(
                r#"
                SELECT a.id, a.message_id, a.kind, a.filename, a.path, a.mime_type, a.size
                FROM attachments a
                JOIN messages m ON m.id = a.message_id
                WHERE m.chat_id = ?1
                ORDER BY a.id ASC
                "#,
                params![chat_id],
            )
            .await?;

        let mut attachments = Vec::new();
        while let Some(row) = rows.next().await? {
            attachments.push(Attachment {
                id: row.get(0)?,
                message_id: row.get(1)?,
                kind: row.get::<String>(2)?.parse().unwrap_or(MediaKind::File),
                filename: row.get(3)?,
                path: row.get(4)?,
                mime_type: row.get(5)?,
                size: row.get(6)?,
            });
        }
        Ok(attachments)
    }
}
