use libsql::Connection;

use crate::error::Result;

pub async fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Contacts known to a team
        CREATE TABLE IF NOT EXISTS contacts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            team_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            name_key TEXT NOT NULL DEFAULT '',
            phone TEXT,
            phone_digits TEXT,
            phone2 TEXT,
            status INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_contacts_team_phone ON contacts(team_id, phone_digits);
        CREATE INDEX IF NOT EXISTS idx_contacts_team_name ON contacts(team_id, name_key);

        -- Pipeline buckets (configuration)
        CREATE TABLE IF NOT EXISTS pipeline_states (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            score_min INTEGER NOT NULL,
            score_max INTEGER NOT NULL
        );

        -- Conversations, one per team and counterparty
        CREATE TABLE IF NOT EXISTS chats (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            team_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            name_key TEXT NOT NULL DEFAULT '',
            number TEXT NOT NULL,
            number_digits TEXT NOT NULL DEFAULT '',
            score INTEGER NOT NULL DEFAULT 0,
            pipeline_state_id INTEGER,
            created_by INTEGER,
            created_at TEXT NOT NULL,
            FOREIGN KEY (pipeline_state_id) REFERENCES pipeline_states(id)
        );

        CREATE INDEX IF NOT EXISTS idx_chats_team_number ON chats(team_id, number_digits);
        CREATE INDEX IF NOT EXISTS idx_chats_team_name ON chats(team_id, name_key);

        -- Messages (append-only)
        CREATE TABLE IF NOT EXISTS messages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            chat_id INTEGER NOT NULL,
            contact_id INTEGER NOT NULL,
            kind TEXT NOT NULL DEFAULT 'text',
            text TEXT NOT NULL,
            author_raw TEXT NOT NULL,
            from_me INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            FOREIGN KEY (chat_id) REFERENCES chats(id),
            FOREIGN KEY (contact_id) REFERENCES contacts(id)
        );

        CREATE INDEX IF NOT EXISTS idx_messages_chat_id ON messages(chat_id);

        -- Attachments (append-only)
        CREATE TABLE IF NOT EXISTS attachments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            message_id INTEGER NOT NULL,
            kind TEXT NOT NULL DEFAULT 'file',
            filename TEXT NOT NULL,
            path TEXT NOT NULL,
            mime_type TEXT,
            size INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY (message_id) REFERENCES messages(id)
        );

        CREATE INDEX IF NOT EXISTS idx_attachments_message_id ON attachments(message_id);

        -- Score audit log (append-only); sums to chats.score
        CREATE TABLE IF NOT EXISTS score_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            chat_id INTEGER NOT NULL,
            origin TEXT NOT NULL DEFAULT 'rule',
            reason TEXT NOT NULL,
            delta INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY (chat_id) REFERENCES chats(id)
        );

        CREATE INDEX IF NOT EXISTS idx_score_events_chat_id ON score_events(chat_id);

        -- Bucket transitions
        CREATE TABLE IF NOT EXISTS pipeline_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            chat_id INTEGER NOT NULL,
            state_id INTEGER,
            changed_at TEXT NOT NULL,
            FOREIGN KEY (chat_id) REFERENCES chats(id)
        );

        CREATE INDEX IF NOT EXISTS idx_pipeline_history_chat_id ON pipeline_history(chat_id);
        "#,
    )
    .await?;

    Ok(())
}
