use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{MediaKind, MessageKind};

/// A message as read from the transcript, before any identity is attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedMessage {
    /// Canonical `DD/MM/YYYY`.
    pub date: String,
    /// `H:MM` or `HH:MM` as written.
    pub time: String,
    pub author_raw: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: i64,
    pub chat_id: i64,
    pub contact_id: i64,
    pub kind: MessageKind,
    pub text: String,
    pub author_raw: String,
    pub from_me: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Attachment {
    pub id: i64,
    pub message_id: i64,
    pub kind: MediaKind,
    pub filename: String,
    pub path: String,
    pub mime_type: Option<String>,
    pub size: i64,
}

/// A media file copied into permanent storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredFile {
    pub filename: String,
    pub path: String,
    pub mime_type: Option<String>,
    pub size: i64,
    pub kind: MediaKind,
}
