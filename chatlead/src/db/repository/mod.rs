mod chats;
mod contacts;
mod messages;
mod scores;

use chrono::{DateTime, Utc};

pub use chats::ChatRepository;
pub use contacts::ContactRepository;
pub use messages::{AttachmentRepository, MessageRepository};
pub use scores::{PipelineRepository, ScoreEventRepository};

/// Stored timestamps are RFC 3339. Anything unreadable becomes "now".
pub(crate) fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
pub(crate) async fn setup_test_db() -> libsql::Connection {
    let conn = libsql::Builder::new_local(":memory:")
        .build()
        .await
        .unwrap()
        .connect()
        .unwrap();
    crate::db::schema::init_schema(&conn).await.unwrap();
    conn
}

/// Insert a contact and its chat so child rows satisfy their foreign keys.
/// Returns `(contact_id, chat_id)`.
#[cfg(test)]
pub(crate) async fn seed_chat(conn: &libsql::Connection, team_id: i64, name: &str) -> (i64, i64) {
    use crate::models::{Chat, Contact, ContactStatus};

    let contact = Contact::new(team_id, name.to_string(), None, ContactStatus::Named);
    let contact_id = ContactRepository::create(conn, &contact).await.unwrap();
    let chat_id = ChatRepository::create(conn, &Chat::new(team_id, name.to_string(), None))
        .await
        .unwrap();
    (contact_id, chat_id)
}
