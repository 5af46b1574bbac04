use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    Attachment, Chat, Contact, Message, PipelineChange, PipelineState, ScoreEvent,
};

// ---------------------------------------------------------------------------
// Individual store traits
// ---------------------------------------------------------------------------

/// Contacts, looked up by the derived phone-digit and name keys.
#[async_trait]
pub trait ContactStore: Send + Sync {
    /// Returns the new id.
    async fn create_contact(&self, contact: &Contact) -> Result<i64>;
    async fn get_contact(&self, id: i64) -> Result<Option<Contact>>;
    /// Suffix match on the digits of `phone`, in either direction, once both
    /// sides carry at least 7 digits. An exact match wins over a suffix one.
    async fn find_contact_by_phone(&self, team_id: i64, phone: &str) -> Result<Option<Contact>>;
    /// Exact match on the normalized name key.
    async fn find_contact_by_name(&self, team_id: i64, name: &str) -> Result<Option<Contact>>;
    async fn update_contact(&self, contact: &Contact) -> Result<()>;
    async fn list_contacts(&self, team_id: i64) -> Result<Vec<Contact>>;
}

#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn create_chat(&self, chat: &Chat) -> Result<i64>;
    async fn get_chat(&self, id: i64) -> Result<Option<Chat>>;
    /// Chats whose stored digits end with `digits_suffix`, or are themselves a
    /// suffix of it, oldest first.
    async fn find_chats_by_number_suffix(
        &self,
        team_id: i64,
        digits_suffix: &str,
    ) -> Result<Vec<Chat>>;
    async fn find_chats_by_name(&self, team_id: i64, name: &str) -> Result<Vec<Chat>>;
    async fn update_chat_identity(&self, id: i64, name: &str, number: &str) -> Result<()>;
    async fn update_chat_score(
        &self,
        id: i64,
        score: i64,
        pipeline_state_id: Option<i64>,
    ) -> Result<()>;
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn create_message(&self, message: &Message) -> Result<i64>;
    async fn list_messages(&self, chat_id: i64) -> Result<Vec<Message>>;
}

#[async_trait]
pub trait AttachmentStore: Send + Sync {
    async fn create_attachment(&self, attachment: &Attachment) -> Result<i64>;
    async fn list_chat_attachments(&self, chat_id: i64) -> Result<Vec<Attachment>>;
}

/// Append-only score audit log.
#[async_trait]
pub trait ScoreEventStore: Send + Sync {
    async fn create_score_event(&self, event: &ScoreEvent) -> Result<i64>;
    async fn list_score_events(&self, chat_id: i64) -> Result<Vec<ScoreEvent>>;
    async fn sum_score_events(&self, chat_id: i64) -> Result<i64>;
}

#[async_trait]
pub trait PipelineStore: Send + Sync {
    async fn list_pipeline_states(&self) -> Result<Vec<PipelineState>>;
    async fn create_pipeline_state(&self, name: &str, score_min: i64, score_max: i64)
        -> Result<i64>;
    async fn record_pipeline_change(&self, chat_id: i64, state_id: Option<i64>) -> Result<()>;
    async fn list_pipeline_history(&self, chat_id: i64) -> Result<Vec<PipelineChange>>;
}

// ---------------------------------------------------------------------------
// Combined traits
// ---------------------------------------------------------------------------

/// Everything the import and reconciliation services read and write.
pub trait Store:
    ContactStore + ChatStore + MessageStore + AttachmentStore + ScoreEventStore + PipelineStore
{
}

impl<T> Store for T where
    T: ContactStore
        + ChatStore
        + MessageStore
        + AttachmentStore
        + ScoreEventStore
        + PipelineStore
        + ?Sized
{
}

/// A unit of work with read-your-writes visibility. Dropping it without
/// `commit` discards every write.
#[async_trait]
pub trait StoreTransaction: Store {
    async fn commit(self: Box<Self>) -> Result<()>;
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// A complete database backend: direct store access plus transactions and
/// replica lifecycle.
#[async_trait]
pub trait DatabaseBackend: Store {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>>;
    async fn sync(&self) -> Result<()>;
}
