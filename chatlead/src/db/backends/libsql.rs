use async_trait::async_trait;
use libsql::{Connection, TransactionBehavior};

use crate::config::PipelineStateSeed;
use crate::db::connection::Database;
use crate::db::repository::{
    AttachmentRepository, ChatRepository, ContactRepository, MessageRepository,
    PipelineRepository, ScoreEventRepository,
};
use crate::db::traits::{
    AttachmentStore, ChatStore, ContactStore, DatabaseBackend, MessageStore, PipelineStore,
    ScoreEventStore, StoreTransaction,
};
use crate::error::Result;
use crate::models::{
    Attachment, Chat, Contact, Message, PipelineChange, PipelineState, ScoreEvent,
};

/// Anything that can hand out a libsql connection. The store traits are
/// implemented once for every source, so the backend and its transactions
/// share the same repository calls.
pub trait ConnectionSource: Send + Sync {
    fn connection(&self) -> Result<Connection>;
}

pub struct LibSqlBackend {
    db: Database,
}

impl LibSqlBackend {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert the configured buckets when the table is empty. Returns how
    /// many were inserted.
    pub async fn seed_pipeline_states(&self, seeds: &[PipelineStateSeed]) -> Result<usize> {
        let conn = self.db.connect_for_write().await?;
        if !PipelineRepository::list_states(&conn).await?.is_empty() {
            return Ok(0);
        }

        let tx = conn.transaction().await?;
        for seed in seeds {
            PipelineRepository::create_state(&tx, &seed.name, seed.score_min, seed.score_max)
                .await?;
        }
        tx.commit().await?;

        tracing::info!(count = seeds.len(), "Seeded pipeline states");
        Ok(seeds.len())
    }
}

impl ConnectionSource for LibSqlBackend {
    fn connection(&self) -> Result<Connection> {
        self.db.connect()
    }
}

/// One libsql transaction. Every store call runs on the transaction's
/// connection, so later reads see earlier writes.
pub struct LibSqlTransaction {
    tx: libsql::Transaction,
}

impl ConnectionSource for LibSqlTransaction {
    fn connection(&self) -> Result<Connection> {
        Ok((*self.tx).clone())
    }
}

#[async_trait]
impl StoreTransaction for LibSqlTransaction {
    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl DatabaseBackend for LibSqlBackend {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        let conn = self.db.connect_for_write().await?;
        // Take the write lock up front so two imports never deadlock on upgrade.
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .await?;
        Ok(Box::new(LibSqlTransaction { tx }))
    }

    async fn sync(&self) -> Result<()> {
        self.db.sync().await
    }
}

#[async_trait]
impl<T: ConnectionSource + ?Sized> ContactStore for T {
    async fn create_contact(&self, contact: &Contact) -> Result<i64> {
        let conn = self.connection()?;
        ContactRepository::create(&conn, contact).await
    }
    async fn get_contact(&self, id: i64) -> Result<Option<Contact>> {
        let conn = self.connection()?;
        ContactRepository::get_by_id(&conn, id).await
    }
    async fn find_contact_by_phone(&self, team_id: i64, phone: &str) -> Result<Option<Contact>> {
        let conn = self.connection()?;
        ContactRepository::find_by_phone(&conn, team_id, phone).await
    }
    async fn find_contact_by_name(&self, team_id: i64, name: &str) -> Result<Option<Contact>> {
        let conn = self.connection()?;
        ContactRepository::find_by_name(&conn, team_id, name).await
    }
    async fn update_contact(&self, contact: &Contact) -> Result<()> {
        let conn = self.connection()?;
        ContactRepository::update(&conn, contact).await
    }
    async fn list_contacts(&self, team_id: i64) -> Result<Vec<Contact>> {
        let conn = self.connection()?;
        ContactRepository::list_by_team(&conn, team_id).await
    }
}

#[async_trait]
impl<T: ConnectionSource + ?Sized> ChatStore for T {
    async fn create_chat(&self, chat: &Chat) -> Result<i64> {
        let conn = self.connection()?;
        ChatRepository::create(&conn, chat).await
    }
    async fn get_chat(&self, id: i64) -> Result<Option<Chat>> {
        let conn = self.connection()?;
        ChatRepository::get_by_id(&conn, id).await
    }
    async fn find_chats_by_number_suffix(
        &self,
        team_id: i64,
        digits_suffix: &str,
    ) -> Result<Vec<Chat>> {
        let conn = self.connection()?;
        ChatRepository::find_by_number_suffix(&conn, team_id, digits_suffix).await
    }
    async fn find_chats_by_name(&self, team_id: i64, name: &str) -> Result<Vec<Chat>> {
        let conn = self.connection()?;
        ChatRepository::find_by_name(&conn, team_id, name).await
    }
    async fn update_chat_identity(&self, id: i64, name: &str, number: &str) -> Result<()> {
        let conn = self.connection()?;
        ChatRepository::update_identity(&conn, id, name, number).await
    }
    async fn update_chat_score(
        &self,
        id: i64,
        score: i64,
        pipeline_state_id: Option<i64>,
    ) -> Result<()> {
        let conn = self.connection()?;
        ChatRepository::update_score(&conn, id, score, pipeline_state_id).await
    }
}

#[async_trait]
impl<T: ConnectionSource + ?Sized> MessageStore for T {
    async fn create_message(&self, message: &Message) -> Result<i64> {
        let conn = self.connection()?;
        MessageRepository::create(&conn, message).await
    }
    async fn list_messages(&self, chat_id: i64) -> Result<Vec<Message>> {
        let conn = self.connection()?;
        MessageRepository::list_by_chat(&conn, chat_id).await
    }
}

#[async_trait]
impl<T: ConnectionSource + ?Sized> AttachmentStore for T {
    async fn create_attachment(&self, attachment: &Attachment) -> Result<i64> {
        let conn = self.connection()?;
        AttachmentRepository::create(&conn, attachment).await
    }
    async fn list_chat_attachments(&self, chat_id: i64) -> Result<Vec<Attachment>> {
        let conn = self.connection()?;
        AttachmentRepository::list_by_chat(&conn, chat_id).await
    }
}

#[async_trait]
impl<T: ConnectionSource + ?Sized> ScoreEventStore for T {
    async fn create_score_event(&self, event: &ScoreEvent) -> Result<i64> {
        let conn = self.connection()?;
        ScoreEventRepository::create(&conn, event).await
    }
    async fn list_score_events(&self, chat_id: i64) -> Result<Vec<ScoreEvent>> {
        let conn = self.connection()?;
        ScoreEventRepository::list_by_chat(&conn, chat_id).await
    }
    async fn sum_score_events(&self, chat_id: i64) -> Result<i64> {
        let conn = self.connection()?;
        ScoreEventRepository::sum_by_chat(&conn, chat_id).await
    }
}

#[async_trait]
impl<T: ConnectionSource + ?Sized> PipelineStore for T {
    async fn list_pipeline_states(&self) -> Result<Vec<PipelineState>> {
        let conn = self.connection()?;
        PipelineRepository::list_states(&conn).await
    }
    async fn create_pipeline_state(
        &self,
        name: &str,
        score_min: i64,
        score_max: i64,
    ) -> Result<i64> {
        let conn = self.connection()?;
        PipelineRepository::create_state(&conn, name, score_min, score_max).await
    }
    async fn record_pipeline_change(&self, chat_id: i64, state_id: Option<i64>) -> Result<()> {
        let conn = self.connection()?;
        PipelineRepository::record_change(&conn, chat_id, state_id).await
    }
    async fn list_pipeline_history(&self, chat_id: i64) -> Result<Vec<PipelineChange>> {
        let conn = self.connection()?;
        PipelineRepository::list_history(&conn, chat_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::models::ContactStatus;

    async fn backend(dir: &tempfile::TempDir) -> LibSqlBackend {
        let config = DatabaseConfig::local(format!("file:{}", dir.path().join("test.db").display()));
        LibSqlBackend::new(Database::new(&config).await.unwrap())
    }

    #[tokio::test]
    async fn test_transaction_reads_its_own_writes() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(&dir).await;

        let tx = backend.begin().await.unwrap();
        let id = tx
            .create_contact(&Contact::new(1, "Juan".into(), None, ContactStatus::Named))
            .await
            .unwrap();
        assert!(tx.get_contact(id).await.unwrap().is_some());
        tx.commit().await.unwrap();

        assert!(backend.get_contact(id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rollback_discards_writes() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(&dir).await;

        let tx = backend.begin().await.unwrap();
        let id = tx
            .create_chat(&Chat::new(1, "Juan".into(), Some("2612767072".into())))
            .await
            .unwrap();
        tx.rollback().await.unwrap();

        assert!(backend.get_chat(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_seed_pipeline_states_once() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(&dir).await;
        let seeds = crate::config::parse_pipeline_states(crate::config::DEFAULT_PIPELINE_STATES);

        assert_eq!(backend.seed_pipeline_states(&seeds).await.unwrap(), 4);
        assert_eq!(backend.seed_pipeline_states(&seeds).await.unwrap(), 0);
        assert_eq!(backend.list_pipeline_states().await.unwrap().len(), 4);
    }
}
