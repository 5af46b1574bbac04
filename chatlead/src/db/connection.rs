use libsql::{Builder, Connection};
use std::sync::Arc;

use crate::config::DatabaseConfig;
use crate::error::Result;

use super::schema;

pub struct Database {
    pub(crate) db: Arc<libsql::Database>,
    pub(crate) busy_timeout_ms: u64,
    pub(crate) journal_mode: String,
    pub(crate) synchronous: String,
}

impl Database {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let busy_timeout_ms = config.busy_timeout_ms;
        let journal_mode = normalize_journal_mode(&config.journal_mode).to_string();
        let synchronous = normalize_synchronous(&config.synchronous).to_string();

        let db = if config.url.starts_with("libsql://") || config.url.starts_with("https://") {
            if let Some(ref local_path) = config.local_path {
                Builder::new_remote_replica(
                    local_path,
                    config.url.clone(),
                    config.auth_token.clone().unwrap_or_default(),
                )
                .build()
                .await?
            } else {
                Builder::new_remote(
                    config.url.clone(),
                    config.auth_token.clone().unwrap_or_default(),
                )
                .build()
                .await?
            }
        } else if config.url == ":memory:" {
            Builder::new_local(":memory:").build().await?
        } else {
            let path = config.url.strip_prefix("file:").unwrap_or(&config.url);
            Builder::new_local(path).build().await?
        };

        let database = Self {
            db: Arc::new(db),
            busy_timeout_ms,
            journal_mode,
            synchronous,
        };
        database.configure_database().await?;
        database.init_schema().await?;

        tracing::debug!(url = %config.url, "Database ready");

        Ok(database)
    }

    pub fn connect(&self) -> Result<Connection> {
        Ok(self.db.connect()?)
    }

    /// A connection that waits up to the configured busy timeout for the
    /// write lock instead of failing with SQLITE_BUSY.
    pub async fn connect_for_write(&self) -> Result<Connection> {
        let conn = self.connect()?;
        let pragma = format!("PRAGMA busy_timeout = {}", self.busy_timeout_ms);
        // Remote connections have no local lock to wait on.
        if let Err(error) = conn.execute_batch(&pragma).await {
            tracing::trace!(error = %error, "busy_timeout not applied to connection");
        }
        Ok(conn)
    }

    /// Pragmas are applied best-effort: remote databases reject some of them.
    async fn configure_database(&self) -> Result<()> {
        let conn = self.connect()?;
        let busy_timeout = self.busy_timeout_ms.to_string();
        let pragmas = [
            ("busy_timeout", busy_timeout.as_str()),
            ("journal_mode", self.journal_mode.as_str()),
            ("synchronous", self.synchronous.as_str()),
        ];

        for (name, value) in pragmas {
            if let Err(error) = conn.execute_batch(&format!("PRAGMA {name} = {value}")).await {
                tracing::warn!(pragma = name, value, error = %error, "Failed to set SQLite pragma");
            }
        }

        Ok(())
    }

    async fn init_schema(&self) -> Result<()> {
        let conn = self.connect()?;
        schema::init_schema(&conn).await?;
        Ok(())
    }

    pub async fn sync(&self) -> Result<()> {
        if let Ok(sync) = self.db.sync().await {
            tracing::info!("Database synced: {:?}", sync);
        }
        Ok(())
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            busy_timeout_ms: self.busy_timeout_ms,
            journal_mode: self.journal_mode.clone(),
            synchronous: self.synchronous.clone(),
        }
    }
}

fn normalize_journal_mode(value: &str) -> &'static str {
    match value.trim().to_uppercase().as_str() {
        "DELETE" => "DELETE",
        "TRUNCATE" => "TRUNCATE",
        "PERSIST" => "PERSIST",
        "MEMORY" => "MEMORY",
        "WAL" => "WAL",
        "OFF" => "OFF",
        _ => "WAL",
    }
}

fn normalize_synchronous(value: &str) -> &'static str {
    match value.trim().to_uppercase().as_str() {
        "OFF" => "OFF",
        "NORMAL" => "NORMAL",
        "FULL" => "FULL",
        "EXTRA" => "EXTRA",
        _ => "NORMAL",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pragma_values_are_whitelisted() {
        assert_eq!(normalize_journal_mode("delete"), "DELETE");
        assert_eq!(normalize_journal_mode("; DROP TABLE chats"), "WAL");
        assert_eq!(normalize_synchronous("full"), "FULL");
        assert_eq!(normalize_synchronous(""), "NORMAL");
    }

    #[tokio::test]
    async fn test_local_file_database_initializes_schema() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("file:{}", dir.path().join("chatlead.db").display());
        let db = Database::new(&DatabaseConfig::local(url)).await.unwrap();

        let conn = db.connect().unwrap();
        let mut rows = conn
            .query("SELECT COUNT(*) FROM sqlite_master WHERE name = 'score_events'", ())
            .await
            .unwrap();
        let count: i64 = rows.next().await.unwrap().unwrap().get(0).unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_write_connection_carries_busy_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("file:{}", dir.path().join("chatlead.db").display());
        let mut config = DatabaseConfig::local(url);
        config.busy_timeout_ms = 1234;
        let db = Database::new(&config).await.unwrap();

        let conn = db.connect_for_write().await.unwrap();
        let mut rows = conn.query("PRAGMA busy_timeout", ()).await.unwrap();
        let timeout: i64 = rows.next().await.unwrap().unwrap().get(0).unwrap();
        assert_eq!(timeout, 1234);
    }
}
