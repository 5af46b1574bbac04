//! Archive import orchestration.
//!
//! An import walks a fixed sequence of stages. Every database write of one
//! import goes through a single transaction that is committed once at the
//! end; any failure rolls it back and removes the media copied so far. The
//! scratch workspace is a [`tempfile::TempDir`] and disappears on every exit
//! path.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use tokio::sync::OwnedMutexGuard;

use super::identity::{find_or_create_chat, upsert_contact};
use super::scoring::ScoreService;
use crate::config::ImportConfig;
use crate::db::{DatabaseBackend, Store};
use crate::error::{ChatleadError, Result};
use crate::models::{
    Attachment, ContactStatus, ImportResult, ImportStage, Message, MessageKind, ParsedMessage,
    StoredFile,
};
use crate::processing::{
    attachment_tokens, classify_archive_name, clean_for_match, find_transcript,
    index_extracted_files, name_key, normalize_phone, normalize_text, phones_match,
    read_transcript, resolve_message_attachments, ArchiveIdentity, ArchiveSource,
    AttachmentIndex, MediaStore, Transcript, ZipArchiveSource,
};
use crate::scoring::ScoringEngine;

/// Exporter notices that are not part of the conversation.
const SYSTEM_PATTERNS: &[&str] = &[
    "los mensajes y las llamadas estan cifrados",
    "cambio tu codigo de seguridad",
    "toca para obtener mas informacion",
];

const TRANSCRIPT_TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M";

/// One archive to import.
#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub archive_path: PathBuf,
    /// Name the archive was uploaded under. The counterparty identity is read
    /// from it; defaults to the file name of `archive_path`.
    pub original_name: Option<String>,
    pub team_id: i64,
    pub user_id: Option<i64>,
}

impl ImportRequest {
    pub fn new(archive_path: impl Into<PathBuf>, team_id: i64) -> Self {
        Self {
            archive_path: archive_path.into(),
            original_name: None,
            team_id,
            user_id: None,
        }
    }

    fn archive_name(&self) -> String {
        match &self.original_name {
            Some(name) => name.clone(),
            None => self
                .archive_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }
}

/// Archive contents ready for the database stages.
struct Workspace {
    transcript: String,
    index: AttachmentIndex,
}

/// Messages persisted for one import and the files they referenced.
struct PersistedMessage {
    id: i64,
    files: Vec<PathBuf>,
}

pub struct ChatImporter {
    db: Arc<dyn DatabaseBackend>,
    media: MediaStore,
    engine: Arc<ScoringEngine>,
    scores: ScoreService,
    config: ImportConfig,
    locks: IdentityLocks,
}

impl ChatImporter {
    pub fn new(
        db: Arc<dyn DatabaseBackend>,
        media: MediaStore,
        engine: Arc<ScoringEngine>,
        scores: ScoreService,
        config: ImportConfig,
    ) -> Self {
        Self {
            db,
            media,
            engine,
            scores,
            config,
            locks: IdentityLocks::default(),
        }
    }

    /// Import a zip archive from disk.
    pub async fn import_archive(&self, request: ImportRequest) -> Result<ImportResult> {
        let source = ZipArchiveSource::open(&request.archive_path)?;
        self.import_from_source(source, &request).await
    }

    /// Import from any archive container.
    pub async fn import_from_source<A>(
        &self,
        source: A,
        request: &ImportRequest,
    ) -> Result<ImportResult>
    where
        A: ArchiveSource + Send + 'static,
    {
        let archive_name = request.archive_name();
        let identity = classify_archive_name(
            &archive_name,
            &self.config.archive_prefix,
            self.config.min_phone_digits,
        );
        tracing::info!(
            team_id = request.team_id,
            archive = %archive_name,
            contact = %identity.name,
            status = %identity.status,
            "Starting chat import"
        );

        let scratch = self.scratch_dir()?;
        log_stage(ImportStage::Extracting, request.team_id);
        let workspace = extract_workspace(source, scratch.path().to_path_buf()).await;
        let workspace = match workspace {
            Ok(workspace) => workspace,
            Err(e) => {
                tracing::error!(stage = %ImportStage::Extracting, error = %e, "Chat import failed");
                return Err(e);
            }
        };

        let _guard = self
            .locks
            .acquire(identity_lock_key(request.team_id, &identity))
            .await;

        let tx = self.db.begin().await?;
        let mut stage = ImportStage::Parsing;
        let mut stored: Vec<StoredFile> = Vec::new();

        let outcome = self
            .run(&*tx, request, &identity, &workspace, &mut stage, &mut stored)
            .await;

        match outcome {
            Ok(result) => {
                if let Err(e) = tx.commit().await {
                    tracing::error!(stage = %ImportStage::Committed, error = %e, "Chat import failed");
                    remove_stored_files(&stored);
                    return Err(e);
                }
                log_stage(ImportStage::Committed, request.team_id);
                tracing::info!(
                    chat_id = result.chat_id,
                    messages = result.messages_saved,
                    attachments = result.attachments_saved,
                    missing = result.attachments_missing,
                    score = result.score,
                    "Chat import committed"
                );
                Ok(result)
            }
            Err(e) => {
                tracing::error!(stage = %stage, error = %e, "Chat import failed");
                if let Err(rollback) = tx.rollback().await {
                    tracing::warn!(error = %rollback, "Rollback after failed import also failed");
                }
                remove_stored_files(&stored);
                log_stage(ImportStage::Failed, request.team_id);
                Err(e)
            }
        }
    }

    fn scratch_dir(&self) -> Result<tempfile::TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("chat_import_");
        let dir = match &self.config.scratch_dir {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                builder.tempdir_in(parent)?
            }
            None => builder.tempdir()?,
        };
        Ok(dir)
    }

    async fn run<S: Store + ?Sized>(
        &self,
        store: &S,
        request: &ImportRequest,
        identity: &ArchiveIdentity,
        workspace: &Workspace,
        stage: &mut ImportStage,
        stored: &mut Vec<StoredFile>,
    ) -> Result<ImportResult> {
        let team_id = request.team_id;

        enter(stage, ImportStage::Parsing, team_id);
        let parsed: Vec<ParsedMessage> = Transcript::new(&workspace.transcript).messages().collect();
        tracing::debug!(messages = parsed.len(), "Parsed transcript");

        enter(stage, ImportStage::ResolvingIdentity, team_id);
        let contact = upsert_contact(
            store,
            team_id,
            &identity.name,
            identity.phone.as_deref(),
            identity.status,
        )
        .await?;
        let (chat, created) = find_or_create_chat(
            store,
            team_id,
            &identity.name,
            identity.phone.as_deref(),
            request.user_id,
        )
        .await?;
        tracing::debug!(contact_id = contact.id, chat_id = chat.id, created, "Resolved identity");

        enter(stage, ImportStage::PersistingMessages, team_id);
        let mut persisted = Vec::new();
        let mut client_texts = Vec::new();
        let mut attachments_missing = 0;

        for entry in &parsed {
            let author = entry.author_raw.trim();
            if author.is_empty() || is_system_line(&entry.text) {
                continue;
            }

            let from_me = is_from_business(author, &identity.name, identity.phone.as_deref());
            let files = resolve_message_attachments(&entry.text, &workspace.index);
            attachments_missing += unresolved_mentions(&entry.text, &files);

            let message = Message {
                id: 0,
                chat_id: chat.id,
                contact_id: contact.id,
                kind: pick_message_kind(&entry.text, !files.is_empty()),
                text: entry.text.clone(),
                author_raw: author.to_string(),
                from_me,
                created_at: message_timestamp(entry),
            };
            let id = store.create_message(&message).await?;

            if !from_me && !entry.text.trim().is_empty() {
                client_texts.push(entry.text.as_str());
            }
            persisted.push(PersistedMessage { id, files });
        }

        enter(stage, ImportStage::ResolvingAttachments, team_id);
        let mut attachments_saved = 0;
        for message in &persisted {
            for file in &message.files {
                match self.media.store_media_file(file, team_id, chat.id) {
                    Ok(copy) => {
                        let attachment = Attachment {
                            id: 0,
                            message_id: message.id,
                            kind: copy.kind,
                            filename: copy.filename.clone(),
                            path: copy.path.clone(),
                            mime_type: copy.mime_type.clone(),
                            size: copy.size,
                        };
                        stored.push(copy);
                        store.create_attachment(&attachment).await?;
                        attachments_saved += 1;
                    }
                    Err(e) => {
                        tracing::warn!(
                            message_id = message.id,
                            file = %file.display(),
                            error = %e,
                            "Skipping attachment"
                        );
                        attachments_missing += 1;
                    }
                }
            }
        }

        enter(stage, ImportStage::Scoring, team_id);
        let mut chat = store.get_chat(chat.id).await?.ok_or_else(|| {
            ChatleadError::Invariant(format!("chat {} vanished during import", chat.id))
        })?;
        let contact = store.get_contact(contact.id).await?.ok_or_else(|| {
            ChatleadError::Invariant(format!("contact {} vanished during import", contact.id))
        })?;

        let score_skipped = contact.status == ContactStatus::Client;
        let mut score_events = 0;
        if score_skipped {
            tracing::info!(contact_id = contact.id, "Contact is a client, skipping scoring");
        } else {
            let deltas = self.engine.score_client_texts(client_texts);
            score_events = deltas.len();
            self.scores.apply_score(store, &mut chat, &deltas).await?;
        }

        Ok(ImportResult {
            chat_id: chat.id,
            contact_id: contact.id,
            messages_saved: persisted.len(),
            attachments_saved,
            attachments_missing,
            attachment_name_collisions: workspace.index.collisions(),
            score_events,
            score: chat.score,
            pipeline_state_id: chat.pipeline_state_id,
            score_skipped,
            contact_name: contact.name,
            contact_phone: contact.phone,
            contact_status: contact.status,
        })
    }
}

fn log_stage(stage: ImportStage, team_id: i64) {
    tracing::debug!(stage = %stage, team_id, "Import stage");
}

fn enter(current: &mut ImportStage, next: ImportStage, team_id: i64) {
    *current = next;
    log_stage(next, team_id);
}

/// List, extract and index the archive off the async runtime.
async fn extract_workspace<A>(mut source: A, dir: PathBuf) -> Result<Workspace>
where
    A: ArchiveSource + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let entries = source.list_entries()?;
        let transcript_name = find_transcript(&entries)
            .ok_or_else(|| {
                ChatleadError::InputRejected("archive contains no .txt transcript".to_string())
            })?
            .to_string();

        source.extract_all(&dir)?;
        let transcript_path = dir.join(&transcript_name);
        let transcript = read_transcript(&transcript_path)?;
        let index = index_extracted_files(&dir, Some(&transcript_path))?;

        tracing::debug!(
            entries = entries.len(),
            transcript = %transcript_name,
            media = index.len(),
            "Extracted archive"
        );
        Ok(Workspace { transcript, index })
    })
    .await
    .map_err(|e| ChatleadError::Io(std::io::Error::other(e)))?
}

fn remove_stored_files(stored: &[StoredFile]) {
    for file in stored {
        if let Err(e) = std::fs::remove_file(&file.path) {
            tracing::warn!(path = %file.path, error = %e, "Failed to remove orphaned media");
        }
    }
}

/// Exporter notices such as the end-to-end encryption banner.
pub fn is_system_line(text: &str) -> bool {
    let text = normalize_text(text);
    SYSTEM_PATTERNS.iter().any(|pattern| text.contains(pattern))
}

/// A message is the business's unless its author is the counterparty, either
/// by normalized name or, for a number-only author label, by phone suffix.
pub fn is_from_business(author: &str, peer_name: &str, peer_phone: Option<&str>) -> bool {
    let author_key = normalize_text(author);
    if !author_key.is_empty() && author_key == normalize_text(peer_name) {
        return false;
    }
    if let Some(phone) = peer_phone {
        let numeric_label = !author.chars().any(char::is_alphabetic);
        if numeric_label && !normalize_phone(author, false).is_empty() && phones_match(author, phone)
        {
            return false;
        }
    }
    true
}

pub fn pick_message_kind(text: &str, has_attachments: bool) -> MessageKind {
    if !has_attachments {
        return MessageKind::Text;
    }
    let lower = text.to_lowercase();
    if ["audio", "ptt", "opus"].iter().any(|k| lower.contains(k)) {
        MessageKind::Audio
    } else if ["img", "foto", "imagen"].iter().any(|k| lower.contains(k)) {
        MessageKind::Image
    } else {
        MessageKind::File
    }
}

/// Filename-like mentions that no resolved file accounts for.
fn unresolved_mentions(text: &str, resolved: &[PathBuf]) -> usize {
    let resolved: Vec<String> = resolved
        .iter()
        .filter_map(|p| p.file_name())
        .map(|n| clean_for_match(&n.to_string_lossy()))
        .collect();
    attachment_tokens(text)
        .iter()
        .filter(|token| !resolved.iter().any(|name| name.ends_with(token.as_str())))
        .count()
}

fn message_timestamp(parsed: &ParsedMessage) -> DateTime<Utc> {
    let raw = format!("{} {}", parsed.date, parsed.time);
    match NaiveDateTime::parse_from_str(&raw, TRANSCRIPT_TIMESTAMP_FORMAT) {
        Ok(naive) => Utc.from_utc_datetime(&naive),
        Err(_) => {
            tracing::debug!(timestamp = %raw, "Unparseable message timestamp, using now");
            Utc::now()
        }
    }
}

fn identity_lock_key(team_id: i64, identity: &ArchiveIdentity) -> String {
    match &identity.phone {
        Some(phone) => format!("{team_id}:phone:{}", normalize_phone(phone, false)),
        None => format!("{team_id}:name:{}", name_key(&identity.name)),
    }
}

/// Per-identity async locks so two imports for the same counterparty run one
/// after the other instead of racing to create the same chat.
#[derive(Default)]
struct IdentityLocks {
    inner: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl IdentityLocks {
    async fn acquire(&self, key: String) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = match self.inner.lock() {
                Ok(map) => map,
                Err(poisoned) => poisoned.into_inner(),
            };
            map.retain(|_, lock| Arc::strong_count(lock) > 1);
            map.entry(key).or_default().clone()
        };
        lock.lock_owned().await
    }
}
