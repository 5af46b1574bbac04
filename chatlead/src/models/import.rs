use serde::{Deserialize, Serialize};

use super::ContactStatus;

/// Outcome of one archive import, shaped by the caller into its own response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImportResult {
    pub chat_id: i64,
    pub contact_id: i64,
    pub messages_saved: usize,
    pub attachments_saved: usize,
    /// Attachments mentioned in the transcript whose file could not be copied.
    pub attachments_missing: usize,
    /// Basenames that appeared more than once in the archive; the last one won.
    pub attachment_name_collisions: Vec<String>,
    pub score_events: usize,
    pub score: i64,
    pub pipeline_state_id: Option<i64>,
    pub score_skipped: bool,
    pub contact_name: String,
    pub contact_phone: Option<String>,
    pub contact_status: ContactStatus,
}

/// Counters from one address-book reconciliation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReconcileStats {
    pub rows: usize,
    pub matched_by_phone: usize,
    pub matched_by_name: usize,
    pub unmatched: usize,
    pub rows_without_phones: usize,
    pub contacts_updated: usize,
    pub chats_renamed: usize,
    pub dry_run: bool,
}
