pub mod identity;
mod importer;
mod reconcile;
mod scoring;

pub use identity::{find_or_create_chat, lacks_real_name, upsert_contact};
pub use importer::{is_from_business, is_system_line, pick_message_kind, ChatImporter, ImportRequest};
pub use reconcile::{reconcile_rows, ContactIndex, ContactReconciler};
pub use scoring::ScoreService;
