//! Address-book reconciliation against a team's existing contacts.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::db::{DatabaseBackend, Store};
use crate::error::Result;
use crate::models::{is_real_phone, Contact, ContactStatus, ReconcileStats};
use crate::processing::{
    name_key, normalize_phone, phones_match, read_contact_rows, strip_numeric_prefix, ContactRow,
};

use super::identity::lacks_real_name;

/// Phones shorter than this are extensions or typos, never matched.
const MIN_PHONE_DIGITS: usize = 7;
/// Index key length; enough to ignore country and trunk prefixes.
const PHONE_KEY_DIGITS: usize = 10;

fn phone_key(phone: &str) -> String {
    let digits = normalize_phone(phone, false);
    let skip = digits.len().saturating_sub(PHONE_KEY_DIGITS);
    digits[skip..].to_string()
}

/// Usable phones of a row, first occurrence kept when two normalize alike.
fn row_phones(row: &ContactRow) -> Vec<String> {
    let mut seen = HashSet::new();
    [row.phone1.as_str(), row.phone2.as_str()]
        .into_iter()
        .filter(|p| normalize_phone(p, false).len() >= MIN_PHONE_DIGITS)
        .filter(|p| seen.insert(normalize_phone(p, false)))
        .map(|p| normalize_phone(p, true))
        .collect()
}

/// Contacts of one team indexed by phone key and name key. Entries point
/// into `contacts`, so an update made through the index is visible to every
/// later lookup in the same run.
#[derive(Debug, Default)]
pub struct ContactIndex {
    contacts: Vec<Contact>,
    by_phone: HashMap<String, Vec<usize>>,
    by_name: HashMap<String, Vec<usize>>,
}

impl ContactIndex {
    pub fn new(contacts: Vec<Contact>) -> Self {
        let mut index = Self {
            contacts,
            ..Self::default()
        };
        for slot in 0..index.contacts.len() {
            index.reindex(slot);
        }
        index
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    pub fn get(&self, slot: usize) -> &Contact {
        &self.contacts[slot]
    }

    /// First contact whose primary or secondary phone matches one of `phones`.
    pub fn match_phone(&self, phones: &[String]) -> Option<usize> {
        phones.iter().find_map(|phone| {
            let key = phone_key(phone);
            self.by_phone.get(&key)?.iter().copied().find(|&slot| {
                let c = &self.contacts[slot];
                [c.phone.as_deref(), c.phone2.as_deref()]
                    .into_iter()
                    .flatten()
                    .any(|stored| is_real_phone(Some(stored)) && phones_match(stored, phone))
            })
        })
    }

    /// Contact with the same name key; one that already has a real phone
    /// wins a tie.
    pub fn match_name(&self, name: &str) -> Option<usize> {
        let key = name_key(name);
        let current: Vec<usize> = self
            .by_name
            .get(&key)?
            .iter()
            .copied()
            .filter(|&slot| name_key(&self.contacts[slot].name) == key)
            .collect();
        current
            .iter()
            .copied()
            .find(|&slot| self.contacts[slot].has_real_phone())
            .or_else(|| current.first().copied())
    }

    /// Replace the contact in `slot` and index its new keys. Old keys stay,
    /// lookups re-check the stored phones and name.
    pub fn update(&mut self, slot: usize, contact: Contact) {
        self.contacts[slot] = contact;
        self.reindex(slot);
    }

    fn reindex(&mut self, slot: usize) {
        let contact = &self.contacts[slot];
        let phone_keys: Vec<String> = [contact.phone.as_deref(), contact.phone2.as_deref()]
            .into_iter()
            .flatten()
            .filter(|p| is_real_phone(Some(*p)))
            .map(phone_key)
            .filter(|k| !k.is_empty())
            .collect();
        let name = name_key(&contact.name);

        for key in phone_keys {
            push_unique(self.by_phone.entry(key).or_default(), slot);
        }
        if !name.is_empty() {
            push_unique(self.by_name.entry(name).or_default(), slot);
        }
    }
}

fn push_unique(slots: &mut Vec<usize>, slot: usize) {
    if !slots.contains(&slot) {
        slots.push(slot);
    }
}

pub struct ContactReconciler {
    db: Arc<dyn DatabaseBackend>,
}

impl ContactReconciler {
    pub fn new(db: Arc<dyn DatabaseBackend>) -> Self {
        Self { db }
    }

    /// Reconcile an address-book export for `team_id` inside one
    /// transaction. A dry run reports the same stats and rolls back.
    pub async fn reconcile(
        &self,
        team_id: i64,
        bytes: &[u8],
        dry_run: bool,
    ) -> Result<ReconcileStats> {
        let rows = read_contact_rows(bytes)?;
        tracing::info!(team_id, rows = rows.len(), dry_run, "Starting contact reconciliation");

        let tx = self.db.begin().await?;
        let outcome = reconcile_rows(&*tx, team_id, &rows).await;

        let mut stats = match outcome {
            Ok(stats) => stats,
            Err(e) => {
                tracing::error!(team_id, error = %e, "Contact reconciliation failed");
                if let Err(rollback) = tx.rollback().await {
                    tracing::warn!(error = %rollback, "Rollback after failed reconciliation also failed");
                }
                return Err(e);
            }
        };

        stats.dry_run = dry_run;
        if dry_run {
            tx.rollback().await?;
        } else {
            tx.commit().await?;
        }

        tracing::info!(
            team_id,
            rows = stats.rows,
            by_phone = stats.matched_by_phone,
            by_name = stats.matched_by_name,
            unmatched = stats.unmatched,
            updated = stats.contacts_updated,
            renamed = stats.chats_renamed,
            dry_run,
            "Contact reconciliation finished"
        );
        Ok(stats)
    }
}

/// Match every row against the team's contacts and apply the backfills.
pub async fn reconcile_rows<S: Store + ?Sized>(
    store: &S,
    team_id: i64,
    rows: &[ContactRow],
) -> Result<ReconcileStats> {
    let mut index = ContactIndex::new(store.list_contacts(team_id).await?);
    let mut stats = ReconcileStats::default();
    tracing::debug!(team_id, contacts = index.len(), "Indexed contacts");

    for row in rows {
        stats.rows += 1;
        let name = strip_numeric_prefix(&row.name);
        if name.is_empty() {
            continue;
        }

        let phones = row_phones(row);
        if phones.is_empty() {
            stats.rows_without_phones += 1;
        }

        let slot = match index.match_phone(&phones) {
            Some(slot) => {
                stats.matched_by_phone += 1;
                slot
            }
            None => match index.match_name(&name) {
                Some(slot) => {
                    stats.matched_by_name += 1;
                    slot
                }
                None => {
                    stats.unmatched += 1;
                    tracing::debug!(name = %name, "No contact for address-book row");
                    continue;
                }
            },
        };

        let mut contact = index.get(slot).clone();
        if backfill(&mut contact, &name, &phones) {
            store.update_contact(&contact).await?;
            stats.contacts_updated += 1;
            index.update(slot, contact.clone());
        }
        stats.chats_renamed += propagate_name(store, &contact).await?;
    }

    Ok(stats)
}

/// Fold a matched row into the contact. Returns whether anything changed.
fn backfill(contact: &mut Contact, csv_name: &str, phones: &[String]) -> bool {
    let mut changed = false;

    let name = if contact.status == ContactStatus::PhoneOnly || lacks_real_name(&contact.name) {
        if contact.status == ContactStatus::PhoneOnly {
            contact.status = ContactStatus::Named;
            changed = true;
        }
        csv_name.to_string()
    } else {
        strip_numeric_prefix(&contact.name)
    };
    if !name.is_empty() && name != contact.name {
        contact.name = name;
        changed = true;
    }

    if let Some(first) = phones.first() {
        if !contact.has_real_phone() {
            contact.phone = Some(first.clone());
            changed = true;
        }
    }
    if let Some(second) = phones.get(1) {
        let primary_differs = !contact
            .phone
            .as_deref()
            .is_some_and(|p| phones_match(p, second));
        let slot_free = contact.phone2.as_deref().map_or(true, |p| p.trim().is_empty());
        if primary_differs && slot_free {
            contact.phone2 = Some(second.clone());
            changed = true;
        }
    }

    changed
}

/// Give every chat on one of the contact's numbers the contact's name.
/// Returns how many chats actually changed.
async fn propagate_name<S: Store + ?Sized>(store: &S, contact: &Contact) -> Result<usize> {
    let mut seen = HashSet::new();
    let mut renamed = 0;

    for phone in [contact.phone.as_deref(), contact.phone2.as_deref()]
        .into_iter()
        .flatten()
        .filter(|p| is_real_phone(Some(*p)))
    {
        let key = phone_key(phone);
        if key.len() < MIN_PHONE_DIGITS {
            continue;
        }
        for chat in store.find_chats_by_number_suffix(contact.team_id, &key).await? {
            if !seen.insert(chat.id) || !phones_match(&chat.number, phone) {
                continue;
            }
            if chat.name != contact.name {
                store
                    .update_chat_identity(chat.id, &contact.name, &chat.number)
                    .await?;
                tracing::debug!(chat_id = chat.id, from = %chat.name, to = %contact.name, "Renamed chat");
                renamed += 1;
            }
        }
    }

    Ok(renamed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::db::{ChatStore, ContactStore, Database, LibSqlBackend};
    use crate::models::Chat;
    use pretty_assertions::assert_eq;

    fn contact(id: i64, name: &str, phone: Option<&str>) -> Contact {
        let mut c = Contact::new(1, name.into(), phone.map(str::to_string), ContactStatus::Named);
        c.id = id;
        c
    }

    fn row(name: &str, phone1: &str, phone2: &str) -> ContactRow {
        ContactRow {
            name: name.into(),
            phone1: phone1.into(),
            phone2: phone2.into(),
        }
    }

    #[test]
    fn test_phone_key_and_row_phones() {
        assert_eq!(phone_key("+54 9 261 276-7072"), "2612767072");
        assert_eq!(phone_key("4251234"), "4251234");

        let phones = row_phones(&row("x", "261 276 7072", "2612767072"));
        assert_eq!(phones, vec!["2612767072".to_string()]);
        assert!(row_phones(&row("x", "123", "")).is_empty());
    }

    #[test]
    fn test_index_name_tie_prefers_real_phone() {
        let index = ContactIndex::new(vec![
            contact(1, "Juan Perez", None),
            contact(2, "JUAN PÉREZ", Some("2612767072")),
        ]);
        assert_eq!(index.match_name("001 juan perez").map(|s| index.get(s).id), Some(2));
    }

    #[test]
    fn test_index_sees_backfilled_phone() {
        let mut index = ContactIndex::new(vec![contact(1, "Juan Perez", None)]);
        let phones = vec!["2612767072".to_string()];
        assert!(index.match_phone(&phones).is_none());

        let mut updated = index.get(0).clone();
        updated.phone = Some("2612767072".into());
        index.update(0, updated);
        assert_eq!(index.match_phone(&["+5492612767072".to_string()]), Some(0));
    }

    #[test]
    fn test_index_forgets_old_name_after_rename() {
        let mut index = ContactIndex::new(vec![contact(1, "Juan", Some("2612767072"))]);
        assert_eq!(index.match_name("Juan"), Some(0));

        let mut renamed = index.get(0).clone();
        renamed.name = "Juan Perez".into();
        index.update(0, renamed);

        assert!(index.match_name("Juan").is_none());
        assert_eq!(index.match_name("Juan Perez"), Some(0));
    }

    #[test]
    fn test_backfill_rules() {
        let mut c = contact(1, "001 Juan Perez", Some("2612767072"));
        let changed = backfill(&mut c, "Juan Perez", &["2612767072".into(), "2615550000".into()]);
        assert!(changed);
        assert_eq!(c.name, "Juan Perez");
        assert_eq!(c.phone.as_deref(), Some("2612767072"));
        assert_eq!(c.phone2.as_deref(), Some("2615550000"));

        assert!(!backfill(&mut c, "Juan Perez", &["2612767072".into(), "2619999999".into()]));
        assert_eq!(c.phone2.as_deref(), Some("2615550000"));

        let mut phone_only = Contact::new(1, "+54 9 261 276-7072".into(), Some("+5492612767072".into()), ContactStatus::PhoneOnly);
        assert!(backfill(&mut phone_only, "Juan Perez", &[]));
        assert_eq!(phone_only.name, "Juan Perez");
        assert_eq!(phone_only.status, ContactStatus::Named);
    }

    #[tokio::test]
    async fn test_reconcile_matches_and_renames() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("file:{}", dir.path().join("reconcile.db").display());
        let db = LibSqlBackend::new(Database::new(&DatabaseConfig::local(url)).await.unwrap());

        let existing = Contact::new(1, "+54 9 261 276-7072".into(), Some("+5492612767072".into()), ContactStatus::PhoneOnly);
        let contact_id = db.create_contact(&existing).await.unwrap();
        let chat_id = db
            .create_chat(&Chat::new(1, "+54 9 261 276-7072".into(), Some("+5492612767072".into())))
            .await
            .unwrap();

        let rows = vec![
            row("001 Juan Perez", "261 276 7072", ""),
            row("Nadie", "111 222 3333", ""),
            row("   ", "", ""),
        ];
        let stats = reconcile_rows(&db, 1, &rows).await.unwrap();

        assert_eq!(stats.rows, 3);
        assert_eq!(stats.matched_by_phone, 1);
        assert_eq!(stats.unmatched, 1);
        assert_eq!(stats.contacts_updated, 1);
        assert_eq!(stats.chats_renamed, 1);

        assert_eq!(db.get_contact(contact_id).await.unwrap().unwrap().name, "Juan Perez");
        assert_eq!(db.get_chat(chat_id).await.unwrap().unwrap().name, "Juan Perez");

        let again = reconcile_rows(&db, 1, &rows[..1]).await.unwrap();
        assert_eq!(again.contacts_updated, 0);
        assert_eq!(again.chats_renamed, 0);
    }

    #[tokio::test]
    async fn test_dry_run_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("file:{}", dir.path().join("dry.db").display());
        let backend = Arc::new(LibSqlBackend::new(
            Database::new(&DatabaseConfig::local(url)).await.unwrap(),
        ));
        let id = backend
            .create_contact(&Contact::new(1, "001 Ana".into(), None, ContactStatus::Named))
            .await
            .unwrap();

        let reconciler = ContactReconciler::new(backend.clone());
        let csv = "First Name,Phone 1 - Value\n001 Ana,2615550000\n";
        let stats = reconciler.reconcile(1, csv.as_bytes(), true).await.unwrap();
        assert!(stats.dry_run);
        assert_eq!(stats.matched_by_name, 1);
        assert_eq!(stats.contacts_updated, 1);

        let untouched = backend.get_contact(id).await.unwrap().unwrap();
        assert_eq!(untouched.name, "001 Ana");
        assert_eq!(untouched.phone, None);

        reconciler.reconcile(1, csv.as_bytes(), false).await.unwrap();
        let updated = backend.get_contact(id).await.unwrap().unwrap();
        assert_eq!(updated.name, "Ana");
        assert_eq!(updated.phone.as_deref(), Some("2615550000"));
    }
}
