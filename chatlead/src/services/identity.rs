//! Contact and chat resolution for an incoming identity.

use crate::db::Store;
use crate::error::Result;
use crate::models::{is_real_phone, Chat, Contact, ContactStatus};
use crate::processing::{phone_suffix, phones_match, strip_numeric_prefix};

/// Digits used to narrow chat candidates before the full phone comparison.
const CHAT_PHONE_SUFFIX_DIGITS: usize = 8;

/// A display name is missing when it carries no letters at all (empty, or
/// just the phone number the exporter fell back to).
pub fn lacks_real_name(name: &str) -> bool {
    !name.chars().any(char::is_alphabetic)
}

/// Find the team's contact by phone, else by name, and fold the new
/// information into it; create one when neither key matches.
///
/// Existing data is only backfilled: a real name or phone is never
/// replaced, and a converted client keeps its status.
pub async fn upsert_contact<S: Store + ?Sized>(
    store: &S,
    team_id: i64,
    name: &str,
    phone: Option<&str>,
    status: ContactStatus,
) -> Result<Contact> {
    let phone = phone.filter(|p| is_real_phone(Some(*p)));

    let mut existing = match phone {
        Some(p) => store.find_contact_by_phone(team_id, p).await?,
        None => None,
    };
    if existing.is_none() {
        existing = store.find_contact_by_name(team_id, name).await?;
    }

    let Some(mut contact) = existing else {
        let mut contact = Contact::new(
            team_id,
            name.trim().to_string(),
            phone.map(str::to_string),
            status,
        );
        contact.id = store.create_contact(&contact).await?;
        tracing::debug!(team_id, contact_id = contact.id, status = %status, "Created contact");
        return Ok(contact);
    };

    let mut changed = false;
    let merged = merge_status(contact.status, status);
    if merged != contact.status {
        contact.status = merged;
        changed = true;
    }
    if let Some(p) = phone {
        if !contact.has_real_phone() {
            contact.phone = Some(p.to_string());
            changed = true;
        }
    }
    if lacks_real_name(&contact.name) && !lacks_real_name(name) {
        contact.name = strip_numeric_prefix(name);
        changed = true;
    }

    if changed {
        store.update_contact(&contact).await?;
        tracing::debug!(team_id, contact_id = contact.id, "Backfilled contact");
    }
    Ok(contact)
}

fn merge_status(current: ContactStatus, incoming: ContactStatus) -> ContactStatus {
    match (current, incoming) {
        (ContactStatus::Client, _) => ContactStatus::Client,
        (ContactStatus::Named, ContactStatus::PhoneOnly) => ContactStatus::Named,
        (_, incoming) => incoming,
    }
}

/// Locate the team's chat for this counterparty, or create it.
///
/// A real phone is compared by suffix against stored numbers first. Then the
/// normalized name is tried, skipping chats that already hold a different
/// real number. A chat found with the placeholder number adopts the real
/// phone. Returns the chat and whether it was created.
pub async fn find_or_create_chat<S: Store + ?Sized>(
    store: &S,
    team_id: i64,
    name: &str,
    phone: Option<&str>,
    created_by: Option<i64>,
) -> Result<(Chat, bool)> {
    let phone = phone.filter(|p| is_real_phone(Some(*p)));

    if let Some(p) = phone {
        let suffix = phone_suffix(p, CHAT_PHONE_SUFFIX_DIGITS);
        let candidates = store.find_chats_by_number_suffix(team_id, &suffix).await?;
        if let Some(chat) = candidates.into_iter().find(|c| phones_match(&c.number, p)) {
            return Ok((chat, false));
        }
    }

    let by_name = store.find_chats_by_name(team_id, name).await?;
    let found = by_name.into_iter().find(|chat| match phone {
        Some(p) => chat.has_placeholder_number() || phones_match(&chat.number, p),
        None => true,
    });

    if let Some(mut chat) = found {
        if let Some(p) = phone {
            if chat.has_placeholder_number() {
                store.update_chat_identity(chat.id, &chat.name, p).await?;
                tracing::info!(team_id, chat_id = chat.id, "Upgraded chat placeholder number");
                chat.number = p.to_string();
            }
        }
        return Ok((chat, false));
    }

    let mut chat = Chat::new(team_id, name.trim().to_string(), phone.map(str::to_string));
    chat.created_by = created_by;
    chat.id = store.create_chat(&chat).await?;
    tracing::debug!(team_id, chat_id = chat.id, "Created chat");
    Ok((chat, true))
}
