use libsql::{params, Connection};

use super::parse_timestamp;
use crate::error::Result;
use crate::models::{is_real_phone, Contact, ContactStatus};
use crate::processing::{name_key, normalize_phone};

const CONTACT_COLUMNS: &str = "id, team_id, name, phone, phone2, status, created_at";
const MIN_MATCH_DIGITS: usize = 7;

pub struct ContactRepository;

impl ContactRepository {
    pub async fn create(conn: &Connection, contact: &Contact) -> Result<i64> {
        conn.execute(
            r#"
            INSERT INTO contacts (
                team_id, name, name_key, phone, phone_digits, phone2, status, created_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8
            )
            "#,
            params![
                contact.team_id,
                contact.name.clone(),
                name_key(&contact.name),
                contact.phone.clone(),
                phone_digits(contact.phone.as_deref()),
                contact.phone2.clone(),
                contact.status.as_i64(),
                contact.created_at.to_rfc3339(),
            ],
        )
        .await?;

        Ok(conn.last_insert_rowid())
    }

    pub async fn get_by_id(conn: &Connection, id: i64) -> Result<Option<Contact>> {
        let sql = format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = ?1");
        let mut rows = conn.query(&sql, params![id]).await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_contact(&row)?))
        } else {
            Ok(None)
        }
    }

    pub async fn find_by_phone(conn: &Connection, team_id: i64, phone: &str) -> Result<Option<Contact>> {
        // Too short to tell a suffix from a coincidence.
        let digits = normalize_phone(phone, false);
        if digits.len() < MIN_MATCH_DIGITS {
            return Ok(None);
        }

        let sql = format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts
             WHERE team_id = ?1 AND phone_digits IS NOT NULL AND length(phone_digits) >= 7
               AND (phone_digits LIKE '%' || ?2 OR ?2 LIKE '%' || phone_digits)
             ORDER BY (phone_digits = ?2) DESC, id LIMIT 1"
        );
        let mut rows = conn.query(&sql, params![team_id, digits]).await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_contact(&row)?))
        } else {
            Ok(None)
        }
    }

    pub async fn find_by_name(conn: &Connection, team_id: i64, name: &str) -> Result<Option<Contact>> {
        let key = name_key(name);
        if key.is_empty() {
            return Ok(None);
        }

        let sql = format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts WHERE team_id = ?1 AND name_key = ?2
             ORDER BY (phone_digits IS NOT NULL) DESC, id LIMIT 1"
        );
        let mut rows = conn.query(&sql, params![team_id, key]).await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_contact(&row)?))
        } else {
            Ok(None)
        }
    }

    pub async fn update(conn: &Connection, contact: &Contact) -> Result<()> {
        conn.execute(
            r#"
            UPDATE contacts SET
                name = ?2,
                name_key = ?3,
                phone = ?4,
                phone_digits = ?5,
                phone2 = ?6,
                status = ?7
            WHERE id = ?1
            "#,
            params![
                contact.id,
                contact.name.clone(),
                name_key(&contact.name),
                contact.phone.clone(),
                phone_digits(contact.phone.as_deref()),
                contact.phone2.clone(),
                contact.status.as_i64(),
            ],
        )
        .await?;

        Ok(())
    }

    pub async fn list_by_team(conn: &Connection, team_id: i64) -> Result<Vec<Contact>> {
        let sql = format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE team_id = ?1 ORDER BY id");
        let mut rows = conn.query(&sql, params![team_id]).await?;

        let mut contacts = Vec::new();
        while let Some(row) = rows.next().await? {
            contacts.push(Self::row_to_contact(&row)?);
        }
        Ok(contacts)
    }

    fn row_to_contact(row: &libsql::Row) -> Result<Contact> {
        Ok(Contact {
            id: row.get(0)?,
            team_id: row.get(1)?,
            name: row.get(2)?,
            phone: row.get(3)?,
            phone2: row.get(4)?,
            status: ContactStatus::from_i64(row.get(5)?),
            created_at: parse_timestamp(&row.get::<String>(6)?),
        })
    }
}

fn phone_digits(phone: Option<&str>) -> Option<String> {
    if !is_real_phone(phone) {
        return None;
    }
    let digits = normalize_phone(phone.unwrap_or_default(), false);
    (!digits.is_empty()).then_some(digits)
}
