use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ContactStatus;

/// Placeholder stored instead of a phone number when none is known.
pub const UNKNOWN_PHONE: &str = "desconocido";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Contact {
    pub id: i64,
    pub team_id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub phone2: Option<String>,
    pub status: ContactStatus,
    pub created_at: DateTime<Utc>,
}

impl Contact {
    pub fn new(team_id: i64, name: String, phone: Option<String>, status: ContactStatus) -> Self {
        Self {
            id: 0,
            team_id,
            name,
            phone,
            phone2: None,
            status,
            created_at: Utc::now(),
        }
    }

    /// True when `phone` holds something other than nothing or the placeholder.
    pub fn has_real_phone(&self) -> bool {
        is_real_phone(self.phone.as_deref())
    }
}

/// Placeholders and junk such as "unknown", "n/a" or "-" carry no digits.
pub fn is_real_phone(phone: Option<&str>) -> bool {
    phone.is_some_and(|p| p.chars().any(|c| c.is_ascii_digit()))
}
