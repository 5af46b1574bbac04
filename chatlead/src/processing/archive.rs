//! Chat export archives: entry listing, extraction and the identity encoded
//! in the archive's own file name.

use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use zip::ZipArchive;

use super::normalize::normalize_phone;
use crate::error::Result;
use crate::models::ContactStatus;

const TRANSCRIPT_EXTENSION: &str = ".txt";

/// Read side of an archive container.
pub trait ArchiveSource {
    /// Entry names in container order, directories excluded.
    fn list_entries(&mut self) -> Result<Vec<String>>;

    fn extract_all(&mut self, dir: &Path) -> Result<()>;
}

pub struct ZipArchiveSource<R: Read + Seek> {
    archive: ZipArchive<R>,
}

impl ZipArchiveSource<File> {
    pub fn open(path: &Path) -> Result<Self> {
        Self::new(File::open(path)?)
    }
}

impl<R: Read + Seek> ZipArchiveSource<R> {
    pub fn new(reader: R) -> Result<Self> {
        Ok(Self {
            archive: ZipArchive::new(reader)?,
        })
    }
}

impl<R: Read + Seek> ArchiveSource for ZipArchiveSource<R> {
    fn list_entries(&mut self) -> Result<Vec<String>> {
        let mut entries = Vec::with_capacity(self.archive.len());
        for i in 0..self.archive.len() {
            let file = self.archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            // Entries that would escape the extraction root are never written.
            match file.enclosed_name() {
                Some(path) => entries.push(path.to_string_lossy().replace('\\', "/")),
                None => tracing::warn!(entry = %file.name(), "Skipping unsafe archive entry"),
            }
        }
        Ok(entries)
    }

    fn extract_all(&mut self, dir: &Path) -> Result<()> {
        self.archive.extract(dir)?;
        Ok(())
    }
}

/// The transcript is the first entry with a text extension.
pub fn find_transcript(entries: &[String]) -> Option<&str> {
    entries
        .iter()
        .map(String::as_str)
        .find(|name| name.to_lowercase().ends_with(TRANSCRIPT_EXTENSION))
}

/// Counterparty identity as the exporter encoded it in the archive name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveIdentity {
    pub name: String,
    pub phone: Option<String>,
    pub status: ContactStatus,
}

/// Derive name/phone/status from an archive file name such as
/// `Chat de WhatsApp con +54 9 261 276-7072.zip`.
///
/// Any letter makes it a named contact (`149 LUIS JESUS TOSI` included). A
/// bare phone-like string with at least `min_phone_digits` digits is an
/// unsaved number. Everything else falls back to a named contact.
pub fn classify_archive_name(
    filename: &str,
    prefix: &str,
    min_phone_digits: usize,
) -> ArchiveIdentity {
    let name = strip_extension_and_prefix(filename, prefix);

    let named = |name: String| ArchiveIdentity {
        name,
        phone: None,
        status: ContactStatus::Named,
    };

    if name.is_empty() || name.chars().any(char::is_alphabetic) {
        return named(name);
    }

    if is_phone_like(&name) {
        let phone = normalize_phone(&name, true);
        if phone.trim_start_matches('+').len() >= min_phone_digits {
            return ArchiveIdentity {
                name,
                phone: Some(phone),
                status: ContactStatus::PhoneOnly,
            };
        }
    }

    named(name)
}

fn strip_extension_and_prefix(filename: &str, prefix: &str) -> String {
    let base = Path::new(filename.trim())
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = Path::new(base.trim())
        .file_stem()
        .map(|s| s.to_string_lossy().trim().to_string())
        .unwrap_or_default();
    match stem.strip_prefix(prefix) {
        Some(rest) => rest.trim().to_string(),
        None => stem,
    }
}

fn is_phone_like(s: &str) -> bool {
    let body = s.strip_prefix('+').unwrap_or(s);
    !body.is_empty()
        && body
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_whitespace() || matches!(c, '-' | '(' | ')'))
}
