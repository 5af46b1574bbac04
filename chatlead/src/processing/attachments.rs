//! Linking transcript messages to the media files extracted next to them.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;
use walkdir::WalkDir;

use crate::error::Result;

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)[\w\-\(\)]+?\.(?:jpg|jpeg|png|gif|webp|mp4|mov|mkv|mp3|wav|m4a|opus|ogg|pdf|doc|docx|xls|xlsx|ppt|pptx|txt|zip|rar)\b",
        )
        .expect("attachment token pattern is valid")
    })
}

/// Directionality marks and the BOM, which exporters sprinkle around file names.
fn is_invisible_mark(c: char) -> bool {
    matches!(
        c,
        '\u{200E}' | '\u{200F}' | '\u{202A}'..='\u{202E}' | '\u{2066}'..='\u{2069}' | '\u{FEFF}'
    )
}

/// Comparison form for file names and the text that mentions them.
pub fn clean_for_match(s: &str) -> String {
    s.chars()
        .filter(|c| !is_invisible_mark(*c))
        .nfc()
        .flat_map(char::to_lowercase)
        .collect()
}

/// Flat basename index of an extraction directory.
#[derive(Debug, Default, Clone)]
pub struct AttachmentIndex {
    files: HashMap<String, PathBuf>,
    collisions: BTreeSet<String>,
}

impl AttachmentIndex {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn get(&self, filename: &str) -> Option<&Path> {
        self.files.get(filename).map(PathBuf::as_path)
    }

    /// Basenames seen more than once. The last walked file is the one indexed.
    pub fn collisions(&self) -> Vec<String> {
        self.collisions.iter().cloned().collect()
    }

    fn insert(&mut self, filename: String, path: PathBuf) {
        if let Some(previous) = self.files.insert(filename.clone(), path) {
            tracing::warn!(
                filename = %filename,
                replaced = %previous.display(),
                "Attachment basename collision, keeping the last file"
            );
            self.collisions.insert(filename);
        }
    }
}

/// Walk `dir` and index every regular file by basename, skipping `exclude`
/// (the transcript). Entries are walked in file-name order so collision
/// outcomes are stable across runs.
pub fn index_extracted_files(dir: &Path, exclude: Option<&Path>) -> Result<AttachmentIndex> {
    let exclude = exclude.map(|p| p.canonicalize().unwrap_or_else(|_| p.to_path_buf()));
    let mut index = AttachmentIndex::default();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry
            .path()
            .canonicalize()
            .unwrap_or_else(|_| entry.path().to_path_buf());
        if exclude.as_deref() == Some(path.as_path()) {
            continue;
        }
        let filename = entry.file_name().to_string_lossy().into_owned();
        index.insert(filename, path);
    }

    tracing::debug!(dir = %dir.display(), files = index.len(), "Indexed extracted files");
    Ok(index)
}

/// Every indexed file whose name occurs in `message_text`, in order of first
/// mention and without duplicates.
pub fn resolve_message_attachments(message_text: &str, index: &AttachmentIndex) -> Vec<PathBuf> {
    if message_text.trim().is_empty() || index.is_empty() {
        return Vec::new();
    }
    let haystack = clean_for_match(message_text);

    let mut hits: Vec<(usize, &PathBuf)> = index
        .files
        .iter()
        .filter_map(|(name, path)| {
            let needle = clean_for_match(name);
            if needle.is_empty() {
                return None;
            }
            haystack.find(&needle).map(|pos| (pos, path))
        })
        .collect();
    hits.sort();

    let mut seen = HashSet::new();
    hits.into_iter()
        .filter(|(_, path)| seen.insert(path.as_path()))
        .map(|(_, path)| path.clone())
        .collect()
}

/// Filename-like tokens (`IMG-20240105-WA0001.jpg`) mentioned in a message,
/// whether or not the archive carries them.
pub fn attachment_tokens(message_text: &str) -> Vec<String> {
    let text = clean_for_match(message_text);
    let mut seen = HashSet::new();
    token_pattern()
        .find_iter(&text)
        .map(|m| m.as_str().trim().to_string())
        .filter(|token| !token.is_empty() && seen.insert(token.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn touch(dir: &Path, rel: &str) -> PathBuf {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, rel.as_bytes()).unwrap();
        path.canonicalize().unwrap()
    }

    #[test]
    fn test_index_excludes_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let transcript = touch(dir.path(), "chat.txt");
        let image = touch(dir.path(), "IMG-001.jpg");
        let audio = touch(dir.path(), "media/PTT-002.opus");

        let index = index_extracted_files(dir.path(), Some(&transcript)).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.get("IMG-001.jpg"), Some(image.as_path()));
        assert_eq!(index.get("PTT-002.opus"), Some(audio.as_path()));
        assert!(index.get("chat.txt").is_none());
        assert!(index.collisions().is_empty());
    }

    #[test]
    fn test_index_reports_basename_collisions() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a/IMG-001.jpg");
        let last = touch(dir.path(), "b/IMG-001.jpg");

        let index = index_extracted_files(dir.path(), None).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.get("IMG-001.jpg"), Some(last.as_path()));
        assert_eq!(index.collisions(), vec!["IMG-001.jpg".to_string()]);
    }

    #[test]
    fn test_resolve_first_mention_order_without_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let first = touch(dir.path(), "IMG-002.jpg");
        let second = touch(dir.path(), "DOC-001.pdf");
        let index = index_extracted_files(dir.path(), None).unwrap();

        let text = "IMG-002.jpg (archivo adjunto)\nDOC-001.pdf (archivo adjunto)\nIMG-002.jpg";
        assert_eq!(resolve_message_attachments(text, &index), vec![first, second]);
    }

    #[test]
    fn test_resolve_ignores_direction_marks_and_case() {
        let dir = tempfile::tempdir().unwrap();
        let path = touch(dir.path(), "IMG-003.jpg");
        let index = index_extracted_files(dir.path(), None).unwrap();

        let text = "\u{200E}img-003.JPG\u{200F} (archivo adjunto)";
        assert_eq!(resolve_message_attachments(text, &index), vec![path]);
        assert!(resolve_message_attachments("sin adjuntos", &index).is_empty());
        assert!(resolve_message_attachments("", &index).is_empty());
    }

    #[test]
    fn test_resolve_composed_and_decomposed_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = touch(dir.path(), "presupuesto instalaci\u{00F3}n.pdf");
        let index = index_extracted_files(dir.path(), None).unwrap();

        let text = "presupuesto instalacio\u{0301}n.pdf (archivo adjunto)";
        assert_eq!(resolve_message_attachments(text, &index), vec![path]);
    }

    #[test]
    fn test_attachment_tokens() {
        let tokens = attachment_tokens("\u{200E}IMG-20240105-WA0001.jpg (archivo adjunto)");
        assert_eq!(tokens, vec!["img-20240105-wa0001.jpg".to_string()]);
        assert!(attachment_tokens("hola, cuanto sale?").is_empty());
    }
}
