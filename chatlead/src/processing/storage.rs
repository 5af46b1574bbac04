use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::models::{MediaKind, StoredFile};

/// Permanent media storage laid out as
/// `<root>/team_<team>/chat_<chat>/<kind>/<filename>`.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn chat_dir(&self, team_id: i64, chat_id: i64) -> PathBuf {
        self.root
            .join(format!("team_{team_id}"))
            .join(format!("chat_{chat_id}"))
    }

    /// Copy `src` into the chat's media directory. An existing file of the
    /// same name is never overwritten; the copy gets a `__N` suffix instead.
    ///
    /// A missing source surfaces as `ChatleadError::Io` with
    /// `ErrorKind::NotFound`, which callers treat as skippable.
    pub fn store_media_file(&self, src: &Path, team_id: i64, chat_id: i64) -> Result<StoredFile> {
        let filename = src
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("not a file path: {}", src.display()),
                )
            })?;

        let mime_type = mime_guess::from_path(&filename)
            .first()
            .map(|m| m.essence_str().to_string());
        let kind = MediaKind::from_mime(mime_type.as_deref());

        let dest_dir = self.chat_dir(team_id, chat_id).join(kind.to_string());
        std::fs::create_dir_all(&dest_dir)?;
        let dest = free_destination(&dest_dir, &filename);

        std::fs::copy(src, &dest)?;
        let size = std::fs::metadata(&dest)?.len() as i64;

        tracing::debug!(
            src = %src.display(),
            dest = %dest.display(),
            kind = %kind,
            size,
            "Stored media file"
        );

        Ok(StoredFile {
            filename: dest
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or(filename),
            path: dest.to_string_lossy().into_owned(),
            mime_type,
            size,
            kind,
        })
    }
}

fn free_destination(dir: &Path, filename: &str) -> PathBuf {
    let candidate = dir.join(filename);
    if !candidate.exists() {
        return candidate;
    }

    let as_path = Path::new(filename);
    let stem = as_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_string());
    let extension = as_path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    (2..)
        .map(|i| dir.join(format!("{stem}__{i}{extension}")))
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChatleadError;
    use pretty_assertions::assert_eq;

    fn source(dir: &Path, name: &str, body: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_store_layout_and_kind() {
        let src_dir = tempfile::tempdir().unwrap();
        let media = tempfile::tempdir().unwrap();
        let store = MediaStore::new(media.path());

        let src = source(src_dir.path(), "IMG-001.jpg", b"jpeg-bytes");
        let stored = store.store_media_file(&src, 3, 42).unwrap();

        assert_eq!(stored.filename, "IMG-001.jpg");
        assert_eq!(stored.kind, MediaKind::Image);
        assert_eq!(stored.mime_type.as_deref(), Some("image/jpeg"));
        assert_eq!(stored.size, 10);
        let expected = media.path().join("team_3").join("chat_42").join("image").join("IMG-001.jpg");
        assert_eq!(PathBuf::from(&stored.path), expected);
        assert!(expected.exists());
    }

    #[test]
    fn test_store_never_overwrites() {
        let src_dir = tempfile::tempdir().unwrap();
        let media = tempfile::tempdir().unwrap();
        let store = MediaStore::new(media.path());
        let src = source(src_dir.path(), "DOC-001.pdf", b"pdf");

        let first = store.store_media_file(&src, 1, 1).unwrap();
        let second = store.store_media_file(&src, 1, 1).unwrap();
        let third = store.store_media_file(&src, 1, 1).unwrap();

        assert_eq!(first.filename, "DOC-001.pdf");
        assert_eq!(second.filename, "DOC-001__2.pdf");
        assert_eq!(third.filename, "DOC-001__3.pdf");
        assert_eq!(first.kind, MediaKind::File);
    }

    #[test]
    fn test_store_unknown_extension_is_file() {
        let src_dir = tempfile::tempdir().unwrap();
        let media = tempfile::tempdir().unwrap();
        let store = MediaStore::new(media.path());
        let src = source(src_dir.path(), "blob", b"?");

        let stored = store.store_media_file(&src, 1, 2).unwrap();
        assert_eq!(stored.kind, MediaKind::File);
        assert_eq!(stored.mime_type, None);
    }

    #[test]
    fn test_store_missing_source_is_not_found() {
        let media = tempfile::tempdir().unwrap();
        let store = MediaStore::new(media.path());

        let err = store
            .store_media_file(Path::new("/nonexistent/PTT-001.opus"), 1, 1)
            .unwrap_err();
        match err {
            ChatleadError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
