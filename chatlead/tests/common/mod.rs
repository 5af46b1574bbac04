// Common test utilities for integration tests
#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};

use chatlead::config::{parse_pipeline_states, DatabaseConfig, ImportConfig, DEFAULT_PIPELINE_STATES};
use chatlead::db::{Database, DatabaseBackend, LibSqlBackend};
use chatlead::processing::MediaStore;
use chatlead::scoring::ScoringEngine;
use chatlead::services::{ChatImporter, ScoreService};
use zip::write::SimpleFileOptions;

static INIT: Once = Once::new();

/// Initialize tracing subscriber once for tests
pub fn init_test_logger() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub const PREFIX: &str = "Chat de WhatsApp con ";

/// A temp-file database with the default pipeline seeded, plus a media root
/// and scratch directory under the same temp dir.
pub struct TestEnv {
    pub dir: tempfile::TempDir,
    pub db: Arc<dyn DatabaseBackend>,
}

impl TestEnv {
    pub async fn new() -> Self {
        init_test_logger();
        let dir = tempfile::tempdir().unwrap();
        let url = format!("file:{}", dir.path().join("chatlead.db").display());
        let backend = LibSqlBackend::new(Database::new(&DatabaseConfig::local(url)).await.unwrap());
        backend
            .seed_pipeline_states(&parse_pipeline_states(DEFAULT_PIPELINE_STATES))
            .await
            .unwrap();
        let db: Arc<dyn DatabaseBackend> = Arc::new(backend);
        Self { dir, db }
    }

    pub fn media_root(&self) -> PathBuf {
        self.dir.path().join("media")
    }

    pub fn scratch_root(&self) -> PathBuf {
        self.dir.path().join("scratch")
    }

    pub async fn importer(&self) -> ChatImporter {
        ChatImporter::new(
            self.db.clone(),
            MediaStore::new(self.media_root()),
            Arc::new(ScoringEngine::default()),
            ScoreService::load(&*self.db).await.unwrap(),
            ImportConfig {
                archive_prefix: PREFIX.to_string(),
                scratch_dir: Some(self.scratch_root()),
                min_phone_digits: 7,
            },
        )
    }

    /// Write a zip archive named `name` into the temp dir.
    pub fn archive(&self, name: &str, entries: &[(&str, &[u8])]) -> PathBuf {
        build_zip(&self.dir.path().join("uploads"), name, entries)
    }
}

pub fn build_zip(dir: &Path, name: &str, entries: &[(&str, &[u8])]) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    let file = std::fs::File::create(&path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default();
    for (entry, body) in entries {
        zip.start_file(*entry, options).unwrap();
        zip.write_all(body).unwrap();
    }
    zip.finish().unwrap();
    path
}

/// Number of regular files under `dir`, zero when it does not exist.
pub fn count_files(dir: &Path) -> usize {
    if !dir.exists() {
        return 0;
    }
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .count()
}
