//! File-based knowledge store — a flat, append-only UTF-8 log.
//!
//! The file is never rewritten or truncated. Each append opens the file in
//! append mode and writes the new block at the end; reads return the whole
//! file. A missing file reads as empty and is created, parent directories
//! included, on the first append.
//!
//! All access goes through one `RwLock`: appends are serialised behind the
//! write guard, and reads share the read guard so an in-process read never
//! observes half of an append.

use async_trait::async_trait;
use lorebot_core::error::KnowledgeError;
use lorebot_core::knowledge::KnowledgeStore;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::debug;

pub struct FileKnowledgeStore {
    path: PathBuf,
    lock: RwLock<()>,
}

impl FileKnowledgeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        debug!(path = %path.display(), "File knowledge store opened");
        Self {
            path,
            lock: RwLock::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_error(&self, e: impl std::fmt::Display) -> KnowledgeError {
        KnowledgeError::Write {
            path: self.path.clone(),
            reason: e.to_string(),
        }
    }
}

#[async_trait]
impl KnowledgeStore for FileKnowledgeStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn read_all(&self) -> Result<String, KnowledgeError> {
        let _guard = self.lock.read().await;
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(KnowledgeError::Read {
                path: self.path.clone(),
                reason: e.to_string(),
            }),
        }
    }

    async fn append(&self, text: &str) -> Result<(), KnowledgeError> {
        let _guard = self.lock.write().await;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.write_error(e))?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.write_error(e))?;

        file.write_all(text.as_bytes())
            .await
            .map_err(|e| self.write_error(e))?;
        file.flush().await.map_err(|e| self.write_error(e))?;

        debug!(path = %self.path.display(), bytes = text.len(), "Appended to knowledge store");
        Ok(())
    }

    async fn size_bytes(&self) -> Result<u64, KnowledgeError> {
        let _guard = self.lock.read().await;
        match tokio::fs::metadata(&self.path).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
            Err(e) => Err(KnowledgeError::Read {
                path: self.path.clone(),
                reason: e.to_string(),
            }),
        }
    }
}
