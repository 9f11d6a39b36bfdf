//! Knowledge store trait — the append-only text log behind prompt
//! augmentation.
//!
//! The store is a flat sequence of text blocks. It only ever grows: blocks
//! are appended after ingestion and the whole log is read back when a prompt
//! is assembled. There is no delete, compaction, or search.

use crate::error::KnowledgeError;
use async_trait::async_trait;

/// Separator written after every appended block.
pub const BLOCK_SEPARATOR: &str = "\n\n";

#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Backend name (e.g., "file", "in_memory").
    fn name(&self) -> &str;

    /// Read the full log. A store that was never written reads as empty.
    async fn read_all(&self) -> Result<String, KnowledgeError>;

    /// Append raw text to the end of the log.
    ///
    /// Appends are serialised: concurrent callers never overwrite each other.
    async fn append(&self, text: &str) -> Result<(), KnowledgeError>;

    /// Append a block followed by [`BLOCK_SEPARATOR`].
    async fn append_block(&self, block: &str) -> Result<(), KnowledgeError> {
        let mut text = String::with_capacity(block.len() + BLOCK_SEPARATOR.len());
        text.push_str(block);
        text.push_str(BLOCK_SEPARATOR);
        self.append(&text).await
    }

    /// Current size of the log in bytes.
    async fn size_bytes(&self) -> Result<u64, KnowledgeError> {
        Ok(self.read_all().await?.len() as u64)
    }
}
