//! In-memory knowledge store — useful for testing and ephemeral sessions.

use async_trait::async_trait;
use lorebot_core::error::KnowledgeError;
use lorebot_core::knowledge::KnowledgeStore;
use tokio::sync::RwLock;

/// Keeps the knowledge log in a `String`.
#[derive(Default)]
pub struct InMemoryKnowledgeStore {
    content: RwLock<String>,
}

impl InMemoryKnowledgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with existing content.
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            content: RwLock::new(content.into()),
        }
    }
}

#[async_trait]
impl KnowledgeStore for InMemoryKnowledgeStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn read_all(&self) -> Result<String, KnowledgeError> {
        Ok(self.content.read().await.clone())
    }

    async fn append(&self, text: &str) -> Result<(), KnowledgeError> {
        self.content.write().await.push_str(text);
        Ok(())
    }
}
