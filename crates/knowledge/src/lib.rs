//! Knowledge store implementations for lorebot.

pub mod file_backend;
pub mod in_memory;

pub use file_backend::FileKnowledgeStore;
pub use in_memory::InMemoryKnowledgeStore;
