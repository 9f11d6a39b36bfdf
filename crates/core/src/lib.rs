//! # lorebot core
//!
//! Domain types, traits, and error definitions for lorebot, a chat relay that
//! forwards messages from a messaging platform to an LLM completion service
//! and grows a plain-text knowledge base from uploaded documents.
//!
//! This crate has no framework dependencies. Every boundary the bot talks
//! to is a trait defined here:
//! - [`Provider`] for the completion service
//! - [`Channel`] for the messaging platform
//! - [`KnowledgeStore`] for the append-only knowledge log
//!
//! Implementations live in their own crates, so handlers can be exercised
//! against stubs in tests.

pub mod channel;
pub mod error;
pub mod knowledge;
pub mod message;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use channel::{Attachment, AttachmentKind, Channel, ChannelId, ChannelMessage};
pub use error::{Error, Result};
pub use knowledge::KnowledgeStore;
pub use message::{Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
