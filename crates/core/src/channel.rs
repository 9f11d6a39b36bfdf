//! Channel trait — the abstraction over chat platforms.
//!
//! A Channel connects lorebot to a messaging platform (Telegram, a local
//! terminal). It yields inbound events, sends replies back to the same chat,
//! and resolves document handles into bytes.

use crate::error::ChannelError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Unique identifier for a channel instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub String);

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message received from a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelMessage {
    /// The channel this message belongs to
    pub channel_id: ChannelId,

    /// Sender identifier (platform-specific user ID)
    pub sender_id: String,

    /// Human-readable sender name (if available)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,

    /// The text content (empty for bare document uploads)
    pub content: String,

    /// The chat/group/DM identifier within the channel
    pub chat_id: String,

    /// Platform message ID, used to thread the reply
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,

    /// Attachments (documents, images, ...)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

impl ChannelMessage {
    /// The bot command this message carries, if any.
    ///
    /// `/start`, `/help@my_bot` and `/help extra words` all yield the bare
    /// command name (`start`, `help`).
    pub fn command(&self) -> Option<&str> {
        let first = self.content.trim_start().split_whitespace().next()?;
        let name = first.strip_prefix('/')?;
        let name = name.split('@').next().unwrap_or(name);
        if name.is_empty() { None } else { Some(name) }
    }

    /// The first document attachment, if any.
    pub fn document(&self) -> Option<&Attachment> {
        self.attachments
            .iter()
            .find(|a| a.kind == AttachmentKind::Document)
    }
}

/// An attachment in a channel message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    /// Type of attachment
    pub kind: AttachmentKind,

    /// Platform file handle (Telegram `file_id`, local path for the CLI)
    pub handle: String,

    /// Optional filename
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    /// MIME type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// File size in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    Document,
    Image,
    Other,
}

/// The core Channel trait.
///
/// Implementations handle platform-specific polling, message formatting,
/// and authentication.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable channel name (e.g., "telegram", "cli").
    fn name(&self) -> &str;

    /// Unique ID for this channel instance.
    fn id(&self) -> &ChannelId;

    /// Start listening for incoming messages.
    ///
    /// Returns a receiver that yields incoming messages. The channel
    /// implementation handles polling internally.
    async fn start(
        &self,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<ChannelMessage, ChannelError>>,
        ChannelError,
    >;

    /// Send a reply to a specific chat.
    async fn send(
        &self,
        chat_id: &str,
        content: &str,
        reply_to: Option<&str>,
    ) -> std::result::Result<(), ChannelError>;

    /// Send a typing indicator (if the platform supports it).
    async fn send_typing(&self, _chat_id: &str) -> std::result::Result<(), ChannelError> {
        Ok(()) // No-op default
    }

    /// Download the bytes behind an attachment handle.
    async fn fetch_file(
        &self,
        attachment: &Attachment,
    ) -> std::result::Result<Vec<u8>, ChannelError> {
        Err(ChannelError::NotConfigured(format!(
            "Channel '{}' cannot fetch file {}",
            self.name(),
            attachment.handle
        )))
    }

    /// Check if a sender is allowed (allowlist check).
    fn is_allowed(&self, sender_id: &str) -> bool;

    /// Stop the channel gracefully.
    async fn stop(&self) -> std::result::Result<(), ChannelError> {
        Ok(())
    }

    /// Health check — is the channel connected and operational?
    async fn health_check(&self) -> std::result::Result<bool, ChannelError> {
        Ok(true)
    }
}

/// Shared allowlist semantics: empty denies all, `*` allows all.
pub fn allowlist_permits(allowed: &[String], sender_id: &str) -> bool {
    if allowed.is_empty() {
        return false;
    }
    allowed.iter().any(|u| u == "*" || u == sender_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_message(content: &str) -> ChannelMessage {
        ChannelMessage {
            channel_id: ChannelId("telegram".into()),
            sender_id: "12345".into(),
            sender_name: Some("Alice".into()),
            content: content.into(),
            chat_id: "67890".into(),
            message_id: None,
            attachments: vec![],
        }
    }

    #[test]
    fn command_parsing() {
        assert_eq!(text_message("/start").command(), Some("start"));
        assert_eq!(text_message("/help@lore_bot").command(), Some("help"));
        assert_eq!(text_message("  /help me please").command(), Some("help"));
        assert_eq!(text_message("hello /start").command(), None);
        assert_eq!(text_message("/").command(), None);
        assert_eq!(text_message("").command(), None);
    }

    #[test]
    fn document_lookup_skips_other_kinds() {
        let mut msg = text_message("");
        msg.attachments.push(Attachment {
            kind: AttachmentKind::Image,
            handle: "photo-1".into(),
            filename: None,
            mime_type: Some("image/jpeg".into()),
            size_bytes: None,
        });
        assert!(msg.document().is_none());

        msg.attachments.push(Attachment {
            kind: AttachmentKind::Document,
            handle: "doc-1".into(),
            filename: Some("notes.txt".into()),
            mime_type: Some("text/plain".into()),
            size_bytes: Some(16),
        });
        assert_eq!(msg.document().unwrap().handle, "doc-1");
    }

    #[test]
    fn allowlist_rules() {
        assert!(!allowlist_permits(&[], "anyone"));
        assert!(allowlist_permits(&["*".into()], "anyone"));
        let list = vec!["alice".to_string(), "bob".to_string()];
        assert!(allowlist_permits(&list, "bob"));
        assert!(!allowlist_permits(&list, "eve"));
    }
}
