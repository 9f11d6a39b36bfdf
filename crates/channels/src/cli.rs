//! CLI channel — interactive terminal-based chat.
//!
//! Reads lines from stdin and prints replies to stdout. Used by
//! `lorebot chat` to try the bot without a Telegram token.
//!
//! `/upload <path>` turns a local file into a document event, so ingestion
//! can be exercised from the terminal too.

use async_trait::async_trait;
use lorebot_core::channel::{Attachment, AttachmentKind, Channel, ChannelId, ChannelMessage};
use lorebot_core::error::ChannelError;
use std::path::Path;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

const SENDER_ID: &str = "local_user";
const CHAT_ID: &str = "cli_session";

/// Interactive CLI channel for terminal-based chat.
pub struct CliChannel {
    id: ChannelId,
}

impl CliChannel {
    pub fn new() -> Self {
        Self {
            id: ChannelId("cli".into()),
        }
    }
}

impl Default for CliChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the event for one input line. `None` for blank lines.
pub fn line_to_message(channel_id: &ChannelId, line: &str) -> Option<ChannelMessage> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let attachments = match line.strip_prefix("/upload ") {
        Some(path) => {
            let path = path.trim();
            let filename = Path::new(path)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned());
            vec![Attachment {
                kind: AttachmentKind::Document,
                handle: path.to_string(),
                filename,
                mime_type: None,
                size_bytes: None,
            }]
        }
        None => vec![],
    };

    Some(ChannelMessage {
        channel_id: channel_id.clone(),
        sender_id: SENDER_ID.into(),
        sender_name: Some("User".into()),
        content: if attachments.is_empty() {
            line.to_string()
        } else {
            String::new()
        },
        chat_id: CHAT_ID.into(),
        message_id: None,
        attachments,
    })
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    fn id(&self) -> &ChannelId {
        &self.id
    }

    async fn start(
        &self,
    ) -> Result<mpsc::Receiver<Result<ChannelMessage, ChannelError>>, ChannelError> {
        let (tx, rx) = mpsc::channel(32);
        let channel_id = self.id.clone();

        tokio::spawn(async move {
            let reader = BufReader::new(io::stdin());
            let mut lines = reader.lines();

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if matches!(line.trim(), "exit" | "quit" | "/exit" | "/quit" | ":q") {
                            break;
                        }

                        let Some(msg) = line_to_message(&channel_id, &line) else {
                            continue;
                        };
                        if tx.send(Ok(msg)).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF (Ctrl+D)
                    Err(e) => {
                        let _ = tx.send(Err(ChannelError::ConnectionLost(e.to_string()))).await;
                        break;
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn send(
        &self,
        _chat_id: &str,
        content: &str,
        _reply_to: Option<&str>,
    ) -> Result<(), ChannelError> {
        println!("\n🤖 {content}\n");
        Ok(())
    }

    async fn fetch_file(&self, attachment: &Attachment) -> Result<Vec<u8>, ChannelError> {
        tokio::fs::read(&attachment.handle)
            .await
            .map_err(|e| ChannelError::FileFetchFailed {
                handle: attachment.handle.clone(),
                reason: e.to_string(),
            })
    }

    fn is_allowed(&self, _sender_id: &str) -> bool {
        true // local user
    }
}
