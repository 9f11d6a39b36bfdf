//! Telegram channel adapter.
//!
//! Implements the Channel trait over the Telegram Bot API with plain
//! `reqwest` calls:
//! - inbound: `getUpdates` long polling (text messages and documents)
//! - outbound: `sendMessage`, split to fit the 4096-character limit
//! - files: `getFile` + download from `{api_base}/file/bot{token}/{path}`
//!
//! With `polling` disabled the channel never calls `getUpdates`; updates
//! are fed in through [`TelegramChannel::inject_update`] instead.

use async_trait::async_trait;
use lorebot_core::channel::{
    Attachment, AttachmentKind, Channel, ChannelId, ChannelMessage, allowlist_permits,
};
use lorebot_core::error::ChannelError;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Telegram rejects messages longer than this (counted in UTF-16 units).
pub const MAX_MESSAGE_LEN: usize = 4096;

/// Pause between failed `getUpdates` calls.
const POLL_ERROR_PAUSE: Duration = Duration::from_secs(5);

/// Telegram channel configuration.
#[derive(Clone)]
pub struct TelegramConfig {
    /// Bot token from @BotFather.
    pub bot_token: String,
    /// Allowed user IDs. Empty = deny all, ["*"] = allow all.
    pub allowed_users: Vec<String>,
    /// Long-polling timeout for `getUpdates`.
    pub poll_timeout_secs: u64,
    /// Bot API base URL.
    pub api_base: String,
    /// Whether `start()` spawns the `getUpdates` loop.
    pub polling: bool,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"[REDACTED]")
            .field("allowed_users", &self.allowed_users)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("api_base", &self.api_base)
            .field("polling", &self.polling)
            .finish()
    }
}

impl From<&lorebot_config::TelegramConfig> for TelegramConfig {
    fn from(config: &lorebot_config::TelegramConfig) -> Self {
        Self {
            bot_token: config.access_token.clone(),
            allowed_users: config.allowed_users.clone(),
            poll_timeout_secs: config.poll_timeout_secs,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            polling: true,
        }
    }
}

// --- Bot API wire types ---

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<TgMessage>,
}

#[derive(Debug, Deserialize)]
pub struct TgMessage {
    pub message_id: i64,
    #[serde(default)]
    pub from: Option<TgUser>,
    pub chat: TgChat,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub document: Option<TgDocument>,
}

#[derive(Debug, Deserialize)]
pub struct TgUser {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TgChat {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct TgDocument {
    pub file_id: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TgFile {
    #[serde(default)]
    file_path: Option<String>,
}

/// Convert a raw update into a channel message.
///
/// Returns `None` for updates the bot does not handle (edits, stickers,
/// photos without a document, ...).
pub fn update_to_message(channel_id: &ChannelId, update: Update) -> Option<ChannelMessage> {
    let message = update.message?;
    if message.text.is_none() && message.document.is_none() {
        return None;
    }

    let attachments = message
        .document
        .map(|doc| Attachment {
            kind: AttachmentKind::Document,
            handle: doc.file_id,
            filename: doc.file_name,
            mime_type: doc.mime_type,
            size_bytes: doc.file_size,
        })
        .into_iter()
        .collect();

    let (sender_id, sender_name) = match message.from {
        Some(user) => (
            user.id.to_string(),
            user.username.or(Some(user.first_name)).filter(|n| !n.is_empty()),
        ),
        None => (message.chat.id.to_string(), None),
    };

    Some(ChannelMessage {
        channel_id: channel_id.clone(),
        sender_id,
        sender_name,
        content: message.text.or(message.caption).unwrap_or_default(),
        chat_id: message.chat.id.to_string(),
        message_id: Some(message.message_id.to_string()),
        attachments,
    })
}

/// Split `text` into pieces of at most `limit` UTF-16 units, preferring
/// line boundaries.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for line in text.split_inclusive('\n') {
        let line_len: usize = line.encode_utf16().count();
        if current_len + line_len <= limit {
            current.push_str(line);
            current_len += line_len;
            continue;
        }

        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if line_len <= limit {
            current.push_str(line);
            current_len = line_len;
            continue;
        }

        // A single line longer than the limit: hard split on char boundaries.
        for c in line.chars() {
            let c_len = c.len_utf16();
            if current_len + c_len > limit {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            current.push(c);
            current_len += c_len;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks.retain(|c| !c.trim().is_empty());
    chunks
}

/// Thin Bot API client shared by the channel and its polling task.
#[derive(Clone)]
struct BotApi {
    client: reqwest::Client,
    api_base: String,
    token: String,
}

impl BotApi {
    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &serde_json::Value,
        timeout: Option<Duration>,
    ) -> Result<T, ChannelError> {
        let mut request = self.client.post(self.method_url(method)).json(body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ChannelError::ConnectionLost(format!("{method}: {e}")))?;
        let status = response.status();

        let envelope: ApiEnvelope<T> = response.json().await.map_err(|e| {
            ChannelError::InvalidPayload(format!("{method} (status {status}): {e}"))
        })?;

        if !envelope.ok {
            return Err(ChannelError::DeliveryFailed {
                channel: "telegram".into(),
                reason: format!(
                    "{method}: {}",
                    envelope.description.unwrap_or_else(|| status.to_string())
                ),
            });
        }

        envelope
            .result
            .ok_or_else(|| ChannelError::InvalidPayload(format!("{method}: missing result")))
    }

    async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>, ChannelError> {
        let body = serde_json::json!({
            "offset": offset,
            "timeout": timeout_secs,
            "allowed_updates": ["message"],
        });
        self.call(
            "getUpdates",
            &body,
            Some(Duration::from_secs(timeout_secs + 10)),
        )
        .await
    }
}

/// Telegram channel adapter.
pub struct TelegramChannel {
    config: TelegramConfig,
    channel_id: ChannelId,
    api: BotApi,
    inject_tx: tokio::sync::Mutex<Option<mpsc::Sender<Result<ChannelMessage, ChannelError>>>>,
    poller: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl TelegramChannel {
    pub fn new(config: TelegramConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        let api = BotApi {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: config.bot_token.clone(),
        };

        Self {
            config,
            channel_id: ChannelId("telegram".into()),
            api,
            inject_tx: tokio::sync::Mutex::new(None),
            poller: tokio::sync::Mutex::new(None),
        }
    }

    /// Inject a raw update as if it came from `getUpdates`.
    ///
    /// Returns `Ok(false)` when the update carries nothing the bot handles.
    pub async fn inject_update(&self, update: Update) -> Result<bool, ChannelError> {
        let Some(msg) = update_to_message(&self.channel_id, update) else {
            return Ok(false);
        };
        let guard = self.inject_tx.lock().await;
        if let Some(tx) = guard.as_ref() {
            tx.send(Ok(msg))
                .await
                .map_err(|_| ChannelError::ConnectionLost("Message channel closed".into()))?;
            Ok(true)
        } else {
            Err(ChannelError::ConnectionLost("Channel not started".into()))
        }
    }

    async fn poll_loop(
        api: BotApi,
        channel_id: ChannelId,
        timeout_secs: u64,
        tx: mpsc::Sender<Result<ChannelMessage, ChannelError>>,
    ) {
        let mut offset = 0i64;
        loop {
            match api.get_updates(offset, timeout_secs).await {
                Ok(updates) => {
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        let update_id = update.update_id;
                        match update_to_message(&channel_id, update) {
                            Some(msg) => {
                                if tx.send(Ok(msg)).await.is_err() {
                                    debug!("Telegram receiver dropped, stopping poller");
                                    return;
                                }
                            }
                            None => debug!(update_id, "Ignoring unsupported update"),
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "getUpdates failed");
                    if tx.is_closed() {
                        return;
                    }
                    tokio::time::sleep(POLL_ERROR_PAUSE).await;
                }
            }
        }
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    fn id(&self) -> &ChannelId {
        &self.channel_id
    }

    async fn start(
        &self,
    ) -> Result<mpsc::Receiver<Result<ChannelMessage, ChannelError>>, ChannelError> {
        if self.config.bot_token.is_empty() {
            return Err(ChannelError::NotConfigured("telegram bot token is empty".into()));
        }

        let (tx, rx) = mpsc::channel(64);
        *self.inject_tx.lock().await = Some(tx.clone());

        if self.config.polling {
            info!(timeout_secs = self.config.poll_timeout_secs, "Telegram channel starting long polling");
            let handle = tokio::spawn(Self::poll_loop(
                self.api.clone(),
                self.channel_id.clone(),
                self.config.poll_timeout_secs,
                tx,
            ));
            if let Some(old) = self.poller.lock().await.replace(handle) {
                old.abort();
            }
        } else {
            info!("Telegram channel starting (injection only)");
        }

        Ok(rx)
    }

    async fn send(
        &self,
        chat_id: &str,
        content: &str,
        reply_to: Option<&str>,
    ) -> Result<(), ChannelError> {
        let chunks = split_message(content, MAX_MESSAGE_LEN);
        if chunks.is_empty() {
            return Err(ChannelError::DeliveryFailed {
                channel: "telegram".into(),
                reason: "refusing to send an empty message".into(),
            });
        }

        let reply_to = reply_to.and_then(|id| id.parse::<i64>().ok());
        let total = chunks.len();

        for (i, chunk) in chunks.into_iter().enumerate() {
            let mut body = serde_json::json!({
                "chat_id": chat_id,
                "text": chunk,
            });
            if let (0, Some(id)) = (i, reply_to) {
                body["reply_to_message_id"] = serde_json::json!(id);
            }
            self.api
                .call::<serde_json::Value>("sendMessage", &body, None)
                .await?;
        }

        debug!(chat_id = %chat_id, parts = total, content_len = content.len(), "Telegram reply sent");
        Ok(())
    }

    async fn send_typing(&self, chat_id: &str) -> Result<(), ChannelError> {
        let body = serde_json::json!({ "chat_id": chat_id, "action": "typing" });
        self.api.call::<bool>("sendChatAction", &body, None).await?;
        Ok(())
    }

    async fn fetch_file(&self, attachment: &Attachment) -> Result<Vec<u8>, ChannelError> {
        let fetch_error = |reason: String| ChannelError::FileFetchFailed {
            handle: attachment.handle.clone(),
            reason,
        };

        let file: TgFile = self
            .api
            .call("getFile", &serde_json::json!({ "file_id": attachment.handle }), None)
            .await?;
        let file_path = file
            .file_path
            .ok_or_else(|| fetch_error("getFile returned no file_path".into()))?;

        let url = format!("{}/file/bot{}/{}", self.api.api_base, self.api.token, file_path);
        debug!(file_path = %file_path, "Downloading Telegram file");

        let response = self
            .api
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;
        if !response.status().is_success() {
            return Err(fetch_error(format!("download returned {}", response.status())));
        }

        let bytes = response.bytes().await.map_err(|e| fetch_error(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    fn is_allowed(&self, sender_id: &str) -> bool {
        allowlist_permits(&self.config.allowed_users, sender_id)
    }

    async fn stop(&self) -> Result<(), ChannelError> {
        info!("Telegram channel stopping");
        if let Some(handle) = self.poller.lock().await.take() {
            handle.abort();
        }
        *self.inject_tx.lock().await = None;
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, ChannelError> {
        if self.config.bot_token.is_empty() {
            return Ok(false);
        }
        let me: serde_json::Value = self.api.call("getMe", &serde_json::json!({}), None).await?;
        Ok(me.get("is_bot").and_then(|v| v.as_bool()).unwrap_or(false))
    }
}
