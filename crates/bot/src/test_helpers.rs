//! Shared stubs for the bot's unit tests.

use async_trait::async_trait;
use lorebot_core::channel::{Attachment, AttachmentKind, Channel, ChannelId, ChannelMessage};
use lorebot_core::error::{ChannelError, ProviderError};
use lorebot_core::message::{Message, Role};
use lorebot_core::provider::{Provider, ProviderRequest, ProviderResponse};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc;

fn response(text: &str, model: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: None,
        model: model.into(),
    }
}

/// Returns scripted replies in order and records every request.
///
/// Panics if more calls are made than replies provided.
pub struct ScriptedProvider {
    replies: Mutex<Vec<String>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<&str>) -> Self {
        let mut replies: Vec<String> = replies.into_iter().map(String::from).collect();
        replies.reverse();
        Self {
            replies: Mutex::new(replies),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let model = request.model.clone();
        self.requests.lock().unwrap().push(request);
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop()
            .expect("ScriptedProvider: no more replies");
        Ok(response(&reply, &model))
    }
}

/// Replies with the content of the last user message.
#[derive(Default)]
pub struct EchoProvider {
    calls: Mutex<usize>,
}

impl EchoProvider {
    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl Provider for EchoProvider {
    fn name(&self) -> &str {
        "echo"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        *self.calls.lock().unwrap() += 1;
        let text = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default();
        Ok(response(&text, &request.model))
    }
}

/// Always fails with a network error.
pub struct FailingProvider;

#[async_trait]
impl Provider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Err(ProviderError::Network("connection refused".into()))
    }
}

/// In-process channel: serves files from a map and records replies.
#[derive(Default)]
pub struct StubChannel {
    files: HashMap<String, Vec<u8>>,
    allowed: Option<Vec<String>>,
    pub sent: Mutex<Vec<(String, String)>>,
    pub fetches: Mutex<usize>,
    pub typing: Mutex<usize>,
}

impl StubChannel {
    pub fn with_file(mut self, handle: &str, bytes: &[u8]) -> Self {
        self.files.insert(handle.into(), bytes.to_vec());
        self
    }

    pub fn allowing(mut self, users: &[&str]) -> Self {
        self.allowed = Some(users.iter().map(|u| u.to_string()).collect());
        self
    }

    pub fn fetch_count(&self) -> usize {
        *self.fetches.lock().unwrap()
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Channel for StubChannel {
    fn name(&self) -> &str {
        "stub"
    }

    fn id(&self) -> &ChannelId {
        static ID: std::sync::OnceLock<ChannelId> = std::sync::OnceLock::new();
        ID.get_or_init(|| ChannelId("stub".into()))
    }

    async fn start(
        &self,
    ) -> Result<mpsc::Receiver<Result<ChannelMessage, ChannelError>>, ChannelError> {
        let (_tx, rx) = mpsc::channel(1);
        Ok(rx)
    }

    async fn send(
        &self,
        chat_id: &str,
        content: &str,
        _reply_to: Option<&str>,
    ) -> Result<(), ChannelError> {
        self.sent
            .lock()
            .unwrap()
            .push((chat_id.to_string(), content.to_string()));
        Ok(())
    }

    async fn send_typing(&self, _chat_id: &str) -> Result<(), ChannelError> {
        *self.typing.lock().unwrap() += 1;
        Ok(())
    }

    async fn fetch_file(&self, attachment: &Attachment) -> Result<Vec<u8>, ChannelError> {
        *self.fetches.lock().unwrap() += 1;
        self.files
            .get(&attachment.handle)
            .cloned()
            .ok_or_else(|| ChannelError::FileFetchFailed {
                handle: attachment.handle.clone(),
                reason: "not found".into(),
            })
    }

    fn is_allowed(&self, sender_id: &str) -> bool {
        match &self.allowed {
            Some(list) => list.iter().any(|u| u == sender_id),
            None => true,
        }
    }
}

pub fn document(handle: &str, filename: &str) -> Attachment {
    Attachment {
        kind: AttachmentKind::Document,
        handle: handle.into(),
        filename: Some(filename.into()),
        mime_type: None,
        size_bytes: None,
    }
}

pub fn text_event(sender: &str, text: &str) -> ChannelMessage {
    ChannelMessage {
        channel_id: ChannelId("stub".into()),
        sender_id: sender.into(),
        sender_name: None,
        content: text.into(),
        chat_id: format!("chat-{sender}"),
        message_id: Some("1".into()),
        attachments: vec![],
    }
}

pub fn document_event(sender: &str, attachment: Attachment) -> ChannelMessage {
    ChannelMessage {
        attachments: vec![attachment],
        ..text_event(sender, "")
    }
}
