//! Event routing for one channel.
//!
//! Every inbound event is handled in its own task. Events from one chat run
//! one at a time in arrival order; different chats proceed concurrently.
//! Errors from the query and ingestion flows stop here: they are logged and
//! answered with a fixed reply on the same chat.

use crate::assembler::PromptAssembler;
use crate::context::BotContext;
use crate::ingestor::KnowledgeIngestor;
use crate::replies;
use lorebot_core::Result;
use lorebot_core::channel::{Attachment, Channel, ChannelMessage};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

#[derive(Clone)]
pub struct Dispatcher {
    ctx: Arc<BotContext>,
    channel: Arc<dyn Channel>,
}

impl Dispatcher {
    pub fn new(ctx: Arc<BotContext>, channel: Arc<dyn Channel>) -> Self {
        Self { ctx, channel }
    }

    /// Start the channel and serve events until its stream ends.
    ///
    /// Events still in flight when the stream closes are awaited before
    /// returning.
    pub async fn run(&self) -> Result<()> {
        let mut rx = self.channel.start().await?;
        info!(channel = self.channel.name(), "Dispatcher running");

        let mut tasks = JoinSet::new();
        let mut queue = ChatQueue::default();
        while let Some(event) = rx.recv().await {
            match event {
                Ok(msg) => {
                    let (previous, finished) = queue.enqueue(&msg.chat_id);
                    let this = self.clone();
                    tasks.spawn(async move {
                        // Resolves once the previous event's task drops its sender.
                        if let Some(previous) = previous {
                            let _ = previous.await;
                        }
                        this.handle(msg).await;
                        drop(finished);
                    });
                }
                Err(e) => warn!(channel = self.channel.name(), error = %e, "Channel error"),
            }

            while let Some(done) = tasks.try_join_next() {
                if let Err(e) = done {
                    error!(error = %e, "Event task panicked");
                }
            }
            queue.prune();
        }

        while let Some(done) = tasks.join_next().await {
            if let Err(e) = done {
                error!(error = %e, "Event task panicked");
            }
        }
        info!(channel = self.channel.name(), "Channel closed, dispatcher stopped");
        Ok(())
    }

    /// Handle one event and deliver the reply, if any.
    pub async fn handle(&self, msg: ChannelMessage) {
        let Some(reply) = self.reply_for(&msg).await else {
            return;
        };

        if let Err(e) = self
            .channel
            .send(&msg.chat_id, &reply, msg.message_id.as_deref())
            .await
        {
            error!(chat_id = %msg.chat_id, error = %e, "Failed to deliver reply");
        }
    }

    /// Compute the reply for an event without sending it.
    ///
    /// `None` means the event is dropped: sender not allowed, or an empty
    /// message with nothing to answer.
    pub async fn reply_for(&self, msg: &ChannelMessage) -> Option<String> {
        if !self.channel.is_allowed(&msg.sender_id) {
            warn!(
                channel = self.channel.name(),
                sender_id = %msg.sender_id,
                "Dropping message from sender not in allowlist"
            );
            return None;
        }

        if let Some(doc) = msg.document() {
            return Some(self.on_document(msg, doc).await);
        }

        match msg.command() {
            Some("start") => {
                info!(sender_id = %msg.sender_id, "User started the conversation");
                Some(self.ctx.greeting.clone())
            }
            Some(command) => {
                debug!(sender_id = %msg.sender_id, command, "Answering command with help");
                Some(self.ctx.help.clone())
            }
            None if msg.content.trim().is_empty() => None,
            None => Some(self.on_text(msg).await),
        }
    }

    async fn on_text(&self, msg: &ChannelMessage) -> String {
        info!(
            sender_id = %msg.sender_id,
            chars = msg.content.chars().count(),
            "Question received"
        );
        self.typing(&msg.chat_id).await;

        match PromptAssembler::new(self.ctx.clone()).answer(&msg.content).await {
            Ok(answer) => {
                debug!(sender_id = %msg.sender_id, chars = answer.chars().count(), "Answer ready");
                answer
            }
            Err(e) => {
                error!(sender_id = %msg.sender_id, error = %e, "Failed to answer question");
                replies::QUERY_FAILED.to_string()
            }
        }
    }

    async fn on_document(&self, msg: &ChannelMessage, doc: &Attachment) -> String {
        let ingestor = KnowledgeIngestor::new(self.ctx.clone());
        let filename = doc.filename.as_deref().unwrap_or("<unnamed>");

        // Reject before the typing indicator so a bad upload costs no calls.
        if let Err(e) = ingestor.check_extension(doc.filename.as_deref()) {
            info!(sender_id = %msg.sender_id, filename, error = %e, "Upload rejected");
            return replies::unsupported_file_type(&self.ctx.allowed_extensions);
        }

        info!(sender_id = %msg.sender_id, filename, "Document received");
        self.typing(&msg.chat_id).await;

        match ingestor.ingest(self.channel.as_ref(), doc).await {
            Ok(_) => replies::INGEST_SUCCEEDED.to_string(),
            Err(e) if e.is_unsupported_file_type() => {
                replies::unsupported_file_type(&self.ctx.allowed_extensions)
            }
            Err(e) => {
                error!(sender_id = %msg.sender_id, filename, error = %e, "Document ingestion failed");
                replies::INGEST_FAILED.to_string()
            }
        }
    }

    async fn typing(&self, chat_id: &str) {
        if let Err(e) = self.channel.send_typing(chat_id).await {
            debug!(chat_id, error = %e, "Typing indicator failed");
        }
    }
}

/// Per-chat ordering: each event waits for the one before it on the same
/// chat.
#[derive(Default)]
struct ChatQueue {
    tails: HashMap<String, oneshot::Receiver<()>>,
}

impl ChatQueue {
    /// Register a new event for `chat_id`.
    ///
    /// Returns the signal to wait on (the previous event's completion, if
    /// one is still pending) and the sender to drop once this event is done.
    fn enqueue(&mut self, chat_id: &str) -> (Option<oneshot::Receiver<()>>, oneshot::Sender<()>) {
        let (done, tail) = oneshot::channel();
        let previous = self.tails.insert(chat_id.to_string(), tail);
        (previous, done)
    }

    /// Forget chats whose last event has finished.
    fn prune(&mut self) {
        self.tails
            .retain(|_, tail| matches!(tail.try_recv(), Err(TryRecvError::Empty)));
    }
}
