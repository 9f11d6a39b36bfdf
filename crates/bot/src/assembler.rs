//! Prompt assembly for plain text questions.
//!
//! In knowledge mode every question is sent as exactly two messages:
//!
//! ```text
//! system: <query template><knowledge log>
//! user:   <question label><user text>
//! ```
//!
//! Nothing is inserted between template and knowledge, and the user text is
//! passed through untouched. Direct mode skips all of it and relays the text
//! as a single user message.

use crate::context::{BotContext, read_template};
use lorebot_config::BotMode;
use lorebot_core::Result;
use lorebot_core::message::Message;
use std::sync::Arc;
use tracing::debug;

pub struct PromptAssembler {
    ctx: Arc<BotContext>,
}

impl PromptAssembler {
    pub fn new(ctx: Arc<BotContext>) -> Self {
        Self { ctx }
    }

    /// Build the message list for `user_text`.
    pub async fn assemble(&self, user_text: &str) -> Result<Vec<Message>> {
        if self.ctx.mode == BotMode::Direct {
            return Ok(vec![Message::user(user_text)]);
        }

        let template = read_template(&self.ctx.templates.query).await?;
        let knowledge = self.ctx.knowledge.read_all().await?;

        let mut system = String::with_capacity(template.len() + knowledge.len());
        system.push_str(&template);
        system.push_str(&knowledge);

        let mut user = String::with_capacity(self.ctx.question_label.len() + user_text.len());
        user.push_str(&self.ctx.question_label);
        user.push_str(user_text);

        debug!(
            template_bytes = template.len(),
            knowledge_bytes = knowledge.len(),
            question_bytes = user_text.len(),
            "Prompt assembled"
        );

        Ok(vec![Message::system(system), Message::user(user)])
    }

    /// Assemble the prompt and return the model's answer.
    pub async fn answer(&self, user_text: &str) -> Result<String> {
        let messages = self.assemble(user_text).await?;
        self.ctx.complete(messages).await
    }
}
