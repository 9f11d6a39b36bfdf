//! Shared state for every handler.

use lorebot_config::{AppConfig, BotMode};
use lorebot_core::error::{Error, ProviderError};
use lorebot_core::knowledge::KnowledgeStore;
use lorebot_core::message::Message;
use lorebot_core::provider::{Provider, ProviderRequest};
use lorebot_core::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::replies;

/// Template files read at request time.
#[derive(Debug, Clone)]
pub struct Templates {
    /// Instruction text prepended to the knowledge log for queries.
    pub query: PathBuf,
    /// System prompt used to summarise uploaded documents.
    pub encapsulate: PathBuf,
}

/// Everything a handler needs, built once at startup and shared via `Arc`.
pub struct BotContext {
    pub provider: Arc<dyn Provider>,
    pub knowledge: Arc<dyn KnowledgeStore>,
    pub templates: Templates,
    pub model: String,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub mode: BotMode,
    pub question_label: String,
    /// Lowercase extensions without the leading dot.
    pub allowed_extensions: Vec<String>,
    pub greeting: String,
    pub help: String,
}

impl BotContext {
    /// Build the context from a validated config.
    pub fn from_config(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        knowledge: Arc<dyn KnowledgeStore>,
    ) -> Self {
        Self {
            provider,
            knowledge,
            templates: Templates {
                query: config.templates.query.clone(),
                encapsulate: config.templates.encapsulate.clone(),
            },
            model: config.openai.model_name.clone(),
            temperature: config.openai.temperature,
            max_tokens: config.openai.max_tokens,
            mode: config.bot.mode,
            question_label: config.bot.question_label.clone(),
            allowed_extensions: config.bot.allowed_extensions.clone(),
            greeting: non_empty_or(config.bot.greeting.as_deref(), replies::DEFAULT_GREETING),
            help: non_empty_or(config.bot.help.as_deref(), replies::DEFAULT_HELP),
        }
    }

    /// Send `messages` to the provider and return the first choice's text.
    pub async fn complete(&self, messages: Vec<Message>) -> Result<String> {
        let request = ProviderRequest::new(&self.model, messages)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);

        let response = self.provider.complete(request).await?;
        if let Some(usage) = &response.usage {
            debug!(
                model = %response.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Completion received"
            );
        }

        if response.message.content.trim().is_empty() {
            return Err(ProviderError::EmptyResponse.into());
        }
        Ok(response.message.content)
    }
}

fn non_empty_or(value: Option<&str>, default: &str) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(default)
        .to_string()
}

/// Read a template file as UTF-8.
pub async fn read_template(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::Template {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}
