pub mod ask;
pub mod chat;
pub mod doctor;
pub mod ingest;
pub mod onboard;
pub mod run;

use lorebot_bot::BotContext;
use lorebot_config::AppConfig;
use lorebot_knowledge::FileKnowledgeStore;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Load and validate the config, then wire provider and knowledge store
/// into a shared context.
pub fn bootstrap(
    config_path: Option<&Path>,
) -> Result<(AppConfig, Arc<BotContext>), Box<dyn std::error::Error>> {
    let config = AppConfig::load(config_path)?;
    let provider = lorebot_providers::build_from_config(&config.openai)?;
    let knowledge = Arc::new(FileKnowledgeStore::new(&config.templates.knowledge));

    info!(
        provider = provider.name(),
        model = %config.openai.model_name,
        mode = ?config.bot.mode,
        knowledge = %config.templates.knowledge.display(),
        "Bot context ready"
    );

    let ctx = Arc::new(BotContext::from_config(&config, provider, knowledge));
    Ok((config, ctx))
}
