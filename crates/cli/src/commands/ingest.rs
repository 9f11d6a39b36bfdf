//! `lorebot ingest` — Summarise a local document into the knowledge base.

use lorebot_bot::KnowledgeIngestor;
use std::path::Path;

pub async fn run(
    config_path: Option<&Path>,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let (config, ctx) = super::bootstrap(config_path)?;

    let summary = KnowledgeIngestor::new(ctx).ingest_local(path).await?;

    println!("✅ Appended to {}:", config.templates.knowledge.display());
    println!();
    println!("{summary}");
    Ok(())
}
