//! `lorebot chat` — Interactive terminal session with the same dispatcher
//! the Telegram bot uses.

use lorebot_bot::Dispatcher;
use lorebot_channels::CliChannel;
use std::path::Path;
use std::sync::Arc;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let (config, ctx) = super::bootstrap(config_path)?;

    println!();
    println!("  lorebot — Interactive Mode");
    println!();
    println!("  Model:      {}", config.openai.model_name);
    println!("  Mode:       {:?}", config.bot.mode);
    println!("  Knowledge:  {}", config.templates.knowledge.display());
    println!();
    println!("  Type a question and press Enter.");
    println!("  /upload <path> adds a .txt or .md file to the knowledge base.");
    println!("  Type 'exit' or Ctrl+D to quit.");
    println!();

    let dispatcher = Dispatcher::new(ctx, Arc::new(CliChannel::new()));
    dispatcher.run().await?;

    println!();
    println!("  Goodbye! 👋");
    println!();
    Ok(())
}
