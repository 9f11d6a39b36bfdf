//! `lorebot ask` — Single question, answer on stdout.

use lorebot_bot::PromptAssembler;
use std::path::Path;

pub async fn run(config_path: Option<&Path>, text: &str) -> Result<(), Box<dyn std::error::Error>> {
    let (_config, ctx) = super::bootstrap(config_path)?;

    eprint!("  Thinking...");
    let answer = PromptAssembler::new(ctx).answer(text).await;
    eprint!("\r              \r");

    println!("{}", answer?);
    Ok(())
}
