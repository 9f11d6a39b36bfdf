//! `lorebot run` — Serve the Telegram bot until Ctrl-C.

use lorebot_bot::Dispatcher;
use lorebot_channels::{TelegramChannel, TelegramConfig};
use lorebot_core::channel::Channel;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let (config, ctx) = super::bootstrap(config_path)?;
    config.validate_telegram()?;

    let channel = Arc::new(TelegramChannel::new(TelegramConfig::from(&config.telegram)));
    match channel.health_check().await {
        Ok(true) => info!("Telegram token accepted"),
        Ok(false) => warn!("Telegram getMe did not report a bot account"),
        Err(e) => warn!(error = %e, "Telegram getMe failed; polling anyway"),
    }

    let dispatcher = Dispatcher::new(ctx, channel.clone());
    info!("lorebot is running. Press Ctrl-C to stop.");

    tokio::select! {
        result = dispatcher.run() => result?,
        _ = tokio::signal::ctrl_c() => info!("Shutdown requested"),
    }

    channel.stop().await?;
    Ok(())
}
