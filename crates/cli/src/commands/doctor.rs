//! `lorebot doctor` — Diagnose configuration and connectivity.

use lorebot_channels::{TelegramChannel, TelegramConfig};
use lorebot_config::AppConfig;
use lorebot_core::channel::Channel;
use lorebot_core::knowledge::KnowledgeStore;
use lorebot_knowledge::FileKnowledgeStore;
use std::path::Path;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 lorebot Doctor — System Diagnostics");
    println!("======================================\n");

    let mut issues = 0;

    let config_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(AppConfig::default_path);
    if !config_path.exists() {
        println!("  ⚠️  No config file at {} — run `lorebot onboard`", config_path.display());
        issues += 1;
    }

    let config = match AppConfig::load(Some(&config_path)) {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  {} issue(s) found. Fix the config and re-run.", issues + 1);
            return Ok(());
        }
    };

    for (name, path) in [
        ("query template", &config.templates.query),
        ("encapsulation template", &config.templates.encapsulate),
    ] {
        if path.is_file() {
            println!("  ✅ {name}: {}", path.display());
        } else {
            println!("  ❌ Missing {name}: {}", path.display());
            issues += 1;
        }
    }

    let store = FileKnowledgeStore::new(&config.templates.knowledge);
    match store.size_bytes().await {
        Ok(bytes) => println!(
            "  ✅ Knowledge log: {} ({bytes} bytes)",
            config.templates.knowledge.display()
        ),
        Err(e) => {
            println!("  ❌ Knowledge log unreadable: {e}");
            issues += 1;
        }
    }

    match lorebot_providers::build_from_config(&config.openai) {
        Ok(provider) => match provider.health_check().await {
            Ok(true) => println!("  ✅ Provider '{}' reachable", provider.name()),
            Ok(false) => {
                println!("  ⚠️  Provider '{}' responded but is not healthy", provider.name());
                issues += 1;
            }
            Err(e) => {
                println!("  ❌ Provider '{}' unreachable: {e}", provider.name());
                issues += 1;
            }
        },
        Err(e) => {
            println!("  ❌ Provider not configured: {e}");
            issues += 1;
        }
    }

    if config.validate_telegram().is_ok() {
        let channel = TelegramChannel::new(TelegramConfig::from(&config.telegram));
        match channel.health_check().await {
            Ok(true) => println!("  ✅ Telegram token accepted"),
            Ok(false) => {
                println!("  ⚠️  Telegram getMe did not report a bot account");
                issues += 1;
            }
            Err(e) => {
                println!("  ❌ Telegram unreachable: {e}");
                issues += 1;
            }
        }
        if config.telegram.allowed_users.is_empty() {
            println!("  ⚠️  telegram.allowed_users is empty; every sender will be ignored");
            issues += 1;
        }
    } else {
        println!("  ⚠️  No Telegram token — `lorebot run` will refuse to start");
        issues += 1;
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
