//! `lorebot onboard` — First-time setup.
//!
//! Writes a starter `config.toml` plus the template directory next to it.
//! Existing files are never overwritten.

use lorebot_config::AppConfig;
use std::path::{Path, PathBuf};

const QUERY_TEMPLATE: &str = concat!(
    "You are lorebot, a friendly assistant.\n",
    "Answer the user's question using the notes below. If the notes do not\n",
    "cover the question, say so instead of guessing.\n\n",
    "Notes:\n",
);

const ENCAPSULATE_TEMPLATE: &str = concat!(
    "Summarise the document the user sends you into a compact set of facts.\n",
    "Keep names, dates and preferences. Write plain text without headings.\n",
);

/// Write whatever starter files are missing. Returns the files created.
pub fn write_starter_files(config_path: &Path) -> std::io::Result<Vec<PathBuf>> {
    let base = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    std::fs::create_dir_all(base.join("template"))?;

    let files = [
        (config_path.to_path_buf(), AppConfig::default_toml()),
        (base.join("template/query.txt"), QUERY_TEMPLATE.to_string()),
        (base.join("template/encapsulate.txt"), ENCAPSULATE_TEMPLATE.to_string()),
        (base.join("template/knowledge.txt"), String::new()),
    ];

    let mut created = Vec::new();
    for (path, content) in files {
        if !path.exists() {
            std::fs::write(&path, content)?;
            created.push(path);
        }
    }
    Ok(created)
}

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(AppConfig::default_path);

    println!("📚 lorebot — First-Time Setup");
    println!("=============================\n");

    let created = write_starter_files(&config_path)?;
    if created.is_empty() {
        println!("  Everything already exists; nothing was changed.");
    }
    for path in &created {
        println!("✅ Created {}", path.display());
    }

    println!("\n📝 Next steps:");
    println!(
        "   1. Edit {} and set openai.api_key and telegram.access_token",
        config_path.display()
    );
    println!("   2. Adjust the templates in the template/ directory");
    println!("   3. Run: lorebot doctor, then lorebot run\n");

    Ok(())
}
