//! User-facing reply texts.

pub const QUERY_FAILED: &str = "Sorry, I can't respond right now. Please try again later.";

pub const INGEST_SUCCEEDED: &str =
    "Your document has been processed and the knowledge has been encapsulated into the model.";

pub const INGEST_FAILED: &str =
    "Sorry, I couldn't process your document right now. Please try again later.";

pub const DEFAULT_GREETING: &str = "Hi! I'm lorebot. Ask me anything about what I've been \
taught, or send me a .txt or .md document to teach me something new.";

pub const DEFAULT_HELP: &str = "Send me a question and I'll answer from my knowledge base.\n\
Upload a text (.txt) or markdown (.md) document and I'll summarise it and remember it.\n\n\
Commands:\n/start - introduction\n/help - this message";

/// Rejection text listing the accepted extensions, e.g.
/// "Sorry, only text files (.txt) and markdown files (.md) are supported."
pub fn unsupported_file_type(allowed: &[String]) -> String {
    let kinds: Vec<String> = allowed
        .iter()
        .map(|ext| {
            let label = match ext.as_str() {
                "txt" | "text" => "text".to_string(),
                "md" | "markdown" => "markdown".to_string(),
                other => other.to_uppercase(),
            };
            format!("{label} files (.{ext})")
        })
        .collect();

    let listed = match kinds.as_slice() {
        [] => "text files".to_string(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} and {last}", init.join(", ")),
    };
    format!("Sorry, only {listed} are supported.")
}
