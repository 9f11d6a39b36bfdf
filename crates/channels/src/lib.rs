//! Chat channel implementations for lorebot.
//!
//! Each channel connects to a chat platform and relays events to and from
//! the dispatcher. Channels are trait-based and platform-agnostic.
//!
//! Available channels:
//! - **Telegram** — Telegram Bot API over long polling
//! - **CLI** — Interactive terminal chat (stdin/stdout)

pub mod cli;
pub mod telegram;

pub use cli::CliChannel;
pub use telegram::{TelegramChannel, TelegramConfig};
