//! The lorebot request pipeline.
//!
//! Two flows share one [`BotContext`]:
//!
//! 1. **Query**: user text → [`PromptAssembler`] (template + knowledge +
//!    question) → provider → reply
//! 2. **Ingest**: uploaded document → [`KnowledgeIngestor`] (fetch, decode,
//!    summarise) → knowledge append → acknowledgment
//!
//! The [`Dispatcher`] reads channel events, routes them to the right flow,
//! and is the only place where errors are turned into user-facing text.

pub mod assembler;
pub mod context;
pub mod dispatcher;
pub mod ingestor;
pub mod replies;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use assembler::PromptAssembler;
pub use context::{BotContext, Templates};
pub use dispatcher::Dispatcher;
pub use ingestor::KnowledgeIngestor;
