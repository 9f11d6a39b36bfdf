//! Completion service implementations for lorebot.
//!
//! All providers implement the `lorebot_core::Provider` trait.
//! [`build_from_config`] picks the one the `[openai]` section describes.

pub mod azure;
pub mod openai_compat;
pub mod router;
mod wire;

pub use azure::AzureDeploymentProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use router::build_from_config;
