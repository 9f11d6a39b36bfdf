//! Error types for the lorebot domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use std::path::PathBuf;
use thiserror::Error;

/// The top-level error type for all lorebot operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Channel errors ---
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    // --- Knowledge store errors ---
    #[error("Knowledge store error: {0}")]
    Knowledge(#[from] KnowledgeError),

    // --- Ingestion errors ---
    #[error("Ingestion error: {0}")]
    Ingest(#[from] IngestError),

    // --- Template files ---
    #[error("Failed to read template {path}: {reason}")]
    Template { path: PathBuf, reason: String },
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider returned no choices")]
    EmptyResponse,

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Channel not configured: {0}")]
    NotConfigured(String),

    #[error("Message delivery failed to {channel}: {reason}")]
    DeliveryFailed { channel: String, reason: String },

    #[error("Channel connection lost: {0}")]
    ConnectionLost(String),

    #[error("Invalid platform payload: {0}")]
    InvalidPayload(String),

    #[error("Failed to fetch file {handle}: {reason}")]
    FileFetchFailed { handle: String, reason: String },
}

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("Failed to read knowledge store {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("Failed to append to knowledge store {path}: {reason}")]
    Write { path: PathBuf, reason: String },
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Unsupported file type: {filename} (allowed: {})", allowed.join(", "))]
    UnsupportedFileType {
        filename: String,
        allowed: Vec<String>,
    },

    #[error("Document has no filename")]
    MissingFilename,

    #[error("Document is not valid UTF-8: {0}")]
    Decode(String),

    #[error("Temporary file error: {0}")]
    TempFile(String),
}

impl Error {
    /// Whether this error was raised before any external call was made.
    ///
    /// Only unsupported uploads (wrong extension or no filename at all)
    /// qualify; everything else is reported to the user as a temporary
    /// failure.
    pub fn is_unsupported_file_type(&self) -> bool {
        matches!(
            self,
            Error::Ingest(IngestError::UnsupportedFileType { .. } | IngestError::MissingFilename)
        )
    }
}
