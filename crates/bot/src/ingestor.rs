//! Document ingestion: turn an uploaded text file into a knowledge block.
//!
//! The extension check runs first, so a rejected upload never triggers a
//! download or a completion call. The knowledge store is only touched once
//! the provider has returned a summary.

use crate::context::{BotContext, read_template};
use lorebot_core::Result;
use lorebot_core::channel::{Attachment, Channel};
use lorebot_core::error::{ChannelError, IngestError};
use lorebot_core::message::Message;
use std::path::Path;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, info};

pub struct KnowledgeIngestor {
    ctx: Arc<BotContext>,
}

impl KnowledgeIngestor {
    pub fn new(ctx: Arc<BotContext>) -> Self {
        Self { ctx }
    }

    /// Reject filenames whose extension is not in the allowed set.
    ///
    /// The comparison is case-insensitive.
    pub fn check_extension(&self, filename: Option<&str>) -> Result<()> {
        let filename = filename
            .filter(|f| !f.trim().is_empty())
            .ok_or(IngestError::MissingFilename)?;

        let extension = Path::new(filename)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase());

        match extension {
            Some(ext) if self.ctx.allowed_extensions.iter().any(|a| *a == ext) => Ok(()),
            _ => Err(IngestError::UnsupportedFileType {
                filename: filename.to_string(),
                allowed: self.ctx.allowed_extensions.clone(),
            }
            .into()),
        }
    }

    /// Ingest a document uploaded through `channel`.
    ///
    /// Returns the summary that was appended.
    pub async fn ingest(&self, channel: &dyn Channel, attachment: &Attachment) -> Result<String> {
        self.check_extension(attachment.filename.as_deref())?;

        let bytes = channel.fetch_file(attachment).await?;
        debug!(
            handle = %attachment.handle,
            bytes = bytes.len(),
            "Document downloaded"
        );

        let text = stage_and_decode(&bytes).await?;
        self.encapsulate(&text).await
    }

    /// Ingest a file from the local filesystem.
    pub async fn ingest_local(&self, path: &Path) -> Result<String> {
        let filename = path.file_name().map(|n| n.to_string_lossy().into_owned());
        self.check_extension(filename.as_deref())?;

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ChannelError::FileFetchFailed {
                handle: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let text = stage_and_decode(&bytes).await?;
        self.encapsulate(&text).await
    }

    async fn encapsulate(&self, text: &str) -> Result<String> {
        let instruction = read_template(&self.ctx.templates.encapsulate).await?;
        let summary = self
            .ctx
            .complete(vec![Message::system(instruction), Message::user(text)])
            .await?;

        self.ctx.knowledge.append_block(&summary).await?;
        info!(
            document_bytes = text.len(),
            summary_bytes = summary.len(),
            store = self.ctx.knowledge.name(),
            "Knowledge block appended"
        );
        Ok(summary)
    }
}

/// Write the downloaded bytes to a temporary file and read them back as
/// UTF-8. The file is removed when the handle drops.
async fn stage_and_decode(bytes: &[u8]) -> Result<String> {
    let temp_error = |e: std::io::Error| IngestError::TempFile(e.to_string());

    let staged = tokio::task::spawn_blocking(NamedTempFile::new)
        .await
        .map_err(|e| IngestError::TempFile(e.to_string()))?
        .map_err(temp_error)?;
    tokio::fs::write(staged.path(), bytes)
        .await
        .map_err(temp_error)?;
    let raw = tokio::fs::read(staged.path()).await.map_err(temp_error)?;

    String::from_utf8(raw).map_err(|e| IngestError::Decode(e.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Templates;
    use crate::test_helpers::{EchoProvider, FailingProvider, StubChannel, document};
    use lorebot_config::BotMode;
    use lorebot_core::Error;
    use lorebot_core::knowledge::KnowledgeStore;
    use lorebot_core::provider::Provider;
    use lorebot_knowledge::FileKnowledgeStore;

    struct Fixture {
        _tmp: tempfile::TempDir,
        store: Arc<FileKnowledgeStore>,
        ingestor: KnowledgeIngestor,
    }

    fn fixture(provider: Arc<dyn Provider>, prior: &str) -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("encapsulate.txt"), "Summarise this.").unwrap();
        let knowledge_path = tmp.path().join("knowledge.txt");
        std::fs::write(&knowledge_path, prior).unwrap();
        let store = Arc::new(FileKnowledgeStore::new(knowledge_path));

        let ctx = Arc::new(BotContext {
            provider,
            knowledge: store.clone(),
            templates: Templates {
                query: tmp.path().join("query.txt"),
                encapsulate: tmp.path().join("encapsulate.txt"),
            },
            model: "test-model".into(),
            temperature: None,
            max_tokens: None,
            mode: BotMode::Knowledge,
            question_label: String::new(),
            allowed_extensions: vec!["txt".into(), "md".into()],
            greeting: "hi".into(),
            help: "help".into(),
        });

        Fixture {
            _tmp: tmp,
            store,
            ingestor: KnowledgeIngestor::new(ctx),
        }
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        let f = fixture(Arc::new(EchoProvider::default()), "");
        assert!(f.ingestor.check_extension(Some("notes.txt")).is_ok());
        assert!(f.ingestor.check_extension(Some("README.MD")).is_ok());
        assert!(f.ingestor.check_extension(Some("archive.tar.txt")).is_ok());

        for name in ["notes.pdf", "txt", "notes.txt.exe", ".txt"] {
            let err = f.ingestor.check_extension(Some(name)).unwrap_err();
            assert!(err.is_unsupported_file_type(), "{name} should be rejected");
        }
        assert!(f.ingestor.check_extension(None).unwrap_err().is_unsupported_file_type());
    }

    #[tokio::test]
    async fn unsupported_upload_never_fetches() {
        let provider = Arc::new(EchoProvider::default());
        let f = fixture(provider.clone(), "prior\n\n");
        let channel = StubChannel::default().with_file("doc-1", b"whatever");

        let err = f
            .ingestor
            .ingest(&channel, &document("doc-1", "notes.pdf"))
            .await
            .unwrap_err();

        assert!(err.is_unsupported_file_type());
        assert_eq!(channel.fetch_count(), 0);
        assert_eq!(provider.calls(), 0);
        assert_eq!(f.store.read_all().await.unwrap(), "prior\n\n");
    }

    #[tokio::test]
    async fn echoed_summary_is_appended_with_separator() {
        let provider = Arc::new(EchoProvider::default());
        let f = fixture(provider.clone(), "Bob likes coffee.\n\n");
        let channel = StubChannel::default().with_file("doc-1", b"Alice likes tea.");

        let summary = f
            .ingestor
            .ingest(&channel, &document("doc-1", "notes.txt"))
            .await
            .unwrap();

        assert_eq!(summary, "Alice likes tea.");
        assert_eq!(
            f.store.read_all().await.unwrap(),
            "Bob likes coffee.\n\nAlice likes tea.\n\n"
        );
        assert_eq!(channel.fetch_count(), 1);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn failing_provider_leaves_store_untouched() {
        let f = fixture(Arc::new(FailingProvider), "prior");
        let channel = StubChannel::default().with_file("doc-1", b"Alice likes tea.");

        let err = f
            .ingestor
            .ingest(&channel, &document("doc-1", "notes.md"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Provider(_)));
        assert_eq!(f.store.read_all().await.unwrap(), "prior");
    }

    #[tokio::test]
    async fn invalid_utf8_is_a_decode_error() {
        let provider = Arc::new(EchoProvider::default());
        let f = fixture(provider.clone(), "");
        let channel = StubChannel::default().with_file("doc-1", &[0xff, 0xfe, 0x00]);

        let err = f
            .ingestor
            .ingest(&channel, &document("doc-1", "notes.txt"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Ingest(IngestError::Decode(_))));
        assert_eq!(provider.calls(), 0);
        assert_eq!(f.store.read_all().await.unwrap(), "");
    }

    #[tokio::test]
    async fn fetch_failure_propagates() {
        let f = fixture(Arc::new(EchoProvider::default()), "");
        let channel = StubChannel::default();

        let err = f
            .ingestor
            .ingest(&channel, &document("missing", "notes.txt"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Channel(ChannelError::FileFetchFailed { .. })
        ));
    }

    #[tokio::test]
    async fn ingest_local_reads_from_disk() {
        let f = fixture(Arc::new(EchoProvider::default()), "");
        let doc_dir = tempfile::tempdir().unwrap();
        let path = doc_dir.path().join("Notes.MD");
        std::fs::write(&path, "# Alice\nlikes tea").unwrap();

        f.ingestor.ingest_local(&path).await.unwrap();
        assert_eq!(f.store.read_all().await.unwrap(), "# Alice\nlikes tea\n\n");

        let err = f
            .ingestor
            .ingest_local(&doc_dir.path().join("gone.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Channel(_)));
    }

    #[tokio::test]
    async fn staging_round_trips_utf8() {
        assert_eq!(stage_and_decode("café ☕".as_bytes()).await.unwrap(), "café ☕");
        assert_eq!(stage_and_decode(b"").await.unwrap(), "");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn staging_runs_on_a_single_threaded_runtime() {
        let text = "Alice likes tea.\n".repeat(4096);
        assert_eq!(stage_and_decode(text.as_bytes()).await.unwrap(), text);
        assert!(matches!(
            stage_and_decode(&[0xc3, 0x28]).await,
            Err(lorebot_core::Error::Ingest(IngestError::Decode(_)))
        ));
    }
}
