//! Read-file capability used by the background-agent poller

use async_trait::async_trait;
use std::path::Path;
use tether_core::Result;

/// Host capability for reading a background agent's transcript.
///
/// Implementations return an error for files that do not exist yet instead of
/// panicking; the poller retries on the next tick.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    async fn read(&self, path: &Path) -> Result<String>;
}

/// Reads transcripts straight from the local filesystem.
///
/// Bytes that are not valid UTF-8 (such as a character cut by a partial
/// flush) are replaced, so only the affected line fails to decode.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsTranscriptSource;

#[async_trait]
impl TranscriptSource for FsTranscriptSource {
    async fn read(&self, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_reads_existing_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{{\"type\":\"user\"}}").unwrap();
        let content = FsTranscriptSource.read(file.path()).await.unwrap();
        assert_eq!(content.trim(), "{\"type\":\"user\"}");
    }

    #[tokio::test]
    async fn test_missing_file_is_transient_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = FsTranscriptSource
            .read(&dir.path().join("not-yet.jsonl"))
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_replaced() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{\"type\":\"user\"}\n{\"type\":\xff").unwrap();
        let content = FsTranscriptSource.read(file.path()).await.unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("{\"type\":\"user\"}"));
        assert_eq!(lines.next(), Some("{\"type\":\u{FFFD}"));
    }
}
