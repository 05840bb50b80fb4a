//! History Recorder: one immutable JSON file per completed request

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use jiff::Timestamp;
use serde::Serialize;
use serde_json::Value;
use tempfile::NamedTempFile;

/// Which path produced a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryKind {
    /// Pass-through stream
    Stream,
    /// Drained stream answered with one completion
    Buffered,
    /// Non-streaming primary completion
    Completion,
    /// Answer from the secondary provider
    Secondary,
}

impl HistoryKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stream => "stream",
            Self::Buffered => "buffered",
            Self::Completion => "completion",
            Self::Secondary => "secondary",
        }
    }
}

/// Normalized request and final response of one chat call
#[derive(Debug, Clone, Serialize)]
pub struct HistoryRecord {
    pub timestamp: Timestamp,
    /// Conversation messages as sent
    pub request: Value,
    /// First choice's message, or the raw payload when it has none
    pub response: Value,
    #[serde(skip)]
    pub kind: HistoryKind,
}

impl HistoryRecord {
    pub fn new(kind: HistoryKind, request: Value, response: Value) -> Self {
        Self {
            timestamp: Timestamp::now(),
            request,
            response,
            kind,
        }
    }

    /// `<YYYYMMDD-HHMMSS.mmm>-<kind>-<8 hex>.json`
    pub fn file_name(&self) -> String {
        let discriminator = uuid::Uuid::new_v4().simple().to_string();
        format!(
            "{}.{:03}-{}-{}.json",
            self.timestamp.strftime("%Y%m%d-%H%M%S"),
            self.timestamp.subsec_millisecond(),
            self.kind.as_str(),
            &discriminator[..8],
        )
    }
}

/// Durable destination for history records
#[async_trait]
pub trait HistorySink: Send + Sync {
    async fn persist(&self, record: HistoryRecord) -> anyhow::Result<()>;
}

/// Writes records into a directory, never exposing a partial file
#[derive(Debug, Clone)]
pub struct FileHistory {
    directory: PathBuf,
}

impl FileHistory {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Write the record and return its final path
    ///
    /// The body goes to a temp file in the target directory which is then
    /// renamed over the final name.
    pub async fn write(&self, record: HistoryRecord) -> anyhow::Result<PathBuf> {
        let directory = self.directory.clone();
        tokio::task::spawn_blocking(move || write_atomic(&directory, &record))
            .await
            .context("history writer task failed")?
    }
}

#[async_trait]
impl HistorySink for FileHistory {
    async fn persist(&self, record: HistoryRecord) -> anyhow::Result<()> {
        let path = self.write(record).await?;
        tracing::debug!(path = %path.display(), "history record written");
        Ok(())
    }
}

fn write_atomic(directory: &Path, record: &HistoryRecord) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(directory)
        .with_context(|| format!("failed to create history directory {}", directory.display()))?;

    let target = directory.join(record.file_name());

    let mut file = NamedTempFile::new_in(directory).context("failed to create temp history file")?;
    serde_json::to_writer_pretty(&mut file, record).context("failed to serialize history record")?;
    file.flush()?;
    file.as_file().sync_all()?;

    file.persist(&target)
        .with_context(|| format!("failed to move history record into {}", target.display()))?;

    Ok(target)
}
