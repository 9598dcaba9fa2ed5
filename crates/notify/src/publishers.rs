//! Built-in publishers: structured log lines and a JSON-lines file.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::channels::AlertRecord;
use crate::traits::{NotifyError, Publisher};

/// Emits one `info` line per alert.
#[derive(Debug, Default)]
pub struct LogPublisher;

#[async_trait::async_trait]
impl Publisher for LogPublisher {
    async fn publish(&self, record: &AlertRecord) -> Result<(), NotifyError> {
        info!(
            channel = %record.channel,
            rule = %record.rule,
            subject_id = record.subject_id,
            kind = %record.subject_kind,
            dbname = %record.dbname,
            "{}",
            record.subject
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// Appends each alert as one JSON object per line.
#[derive(Debug)]
pub struct JsonLinesPublisher {
    path: PathBuf,
}

impl JsonLinesPublisher {
    /// Create the publisher, creating parent directories as needed.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, NotifyError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl Publisher for JsonLinesPublisher {
    async fn publish(&self, record: &AlertRecord) -> Result<(), NotifyError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "jsonl"
    }
}
