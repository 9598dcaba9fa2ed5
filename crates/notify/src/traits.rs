//! Publisher trait definition and shared error types.

use crate::channels::AlertRecord;

/// Errors that can occur while rendering or handing off alerts.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Template rendering failed: {0}")]
    Template(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Hands alert records to whatever consumes a channel downstream.
#[async_trait::async_trait]
pub trait Publisher: Send + Sync {
    /// Deliver one alert record.
    async fn publish(&self, record: &AlertRecord) -> Result<(), NotifyError>;

    /// Human-readable name for this publisher (e.g., "log", "jsonl").
    fn name(&self) -> &str;
}

/// Result of handing one record to a single publisher.
#[derive(Debug)]
pub struct DispatchResult {
    pub channel: String,
    pub publisher: String,
    pub rule: String,
    pub subject_id: i64,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}
