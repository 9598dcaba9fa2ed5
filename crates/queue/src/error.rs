//! Queue error types.

use thiserror::Error;

use mops_core::{AlertStatus, CoreError, SubjectKind};

#[derive(Debug, Error)]
pub enum QueueError {
    /// Connection loss or query failure against the persistent store.
    #[error("storage error: {0}")]
    Storage(String),

    /// Attempted status move that is not a forward step.
    #[error("invalid transition for {kind} {subject_id}: {from} -> {to}")]
    InvalidTransition {
        subject_id: i64,
        kind: SubjectKind,
        from: AlertStatus,
        to: AlertStatus,
    },

    #[error("not found: {0}")]
    NotFound(String),

    /// A stored row carried a value the data model does not know.
    #[error("decode error: {0}")]
    Decode(#[from] CoreError),
}

impl From<sqlx::Error> for QueueError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => QueueError::NotFound("row".to_string()),
            other => QueueError::Storage(other.to_string()),
        }
    }
}

impl QueueError {
    /// Whether the error means the store itself is unusable.
    pub fn is_storage(&self) -> bool {
        matches!(self, QueueError::Storage(_))
    }
}
