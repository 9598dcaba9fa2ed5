//! Alert store trait and queue row types.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mops_core::{AlertCandidate, AlertStatus, DerivedObject, Submission, SubjectKind, Tracklet};

use crate::error::QueueError;

/// Advisory lock marker on a queue row while intake holds the table lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LockState {
    Locked,
    Unlocked,
}

impl LockState {
    pub fn code(&self) -> char {
        match self {
            LockState::Locked => 'L',
            LockState::Unlocked => 'N',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'L' => Some(LockState::Locked),
            'N' => Some(LockState::Unlocked),
            _ => None,
        }
    }
}

/// One row of the alert queue table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueRecord {
    pub subject_id: i64,
    pub subject_kind: SubjectKind,
    pub status: AlertStatus,
    pub lock_state: LockState,
    pub insertion_time: DateTime<Utc>,
}

impl QueueRecord {
    pub fn key(&self) -> (i64, SubjectKind) {
        (self.subject_id, self.subject_kind)
    }
}

impl fmt::Display for QueueRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}] lock={}",
            self.subject_kind,
            self.subject_id,
            self.status,
            self.lock_state.code()
        )
    }
}

/// Check a status move against the forward-only state machine.
pub fn check_transition(
    subject_id: i64,
    kind: SubjectKind,
    from: AlertStatus,
    to: AlertStatus,
) -> Result<(), QueueError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(QueueError::InvalidTransition {
            subject_id,
            kind,
            from,
            to,
        })
    }
}

/// Persistent store behind the alert queue.
///
/// Read side materializes subjects for the rules; write side only moves
/// queue rows forward through NEW, READY and DONE. Implementations never
/// interpret orbits.
#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Name of the database the store is bound to.
    fn dbname(&self) -> &str;

    /// All queued subjects of `kind` currently in `status`, in storage order,
    /// each materialized with its subject.
    async fn fetch_candidates(
        &self,
        kind: SubjectKind,
        status: AlertStatus,
    ) -> Result<Vec<AlertCandidate>, QueueError>;

    /// A derived object with its orbit and tracklets (each with submissions).
    async fn fetch_derived_object(
        &self,
        id: i64,
        dbname: &str,
    ) -> Result<Option<DerivedObject>, QueueError>;

    /// Tracklets owned by a derived object, each with its submissions.
    async fn fetch_tracklets(&self, derived_object_id: i64) -> Result<Vec<Tracklet>, QueueError>;

    async fn fetch_submissions(&self, tracklet_id: i64) -> Result<Vec<Submission>, QueueError>;

    /// Move one queue row to `status`. Backward moves fail with
    /// [`QueueError::InvalidTransition`]; DONE over DONE is a no-op.
    async fn update_status(
        &self,
        subject_id: i64,
        kind: SubjectKind,
        status: AlertStatus,
    ) -> Result<(), QueueError>;

    /// Stage pending rows for a run: under the table lock, move every NEW row
    /// (and any READY row left by an interrupted run) to READY.
    ///
    /// Returns the staged keys. Runs as one transaction.
    async fn intake(&self) -> Result<Vec<(i64, SubjectKind)>, QueueError>;

    /// Insert a subject as NEW. A DONE row for the same subject must be purged
    /// first; a pending row is left as is.
    async fn enqueue(&self, subject_id: i64, kind: SubjectKind) -> Result<(), QueueError>;

    /// Delete a DONE row. Returns whether a row was removed.
    async fn purge(&self, subject_id: i64, kind: SubjectKind) -> Result<bool, QueueError>;

    /// Snapshot of the queue table.
    async fn records(&self) -> Result<Vec<QueueRecord>, QueueError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_codes_round_trip() {
        assert_eq!(LockState::from_code('L'), Some(LockState::Locked));
        assert_eq!(LockState::from_code('N'), Some(LockState::Unlocked));
        assert_eq!(LockState::from_code('X'), None);
    }

    #[test]
    fn backward_transition_rejected() {
        let err = check_transition(5, SubjectKind::Tracklet, AlertStatus::Done, AlertStatus::New)
            .unwrap_err();
        assert!(matches!(err, QueueError::InvalidTransition { subject_id: 5, .. }));
        assert!(err.to_string().contains("DONE -> NEW"));
    }

    #[test]
    fn record_serializes_with_upper_case_enums() {
        let record = QueueRecord {
            subject_id: 9,
            subject_kind: SubjectKind::Derived,
            status: AlertStatus::Ready,
            lock_state: LockState::Unlocked,
            insertion_time: Utc::now(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["subject_kind"], "DERIVED");
        assert_eq!(json["status"], "READY");
        assert_eq!(json["lock_state"], "UNLOCKED");
    }
}
