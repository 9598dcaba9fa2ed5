//! In-memory [`AlertStore`] for tests and dry runs.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tracing::debug;

use mops_core::{
    AlertCandidate, AlertStatus, DerivedObject, Subject, SubjectKind, Submission, Tracklet,
};

use crate::error::QueueError;
use crate::store::{check_transition, AlertStore, LockState, QueueRecord};

#[derive(Default)]
struct Tables {
    queue: Vec<QueueRecord>,
    derived_objects: BTreeMap<i64, DerivedObject>,
    tracklets: BTreeMap<i64, Tracklet>,
    submissions: Vec<Submission>,
}

/// Subjects preloaded into a [`MemoryAlertStore`], e.g. for a dry run.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub derived_objects: Vec<DerivedObject>,
    #[serde(default)]
    pub tracklets: Vec<Tracklet>,
}

/// Queue and subject tables held in process memory.
///
/// Subjects are stored flat (derived objects without tracklets, tracklets
/// without submissions) and materialized on fetch, like the SQL store.
pub struct MemoryAlertStore {
    dbname: String,
    tables: Mutex<Tables>,
}

impl MemoryAlertStore {
    pub fn new(dbname: impl Into<String>) -> Self {
        Self {
            dbname: dbname.into(),
            tables: Mutex::new(Tables::default()),
        }
    }

    /// Add or replace a derived object. Embedded tracklets are stored too.
    pub fn insert_derived_object(&self, mut obj: DerivedObject) {
        let tracklets = std::mem::take(&mut obj.tracklets);
        for mut t in tracklets {
            t.derived_object_id = Some(obj.id);
            self.insert_tracklet(t);
        }
        let mut tables = self.tables.lock().expect("tables lock poisoned");
        tables.derived_objects.insert(obj.id, obj);
    }

    /// Add or replace a tracklet. Embedded submissions are stored too.
    pub fn insert_tracklet(&self, mut tracklet: Tracklet) {
        let submissions = std::mem::take(&mut tracklet.submissions);
        tracklet.orbit = None;
        let mut tables = self.tables.lock().expect("tables lock poisoned");
        tables.submissions.retain(|s| s.tracklet_id != tracklet.id);
        for mut s in submissions {
            s.tracklet_id = tracklet.id;
            tables.submissions.push(s);
        }
        tables.tracklets.insert(tracklet.id, tracklet);
    }

    /// Insert every fixture subject and queue it as NEW. Returns the number
    /// of queued subjects.
    pub async fn seed(&self, fixture: Fixture) -> Result<usize, QueueError> {
        let mut queued = 0;
        for obj in fixture.derived_objects {
            let id = obj.id;
            self.insert_derived_object(obj);
            self.enqueue(id, SubjectKind::Derived).await?;
            queued += 1;
        }
        for tracklet in fixture.tracklets {
            let id = tracklet.id;
            self.insert_tracklet(tracklet);
            self.enqueue(id, SubjectKind::Tracklet).await?;
            queued += 1;
        }
        Ok(queued)
    }

    fn materialize_tracklet(tables: &Tables, tracklet: &Tracklet) -> Tracklet {
        let mut t = tracklet.clone();
        t.submissions = tables
            .submissions
            .iter()
            .filter(|s| s.tracklet_id == t.id)
            .cloned()
            .collect();
        t.orbit = t
            .derived_object_id
            .and_then(|id| tables.derived_objects.get(&id))
            .and_then(|d| d.orbit.clone());
        t
    }

    fn materialize_derived(tables: &Tables, obj: &DerivedObject) -> DerivedObject {
        let mut d = obj.clone();
        d.tracklets = tables
            .tracklets
            .values()
            .filter(|t| t.derived_object_id == Some(d.id))
            .map(|t| Self::materialize_tracklet(tables, t))
            .collect();
        d
    }

    fn check_db(&self, dbname: &str) -> Result<(), QueueError> {
        if dbname == self.dbname {
            Ok(())
        } else {
            Err(QueueError::NotFound(format!("database '{}'", dbname)))
        }
    }
}

#[async_trait]
impl AlertStore for MemoryAlertStore {
    fn dbname(&self) -> &str {
        &self.dbname
    }

    async fn fetch_candidates(
        &self,
        kind: SubjectKind,
        status: AlertStatus,
    ) -> Result<Vec<AlertCandidate>, QueueError> {
        let tables = self.tables.lock().expect("tables lock poisoned");
        let mut out = Vec::new();
        for record in tables
            .queue
            .iter()
            .filter(|r| r.subject_kind == kind && r.status == status)
        {
            let subject = match kind {
                SubjectKind::Derived => tables
                    .derived_objects
                    .get(&record.subject_id)
                    .map(|d| Subject::DerivedObject(Self::materialize_derived(&tables, d))),
                SubjectKind::Tracklet => tables
                    .tracklets
                    .get(&record.subject_id)
                    .map(|t| Subject::Tracklet(Self::materialize_tracklet(&tables, t))),
            };
            match subject {
                Some(subject) => out.push(AlertCandidate::new(&self.dbname, status, subject)),
                None => debug!(
                    subject_id = record.subject_id,
                    kind = %kind,
                    "queued subject has no backing row, skipping"
                ),
            }
        }
        Ok(out)
    }

    async fn fetch_derived_object(
        &self,
        id: i64,
        dbname: &str,
    ) -> Result<Option<DerivedObject>, QueueError> {
        self.check_db(dbname)?;
        let tables = self.tables.lock().expect("tables lock poisoned");
        Ok(tables
            .derived_objects
            .get(&id)
            .map(|d| Self::materialize_derived(&tables, d)))
    }

    async fn fetch_tracklets(&self, derived_object_id: i64) -> Result<Vec<Tracklet>, QueueError> {
        let tables = self.tables.lock().expect("tables lock poisoned");
        Ok(tables
            .tracklets
            .values()
            .filter(|t| t.derived_object_id == Some(derived_object_id))
            .map(|t| Self::materialize_tracklet(&tables, t))
            .collect())
    }

    async fn fetch_submissions(&self, tracklet_id: i64) -> Result<Vec<Submission>, QueueError> {
        let tables = self.tables.lock().expect("tables lock poisoned");
        Ok(tables
            .submissions
            .iter()
            .filter(|s| s.tracklet_id == tracklet_id)
            .cloned()
            .collect())
    }

    async fn update_status(
        &self,
        subject_id: i64,
        kind: SubjectKind,
        status: AlertStatus,
    ) -> Result<(), QueueError> {
        let mut tables = self.tables.lock().expect("tables lock poisoned");
        let record = tables
            .queue
            .iter_mut()
            .find(|r| r.key() == (subject_id, kind))
            .ok_or_else(|| QueueError::NotFound(format!("queue row {} {}", kind, subject_id)))?;
        check_transition(subject_id, kind, record.status, status)?;
        record.status = status;
        Ok(())
    }

    async fn intake(&self) -> Result<Vec<(i64, SubjectKind)>, QueueError> {
        // The table mutex is the intake lock; rows never stay marked locked.
        let mut tables = self.tables.lock().expect("tables lock poisoned");
        let mut staged = Vec::new();
        for record in tables
            .queue
            .iter_mut()
            .filter(|r| r.status != AlertStatus::Done)
        {
            record.status = AlertStatus::Ready;
            staged.push(record.key());
        }

        Ok(staged)
    }

    async fn enqueue(&self, subject_id: i64, kind: SubjectKind) -> Result<(), QueueError> {
        let mut tables = self.tables.lock().expect("tables lock poisoned");
        if let Some(existing) = tables.queue.iter().find(|r| r.key() == (subject_id, kind)) {
            return match existing.status {
                AlertStatus::Done => Err(QueueError::InvalidTransition {
                    subject_id,
                    kind,
                    from: AlertStatus::Done,
                    to: AlertStatus::New,
                }),
                _ => Ok(()),
            };
        }
        tables.queue.push(QueueRecord {
            subject_id,
            subject_kind: kind,
            status: AlertStatus::New,
            lock_state: LockState::Unlocked,
            insertion_time: Utc::now(),
        });
        Ok(())
    }

    async fn purge(&self, subject_id: i64, kind: SubjectKind) -> Result<bool, QueueError> {
        let mut tables = self.tables.lock().expect("tables lock poisoned");
        let before = tables.queue.len();
        tables
            .queue
            .retain(|r| !(r.key() == (subject_id, kind) && r.status == AlertStatus::Done));
        Ok(tables.queue.len() < before)
    }

    async fn records(&self) -> Result<Vec<QueueRecord>, QueueError> {
        let tables = self.tables.lock().expect("tables lock poisoned");
        Ok(tables.queue.clone())
    }
}
