//! PostgreSQL-backed [`AlertStore`].
//!
//! Assumes the queue and subject tables already exist; schema management
//! lives with the pipeline's database tooling.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{debug, info};

use mops_core::config::PostgresConfig;
use mops_core::{
    AlertCandidate, AlertStatus, CoreError, DerivedObject, Orbit, Subject, SubjectKind,
    Submission, Tracklet, TrackletStatus,
};

use crate::error::QueueError;
use crate::store::{check_transition, AlertStore, LockState, QueueRecord};

/// Advisory lock key guarding the alert queue table during intake.
const QUEUE_LOCK_KEY: i64 = 0x4d4f_5053_5155_4555;

#[derive(Debug, sqlx::FromRow)]
struct QueueRow {
    subject_id: i64,
    subject_type: String,
    status: String,
    lock_state: String,
    insertion_time: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct DerivedObjectRow {
    derived_object_id: i64,
    q: Option<f64>,
    e: Option<f64>,
    i: Option<f64>,
    node: Option<f64>,
    arg_peri: Option<f64>,
    time_peri: Option<f64>,
    epoch: Option<f64>,
    h_v: Option<f64>,
    moid_1: Option<f64>,
    moid_2: Option<f64>,
    arc_length_days: Option<f64>,
    synthetic: bool,
}

#[derive(Debug, sqlx::FromRow)]
struct TrackletRow {
    tracklet_id: i64,
    derived_object_id: Option<i64>,
    v_tot: f64,
    v_ra: f64,
    v_dec: f64,
    epoch: f64,
    magnitude: f64,
    status: String,
    known_name: Option<String>,
    arc_length_days: Option<f64>,
    synthetic: bool,
}

#[derive(Debug, sqlx::FromRow)]
struct SubmissionRow {
    tracklet_id: i64,
    digest: f64,
    desig: String,
}

fn first_char(field: &'static str, s: &str) -> Result<char, CoreError> {
    s.chars()
        .next()
        .ok_or(CoreError::UnknownCode { field, code: ' ' })
}

fn decode_code<T>(
    field: &'static str,
    s: &str,
    from_code: fn(char) -> Option<T>,
) -> Result<T, CoreError> {
    let code = first_char(field, s)?;
    from_code(code).ok_or(CoreError::UnknownCode { field, code })
}

impl QueueRow {
    fn into_record(self) -> Result<QueueRecord, CoreError> {
        Ok(QueueRecord {
            subject_id: self.subject_id,
            subject_kind: decode_code("subject_type", &self.subject_type, SubjectKind::from_code)?,
            status: decode_code("status", &self.status, AlertStatus::from_code)?,
            lock_state: decode_code("lock_state", &self.lock_state, LockState::from_code)?,
            insertion_time: self.insertion_time,
        })
    }
}

impl DerivedObjectRow {
    fn orbit(&self) -> Option<Orbit> {
        let (q, e, i) = (self.q?, self.e?, self.i?);
        Some(Orbit {
            q,
            e,
            i,
            node: self.node.unwrap_or(0.0),
            arg_peri: self.arg_peri.unwrap_or(0.0),
            time_peri: self.time_peri.unwrap_or(0.0),
            epoch: self.epoch.unwrap_or(0.0),
            h_v: self.h_v,
            moid_1: self.moid_1,
            moid_2: self.moid_2,
        })
    }

    fn into_derived_object(self, tracklets: Vec<Tracklet>) -> DerivedObject {
        DerivedObject {
            id: self.derived_object_id,
            orbit: self.orbit(),
            tracklets,
            arc_length_days: self.arc_length_days,
            synthetic: self.synthetic,
        }
    }
}

impl TrackletRow {
    fn into_tracklet(
        self,
        orbit: Option<Orbit>,
        submissions: Vec<Submission>,
    ) -> Result<Tracklet, CoreError> {
        Ok(Tracklet {
            id: self.tracklet_id,
            derived_object_id: self.derived_object_id,
            v_tot: self.v_tot,
            v_ra: self.v_ra,
            v_dec: self.v_dec,
            epoch: self.epoch,
            magnitude: self.magnitude,
            status: decode_code("tracklet status", &self.status, TrackletStatus::from_code)?,
            known_name: self.known_name,
            arc_length_days: self.arc_length_days,
            synthetic: self.synthetic,
            orbit,
            submissions,
        })
    }
}

const DERIVED_OBJECT_COLUMNS: &str = "derived_object_id, q, e, i, node, arg_peri, time_peri, \
     epoch, h_v, moid_1, moid_2, arc_length_days, synthetic";

const TRACKLET_COLUMNS: &str = "tracklet_id, derived_object_id, v_tot, v_ra, v_dec, epoch, \
     magnitude, status, known_name, arc_length_days, synthetic";

/// Alert store over a PostgreSQL connection pool.
pub struct PgAlertStore {
    pool: PgPool,
    dbname: String,
}

impl PgAlertStore {
    /// Connect using the project's Postgres settings.
    pub async fn connect(config: &PostgresConfig) -> Result<Self, QueueError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.connection_string())
            .await?;
        info!(host = %config.host, db = %config.database, "PostgreSQL connected");
        Ok(Self::from_pool(pool, config.database.clone()))
    }

    pub fn from_pool(pool: PgPool, dbname: impl Into<String>) -> Self {
        Self {
            pool,
            dbname: dbname.into(),
        }
    }

    async fn derived_object_row(&self, id: i64) -> Result<Option<DerivedObjectRow>, QueueError> {
        let sql = format!(
            "SELECT {} FROM mops_derived_objects WHERE derived_object_id = $1",
            DERIVED_OBJECT_COLUMNS
        );
        Ok(sqlx::query_as::<_, DerivedObjectRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn materialize_tracklet(
        &self,
        row: TrackletRow,
        orbit: Option<Orbit>,
    ) -> Result<Tracklet, QueueError> {
        let submissions = self.fetch_submissions(row.tracklet_id).await?;
        Ok(row.into_tracklet(orbit, submissions)?)
    }

    async fn fetch_tracklet(&self, id: i64) -> Result<Option<Tracklet>, QueueError> {
        let sql = format!("SELECT {} FROM mops_tracklets WHERE tracklet_id = $1", TRACKLET_COLUMNS);
        let row = sqlx::query_as::<_, TrackletRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let orbit = match row.derived_object_id {
            Some(d) => self.derived_object_row(d).await?.and_then(|r| r.orbit()),
            None => None,
        };
        Ok(Some(self.materialize_tracklet(row, orbit).await?))
    }

    async fn fetch_queue(
        &self,
        kind: SubjectKind,
        status: AlertStatus,
    ) -> Result<Vec<QueueRecord>, QueueError> {
        let rows = sqlx::query_as::<_, QueueRow>(
            "SELECT subject_id, subject_type, status, lock_state, insertion_time \
             FROM mops_alert_queue WHERE subject_type = $1 AND status = $2 \
             ORDER BY insertion_time, subject_id",
        )
        .bind(kind.code().to_string())
        .bind(status.code().to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|r| r.into_record().map_err(QueueError::from))
            .collect()
    }
}

#[async_trait]
impl AlertStore for PgAlertStore {
    fn dbname(&self) -> &str {
        &self.dbname
    }

    async fn fetch_candidates(
        &self,
        kind: SubjectKind,
        status: AlertStatus,
    ) -> Result<Vec<AlertCandidate>, QueueError> {
        let records = self.fetch_queue(kind, status).await?;
        let mut out = Vec::with_capacity(records.len());
        for record in records {
            let subject = match kind {
                SubjectKind::Derived => self
                    .fetch_derived_object(record.subject_id, &self.dbname)
                    .await?
                    .map(Subject::DerivedObject),
                SubjectKind::Tracklet => self
                    .fetch_tracklet(record.subject_id)
                    .await?
                    .map(Subject::Tracklet),
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
        if dbname != self.dbname {
            return Err(QueueError::NotFound(format!("database '{}'", dbname)));
        }
        let Some(row) = self.derived_object_row(id).await? else {
            return Ok(None);
        };
        let tracklets = self.fetch_tracklets(id).await?;
        Ok(Some(row.into_derived_object(tracklets)))
    }

    async fn fetch_tracklets(&self, derived_object_id: i64) -> Result<Vec<Tracklet>, QueueError> {
        let orbit = self
            .derived_object_row(derived_object_id)
            .await?
            .and_then(|r| r.orbit());
        let sql = format!(
            "SELECT {} FROM mops_tracklets WHERE derived_object_id = $1 ORDER BY tracklet_id",
            TRACKLET_COLUMNS
        );
        let rows = sqlx::query_as::<_, TrackletRow>(&sql)
            .bind(derived_object_id)
            .fetch_all(&self.pool)
            .await?;
        let mut tracklets = Vec::with_capacity(rows.len());
        for row in rows {
            tracklets.push(self.materialize_tracklet(row, orbit.clone()).await?);
        }
        Ok(tracklets)
    }

    async fn fetch_submissions(&self, tracklet_id: i64) -> Result<Vec<Submission>, QueueError> {
        let rows = sqlx::query_as::<_, SubmissionRow>(
            "SELECT tracklet_id, digest, desig FROM mops_submissions WHERE tracklet_id = $1",
        )
        .bind(tracklet_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| Submission {
                tracklet_id: r.tracklet_id,
                digest: r.digest,
                desig: r.desig,
            })
            .collect())
    }

    async fn update_status(
        &self,
        subject_id: i64,
        kind: SubjectKind,
        status: AlertStatus,
    ) -> Result<(), QueueError> {
        let mut tx = self.pool.begin().await?;
        let current: Option<String> = sqlx::query_scalar(
            "SELECT status FROM mops_alert_queue \
             WHERE subject_id = $1 AND subject_type = $2 FOR UPDATE",
        )
        .bind(subject_id)
        .bind(kind.code().to_string())
        .fetch_optional(&mut *tx)
        .await?;

        let current = current
            .ok_or_else(|| QueueError::NotFound(format!("queue row {} {}", kind, subject_id)))?;
        let from = decode_code("status", &current, AlertStatus::from_code)?;
        check_transition(subject_id, kind, from, status)?;

        if from != status {
            sqlx::query(
                "UPDATE mops_alert_queue SET status = $3 \
                 WHERE subject_id = $1 AND subject_type = $2",
            )
            .bind(subject_id)
            .bind(kind.code().to_string())
            .bind(status.code().to_string())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn intake(&self) -> Result<Vec<(i64, SubjectKind)>, QueueError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(QUEUE_LOCK_KEY)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE mops_alert_queue SET lock_state = 'L' WHERE status IN ('N', 'R')")
            .execute(&mut *tx)
            .await?;

        let staged: Vec<(i64, String)> = sqlx::query_as(
            "UPDATE mops_alert_queue SET status = 'R', lock_state = 'N' \
             WHERE lock_state = 'L' RETURNING subject_id, subject_type",
        )
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        staged
            .into_iter()
            .map(|(id, t)| {
                let kind = decode_code("subject_type", &t, SubjectKind::from_code)?;
                Ok::<_, QueueError>((id, kind))
            })
            .collect()
    }

    async fn enqueue(&self, subject_id: i64, kind: SubjectKind) -> Result<(), QueueError> {
        let existing: Option<String> = sqlx::query_scalar(
            "SELECT status FROM mops_alert_queue WHERE subject_id = $1 AND subject_type = $2",
        )
        .bind(subject_id)
        .bind(kind.code().to_string())
        .fetch_optional(&self.pool)
        .await?;

        match existing {
            Some(s) if decode_code("status", &s, AlertStatus::from_code)? == AlertStatus::Done => {
                Err(QueueError::InvalidTransition {
                    subject_id,
                    kind,
                    from: AlertStatus::Done,
                    to: AlertStatus::New,
                })
            }
            Some(_) => Ok(()),
            None => {
                sqlx::query(
                    "INSERT INTO mops_alert_queue \
                     (subject_id, subject_type, status, lock_state, insertion_time) \
                     VALUES ($1, $2, 'N', 'N', NOW())",
                )
                .bind(subject_id)
                .bind(kind.code().to_string())
                .execute(&self.pool)
                .await?;
                Ok(())
            }
        }
    }

    async fn purge(&self, subject_id: i64, kind: SubjectKind) -> Result<bool, QueueError> {
        let result = sqlx::query(
            "DELETE FROM mops_alert_queue \
             WHERE subject_id = $1 AND subject_type = $2 AND status = 'D'",
        )
        .bind(subject_id)
        .bind(kind.code().to_string())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn records(&self) -> Result<Vec<QueueRecord>, QueueError> {
        let rows = sqlx::query_as::<_, QueueRow>(
            "SELECT subject_id, subject_type, status, lock_state, insertion_time \
             FROM mops_alert_queue ORDER BY insertion_time, subject_id",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|r| r.into_record().map_err(QueueError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_row_decodes_codes() {
        let row = QueueRow {
            subject_id: 3,
            subject_type: "T".to_string(),
            status: "R".to_string(),
            lock_state: "N".to_string(),
            insertion_time: Utc::now(),
        };
        let record = row.into_record().unwrap();
        assert_eq!(record.subject_kind, SubjectKind::Tracklet);
        assert_eq!(record.status, AlertStatus::Ready);
        assert_eq!(record.lock_state, LockState::Unlocked);
    }

    #[test]
    fn queue_row_rejects_unknown_status() {
        let row = QueueRow {
            subject_id: 3,
            subject_type: "D".to_string(),
            status: "Z".to_string(),
            lock_state: "N".to_string(),
            insertion_time: Utc::now(),
        };
        let err = row.into_record().unwrap_err();
        assert!(matches!(err, CoreError::UnknownCode { field: "status", code: 'Z' }));
    }

    #[test]
    fn derived_row_without_elements_has_no_orbit() {
        let row = DerivedObjectRow {
            derived_object_id: 1,
            q: Some(1.0),
            e: None,
            i: Some(3.0),
            node: None,
            arg_peri: None,
            time_peri: None,
            epoch: None,
            h_v: None,
            moid_1: None,
            moid_2: None,
            arc_length_days: None,
            synthetic: false,
        };
        assert!(row.orbit().is_none());
    }

    #[test]
    fn missing_magnitude_stays_missing() {
        let row = DerivedObjectRow {
            derived_object_id: 2,
            q: Some(6.0),
            e: Some(0.1),
            i: Some(10.0),
            node: None,
            arg_peri: None,
            time_peri: None,
            epoch: None,
            h_v: None,
            moid_1: None,
            moid_2: None,
            arc_length_days: None,
            synthetic: false,
        };
        let orbit = row.orbit().unwrap();
        assert_eq!(orbit.h_v, None);
        assert_eq!(orbit.q, 6.0);
    }
}
