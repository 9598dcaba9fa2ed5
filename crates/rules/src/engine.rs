//! One alert run: stage the queue, evaluate every rule, complete the queue.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use mops_core::{AlertStatus, SubjectKind};
use mops_notify::{ChannelMap, NotifyError};
use mops_queue::{AlertStore, QueueError};

use crate::evaluator::RuleEvaluator;
use crate::registry::RuleSet;
use crate::rule::CandidatePool;

/// Errors that abort a run.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Intake, candidate fetch or completion failed.
    #[error("storage error: {0}")]
    Storage(#[from] QueueError),

    /// The message renderer could not be built.
    #[error("renderer error: {0}")]
    Renderer(#[from] NotifyError),
}

/// Summary of one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub rules_evaluated: usize,
    pub rules_failed: usize,
    pub candidates_processed: usize,
    pub matches_per_channel: BTreeMap<String, usize>,
    pub predicate_errors: usize,
    pub contract_errors: usize,
    pub plugin_errors: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub fn total_matches(&self) -> usize {
        self.matches_per_channel.values().sum()
    }
}

/// Report and alerts of a completed run.
#[derive(Debug)]
pub struct RunOutcome {
    pub report: RunReport,
    pub alerts: ChannelMap,
}

/// Drives alert runs against one store with a fixed rule set.
///
/// Runs are strictly sequential: `run` takes `&self` but callers must not
/// start a second run before the first returns.
pub struct AlertEngine {
    store: Arc<dyn AlertStore>,
    rules: RuleSet,
    evaluator: RuleEvaluator,
}

impl AlertEngine {
    pub fn new(store: Arc<dyn AlertStore>, rules: RuleSet) -> Result<Self, EngineError> {
        Ok(Self {
            store,
            rules,
            evaluator: RuleEvaluator::new()?,
        })
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn store(&self) -> &Arc<dyn AlertStore> {
        &self.store
    }

    /// Perform one run.
    ///
    /// Storage failures during intake, fetch or completion abort the run;
    /// rule and candidate failures are counted in the report.
    pub async fn run(&self) -> Result<RunOutcome, EngineError> {
        let started_at = Utc::now();

        let staged = self.store.intake().await?;
        info!(db = %self.store.dbname(), staged = staged.len(), "intake complete");

        let pool = CandidatePool::new(
            self.store
                .fetch_candidates(SubjectKind::Derived, AlertStatus::Ready)
                .await?,
            self.store
                .fetch_candidates(SubjectKind::Tracklet, AlertStatus::Ready)
                .await?,
        );

        let (alerts, stats) = self.evaluator.evaluate(&self.rules, &pool);

        for (subject_id, kind) in &staged {
            self.store
                .update_status(*subject_id, *kind, AlertStatus::Done)
                .await?;
        }

        let report = RunReport {
            rules_evaluated: stats.rules_evaluated,
            rules_failed: stats.rules_failed,
            candidates_processed: pool.len(),
            matches_per_channel: alerts.counts(),
            predicate_errors: stats.predicate_errors,
            contract_errors: stats.contract_errors,
            plugin_errors: self.rules.plugin_errors(),
            started_at,
            finished_at: Utc::now(),
        };

        info!(
            rules_evaluated = report.rules_evaluated,
            rules_failed = report.rules_failed,
            candidates = report.candidates_processed,
            matches = ?report.matches_per_channel,
            predicate_errors = report.predicate_errors,
            contract_errors = report.contract_errors,
            plugin_errors = report.plugin_errors,
            "alert run complete"
        );

        Ok(RunOutcome { report, alerts })
    }
}
