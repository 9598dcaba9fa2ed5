//! Runs the active rules over a candidate pool and collects their matches.
//!
//! Each rule is constructed over the pool, evaluated, and its matches are
//! checked against the annotation contract before being filed in a
//! [`ChannelMap`] under the rule's channel. A failing rule or candidate is
//! logged and counted; it never aborts the pass.

mod contract;

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use mops_notify::{ChannelMap, MessageRenderer, NotifyError};

use crate::registry::RuleSet;
use crate::rule::{CandidatePool, Rule};

pub use contract::check_annotations;

/// Error counters of one evaluation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EvaluationStats {
    pub rules_evaluated: usize,
    pub rules_failed: usize,
    pub predicate_errors: usize,
    pub contract_errors: usize,
}

// ── Rule evaluator ──────────────────────────────────────────────────

/// Evaluates rules and routes their matches by channel.
pub struct RuleEvaluator {
    renderer: Arc<MessageRenderer>,
}

impl RuleEvaluator {
    /// Build an evaluator with the standard message renderer.
    pub fn new() -> Result<Self, NotifyError> {
        Ok(Self::with_renderer(Arc::new(MessageRenderer::new()?)))
    }

    pub fn with_renderer(renderer: Arc<MessageRenderer>) -> Self {
        Self { renderer }
    }

    /// Evaluate every rule of `rules`, in order, over `pool`.
    pub fn evaluate(&self, rules: &RuleSet, pool: &CandidatePool) -> (ChannelMap, EvaluationStats) {
        let mut alerts = ChannelMap::new();
        let mut stats = EvaluationStats::default();

        for active in rules.iter() {
            let rule = active.instantiate(pool, Arc::clone(&self.renderer));
            self.evaluate_rule(rule.as_ref(), &mut alerts, &mut stats);
        }

        (alerts, stats)
    }

    /// Evaluate one constructed rule and file its valid matches.
    pub fn evaluate_rule(&self, rule: &dyn Rule, alerts: &mut ChannelMap, stats: &mut EvaluationStats) {
        let evaluation = match rule.evaluate() {
            Ok(e) => e,
            Err(e) => {
                warn!(rule = %rule.name(), error = %e, "rule failed, skipping");
                stats.rules_failed += 1;
                return;
            }
        };
        stats.rules_evaluated += 1;
        stats.predicate_errors += evaluation.predicate_errors;

        let mut filed = 0usize;
        for candidate in evaluation.matches {
            if let Err(e) = check_annotations(rule.name(), &candidate) {
                warn!(rule = %rule.name(), error = %e, "alert dropped");
                stats.contract_errors += 1;
                continue;
            }
            alerts.push(rule.channel(), rule.name(), candidate);
            filed += 1;
        }

        debug!(
            rule = %rule.name(),
            channel = %rule.channel(),
            candidates = rule.base().new_alerts().len(),
            matches = filed,
            "rule evaluated"
        );
    }
}
