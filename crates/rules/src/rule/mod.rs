//! Rule trait, the two scoped base variants, and per-rule configuration.
//!
//! A rule is built over a [`CandidatePool`]: its [`RuleBase`] keeps the
//! candidates of the rule's scope that pass the configured filters
//! (`newAlerts`), and [`Rule::evaluate`] returns the annotated subset that
//! matches the rule's predicate.

mod base;
mod error;

#[cfg(test)]
mod tests;

pub use self::base::{CandidatePool, RuleBase, RuleConfig, RuleScope};
pub use self::error::{ContractError, PredicateError, RuleError};

use tracing::warn;

use mops_core::AlertCandidate;

/// Message and subject line a matching rule attaches to a candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub subject: String,
    /// HTML fragment.
    pub message: String,
}

/// Result of evaluating one rule over its `newAlerts`.
#[derive(Debug, Default)]
pub struct Evaluation {
    /// Annotated copies of the matching candidates, in pool order.
    pub matches: Vec<AlertCandidate>,
    /// Candidates skipped because the predicate raised.
    pub predicate_errors: usize,
}

/// A compiled alert rule.
///
/// Implementations supply [`Rule::base`] and the per-candidate
/// [`Rule::check`]; the provided [`Rule::evaluate`] runs the check over
/// every admitted candidate.
pub trait Rule: Send + Sync {
    fn base(&self) -> &RuleBase;

    /// Test one candidate. `Ok(None)` means no match.
    fn check(&self, candidate: &AlertCandidate) -> Result<Option<Annotation>, PredicateError>;

    fn name(&self) -> &str {
        self.base().name()
    }

    fn channel(&self) -> &str {
        self.base().channel()
    }

    fn scope(&self) -> RuleScope {
        self.base().scope()
    }

    /// Evaluate the rule over its admitted candidates.
    ///
    /// A predicate error skips that candidate only. The returned matches are
    /// a subset of `newAlerts` with `message` and `subject_line` filled.
    fn evaluate(&self) -> Result<Evaluation, RuleError> {
        let mut out = Evaluation::default();
        for candidate in self.base().new_alerts() {
            match self.check(candidate) {
                Ok(Some(annotation)) => {
                    let mut matched = candidate.clone();
                    matched.subject_line = Some(annotation.subject);
                    matched.message = Some(annotation.message);
                    out.matches.push(matched);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        rule = %self.name(),
                        subject_id = candidate.id(),
                        kind = %candidate.kind(),
                        error = %e,
                        "predicate failed, candidate skipped"
                    );
                    out.predicate_errors += 1;
                }
            }
        }
        Ok(out)
    }
}
