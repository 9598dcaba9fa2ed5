//! Error types raised while evaluating rules.

use mops_core::SubjectKind;
use mops_notify::NotifyError;

/// A predicate could not decide on one candidate.
#[derive(Debug, thiserror::Error)]
pub enum PredicateError {
    /// The subject kind does not carry what the rule inspects.
    #[error("{rule} cannot inspect a {kind} subject")]
    WrongSubject { rule: String, kind: SubjectKind },

    /// Numeric evaluation produced an unusable value.
    #[error("compute error: {0}")]
    Compute(String),

    /// The alert message could not be rendered.
    #[error("render error: {0}")]
    Render(#[from] NotifyError),
}

/// A whole rule failed; the run skips it and continues.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("rule '{rule}' failed: {reason}")]
    Failed { rule: String, reason: String },
}

/// A rule returned a match without the annotations publishers need.
#[derive(Debug, thiserror::Error)]
#[error("rule '{rule}' returned {kind} {subject_id} without {missing}")]
pub struct ContractError {
    pub rule: String,
    pub subject_id: i64,
    pub kind: SubjectKind,
    pub missing: &'static str,
}
