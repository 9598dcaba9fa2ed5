//! Shared state of every rule: scope, configuration and admitted candidates.

use serde::{Deserialize, Serialize};

use mops_core::{AlertCandidate, SubjectKind, DEFAULT_CHANNEL};

/// Which queue a rule draws its candidates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleScope {
    DerivedObject,
    Tracklet,
}

impl RuleScope {
    pub fn subject_kind(&self) -> SubjectKind {
        match self {
            RuleScope::DerivedObject => SubjectKind::Derived,
            RuleScope::Tracklet => SubjectKind::Tracklet,
        }
    }

    /// Name of the abstract base type for this scope.
    pub fn base_name(&self) -> &'static str {
        match self {
            RuleScope::DerivedObject => "DerivedObjectRule",
            RuleScope::Tracklet => "TrackletRule",
        }
    }
}

/// Per-rule configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleConfig {
    /// Admit subjects tagged synthetic.
    #[serde(default)]
    pub include_synthetic_objects: bool,
    #[serde(default = "default_channel")]
    pub channel: String,
    /// Exclude subjects whose arc, in days, is known and shorter than this.
    #[serde(default)]
    pub min_arc_length: Option<f64>,
}

fn default_channel() -> String {
    DEFAULT_CHANNEL.to_string()
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            include_synthetic_objects: false,
            channel: default_channel(),
            min_arc_length: None,
        }
    }
}

impl RuleConfig {
    /// Whether a candidate passes the synthetic and arc-length filters.
    ///
    /// A subject with unknown arc length is admitted.
    pub fn admits(&self, candidate: &AlertCandidate) -> bool {
        if candidate.subject.is_synthetic() && !self.include_synthetic_objects {
            return false;
        }
        match (self.min_arc_length, candidate.subject.arc_length_days()) {
            (Some(min), Some(arc)) => arc >= min,
            _ => true,
        }
    }
}

/// Candidates staged for one run, split by scope.
#[derive(Debug, Clone, Default)]
pub struct CandidatePool {
    derived_objects: Vec<AlertCandidate>,
    tracklets: Vec<AlertCandidate>,
}

impl CandidatePool {
    pub fn new(derived_objects: Vec<AlertCandidate>, tracklets: Vec<AlertCandidate>) -> Self {
        Self {
            derived_objects,
            tracklets,
        }
    }

    pub fn for_scope(&self, scope: RuleScope) -> &[AlertCandidate] {
        match scope {
            RuleScope::DerivedObject => &self.derived_objects,
            RuleScope::Tracklet => &self.tracklets,
        }
    }

    pub fn len(&self) -> usize {
        self.derived_objects.len() + self.tracklets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// State shared by every rule.
///
/// `DerivedObjectRule` and `TrackletRule` are the two constructors; each
/// copies the candidates of its scope that the configuration admits.
#[derive(Debug, Clone)]
pub struct RuleBase {
    name: String,
    scope: RuleScope,
    config: RuleConfig,
    new_alerts: Vec<AlertCandidate>,
}

impl RuleBase {
    pub fn new(
        name: impl Into<String>,
        scope: RuleScope,
        config: RuleConfig,
        pool: &CandidatePool,
    ) -> Self {
        let new_alerts = pool
            .for_scope(scope)
            .iter()
            .filter(|c| config.admits(c))
            .cloned()
            .collect();
        Self {
            name: name.into(),
            scope,
            config,
            new_alerts,
        }
    }

    pub fn derived_object(name: impl Into<String>, config: RuleConfig, pool: &CandidatePool) -> Self {
        Self::new(name, RuleScope::DerivedObject, config, pool)
    }

    pub fn tracklet(name: impl Into<String>, config: RuleConfig, pool: &CandidatePool) -> Self {
        Self::new(name, RuleScope::Tracklet, config, pool)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scope(&self) -> RuleScope {
        self.scope
    }

    pub fn config(&self) -> &RuleConfig {
        &self.config
    }

    pub fn channel(&self) -> &str {
        &self.config.channel
    }

    pub fn new_alerts(&self) -> &[AlertCandidate] {
        &self.new_alerts
    }
}
