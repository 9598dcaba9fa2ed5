//! Rule engine of the moving-object alert pipeline.
//!
//! This crate provides:
//! - `Rule` trait with the derived-object and tracklet base variants
//! - Built-in catalog of orbital and tracklet predicates
//! - `RuleRegistry` and YAML plugin manifests choosing the active rules
//! - Evaluator routing annotated matches to channels
//! - `AlertEngine` driving a run against the alert queue
//! - Cron scheduling of repeated runs

pub mod catalog;
pub mod engine;
pub mod evaluator;
pub mod registry;
pub mod rule;
pub mod scheduler;

pub use engine::{AlertEngine, EngineError, RunOutcome, RunReport};
pub use evaluator::{EvaluationStats, RuleEvaluator};
pub use registry::{PluginLoader, RuleDefaults, RuleRegistry, RuleSet};
pub use rule::{CandidatePool, Rule, RuleBase, RuleConfig, RuleScope};
pub use scheduler::RunSchedule;
