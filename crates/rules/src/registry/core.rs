//! [`RuleRegistry`] of compiled rules and the [`RuleSet`] activated from it.

use std::fmt;
use std::sync::Arc;

use mops_core::config::EngineConfig;
use mops_core::DEFAULT_CHANNEL;
use mops_notify::MessageRenderer;

use crate::catalog;
use crate::rule::{CandidatePool, Rule, RuleBase, RuleConfig, RuleScope};

use super::error::{LoadResult, PluginError, Result};
use super::manifest::RuleEntry;

/// Builds a rule over an already filtered [`RuleBase`].
pub type RuleConstructor = fn(RuleBase, Arc<MessageRenderer>) -> Box<dyn Rule>;

/// Registration record of one compiled rule.
#[derive(Debug, Clone, Copy)]
pub struct RuleFactory {
    /// Stable key used by manifests, e.g. `centaurs`.
    pub key: &'static str,
    /// Display name, e.g. `Centaurs`.
    pub name: &'static str,
    pub scope: RuleScope,
    /// Channel used when neither the manifest nor the engine sets one.
    pub default_channel: Option<&'static str>,
    pub description: &'static str,
    pub construct: RuleConstructor,
}

/// Compiled rules, keyed by [`RuleFactory::key`], in registration order.
#[derive(Debug, Default)]
pub struct RuleRegistry {
    factories: Vec<RuleFactory>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in catalog.
    pub fn builtin() -> Self {
        Self {
            factories: catalog::BUILTIN.to_vec(),
        }
    }

    pub fn register(&mut self, factory: RuleFactory) -> Result<()> {
        if self.get(factory.key).is_some() {
            return Err(PluginError::Duplicate(factory.key.to_string()));
        }
        self.factories.push(factory);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&RuleFactory> {
        self.factories.iter().find(|f| f.key == key)
    }

    /// Look up by key, falling back to the display name.
    pub fn resolve(&self, key_or_name: &str) -> Option<&RuleFactory> {
        self.get(key_or_name)
            .or_else(|| self.factories.iter().find(|f| f.name == key_or_name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &RuleFactory> {
        self.factories.iter()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

/// Engine-wide configuration applied beneath per-entry manifest settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleDefaults {
    /// Forces every rule's channel unless its manifest entry sets one.
    pub channel: Option<String>,
    pub include_synthetic_objects: bool,
    pub min_arc_length: Option<f64>,
}

impl RuleDefaults {
    pub fn from_engine_config(config: &EngineConfig) -> Self {
        Self {
            channel: config.channel.clone(),
            include_synthetic_objects: config.include_synthetic,
            min_arc_length: config.min_arc_length,
        }
    }

    /// Resolve a rule's configuration.
    ///
    /// Channel precedence: manifest entry, engine override, the rule's own
    /// default, then `all`. The filters take the entry's value when set.
    pub fn config_for(&self, factory: &RuleFactory, entry: Option<&RuleEntry>) -> RuleConfig {
        let channel = entry
            .and_then(|e| e.channel.clone())
            .or_else(|| self.channel.clone())
            .or_else(|| factory.default_channel.map(str::to_string))
            .unwrap_or_else(|| DEFAULT_CHANNEL.to_string());
        RuleConfig {
            include_synthetic_objects: entry
                .and_then(|e| e.include_synthetic_objects)
                .unwrap_or(self.include_synthetic_objects),
            channel,
            min_arc_length: entry.and_then(|e| e.min_arc_length).or(self.min_arc_length),
        }
    }
}

/// A rule chosen to run, with its resolved configuration.
#[derive(Debug, Clone)]
pub struct ActiveRule {
    pub name: String,
    pub factory: RuleFactory,
    pub config: RuleConfig,
}

impl ActiveRule {
    pub fn key(&self) -> &'static str {
        self.factory.key
    }

    pub fn scope(&self) -> RuleScope {
        self.factory.scope
    }

    /// Construct the rule over this run's candidates.
    pub fn instantiate(&self, pool: &CandidatePool, renderer: Arc<MessageRenderer>) -> Box<dyn Rule> {
        let base = RuleBase::new(self.name.clone(), self.factory.scope, self.config.clone(), pool);
        (self.factory.construct)(base, renderer)
    }
}

impl fmt::Display for ActiveRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {}) -> {}",
            self.name,
            self.factory.key,
            self.factory.scope.base_name(),
            self.config.channel
        )
    }
}

/// Ordered rules for one engine start plus the plugin load report.
#[derive(Debug, Default)]
pub struct RuleSet {
    rules: Vec<ActiveRule>,
    load_results: Vec<LoadResult>,
}

impl RuleSet {
    /// Every registered rule with default configuration.
    pub fn builtin(registry: &RuleRegistry, defaults: &RuleDefaults) -> Self {
        let rules = registry
            .iter()
            .map(|factory| ActiveRule {
                name: factory.name.to_string(),
                factory: *factory,
                config: defaults.config_for(factory, None),
            })
            .collect();
        Self {
            rules,
            load_results: Vec::new(),
        }
    }

    pub(crate) fn from_parts(rules: Vec<ActiveRule>, load_results: Vec<LoadResult>) -> Self {
        Self { rules, load_results }
    }

    pub fn rules(&self) -> &[ActiveRule] {
        &self.rules
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActiveRule> {
        self.rules.iter()
    }

    pub fn get(&self, name: &str) -> Option<&ActiveRule> {
        self.rules.iter().find(|r| r.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn load_results(&self) -> &[LoadResult] {
        &self.load_results
    }

    /// Number of plugin modules that failed to load.
    pub fn plugin_errors(&self) -> usize {
        self.load_results.iter().filter(|r| r.is_failed()).count()
    }
}
