//! Plugin manifest schema.

use serde::{Deserialize, Serialize};

/// Required `kind` of a plugin manifest.
pub const PLUGIN_KIND: &str = "RulePlugin";

/// Names of the abstract rule bases; entries using them are never activated.
pub const RESERVED_NAMES: &[&str] = &["Rule", "TrackletRule", "DerivedObjectRule"];

/// A plugin module as read from disk.
///
/// `rules` stays raw YAML so that each entry is deserialized on its own and
/// one malformed entry does not take the module down.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginManifest {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub metadata: PluginMetadata,
    #[serde(default)]
    pub rules: Vec<serde_yaml::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PluginMetadata {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

/// One exported rule of a plugin module.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RuleEntry {
    /// Display name; also used to find the rule when `rule` is absent.
    pub name: String,
    /// Registry key of the compiled rule.
    #[serde(default)]
    pub rule: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub include_synthetic_objects: Option<bool>,
    #[serde(default)]
    pub min_arc_length: Option<f64>,
    /// Intermediate entries that only exist to be extended.
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
}

impl RuleEntry {
    /// Key used for the registry lookup.
    pub fn lookup_key(&self) -> &str {
        self.rule.as_deref().unwrap_or(&self.name)
    }

    /// Reason this entry must not be activated, if any.
    pub fn exclusion(&self) -> Option<&'static str> {
        if self.name.starts_with('_') {
            Some("private name")
        } else if self.is_abstract {
            Some("abstract")
        } else if RESERVED_NAMES.contains(&self.name.as_str()) {
            Some("reserved base name")
        } else {
            None
        }
    }
}
