//! [`PluginLoader`]: filesystem discovery of plugin manifests.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::core::{ActiveRule, RuleDefaults, RuleRegistry, RuleSet};
use super::error::{LoadResult, LoadStatus, PluginError, Result};
use super::manifest::{PluginManifest, RuleEntry, PLUGIN_KIND};

/// Initializer that turns a subdirectory into a plugin module.
const INITIALIZER: &str = "mod.yml";

/// Module names that hold shared bases, never rules of their own.
const BASE_MODULES: &[&str] = &["base.yml", "base.yaml"];

/// Filesystem-backed plugin loader.
///
/// Scans the plugin directory (one level deep) for manifests, parses each
/// module exactly once, and resolves its entries against a [`RuleRegistry`].
pub struct PluginLoader {
    plugin_dir: PathBuf,
}

impl PluginLoader {
    pub fn new(plugin_dir: impl Into<PathBuf>) -> Self {
        Self {
            plugin_dir: plugin_dir.into(),
        }
    }

    pub fn plugin_dir(&self) -> &Path {
        &self.plugin_dir
    }

    /// Discover, parse and resolve every plugin module.
    ///
    /// Fails only when the plugin directory itself cannot be read; a broken
    /// module is reported in the load results and skipped.
    pub fn load(&self, registry: &RuleRegistry, defaults: &RuleDefaults) -> Result<RuleSet> {
        let mut results = Vec::new();
        let modules = self.discover(&mut results)?;

        let mut seen_ids = HashSet::new();
        let mut active_names = HashSet::new();
        let mut active = Vec::new();

        for path in modules {
            let manifest = match self.load_file(&path) {
                Ok(m) => m,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to load plugin module");
                    results.push(LoadResult {
                        path,
                        status: LoadStatus::Failed {
                            error: e.to_string(),
                        },
                    });
                    continue;
                }
            };

            let plugin_id = manifest.metadata.id.clone();
            if !seen_ids.insert(plugin_id.clone()) {
                let error = format!("plugin '{}' is already loaded", plugin_id);
                warn!(path = %path.display(), plugin = %plugin_id, "duplicate plugin module");
                results.push(LoadResult {
                    path,
                    status: LoadStatus::Failed { error },
                });
                continue;
            }

            if !manifest.metadata.enabled {
                info!(plugin = %plugin_id, "plugin disabled, skipping");
                results.push(LoadResult {
                    path,
                    status: LoadStatus::Skipped {
                        reason: "disabled".to_string(),
                    },
                });
                continue;
            }

            let (rules, skipped) =
                resolve_entries(&plugin_id, &manifest, registry, defaults, &mut active_names);
            let names: Vec<String> = rules.iter().map(|r| r.name.clone()).collect();
            info!(plugin = %plugin_id, rules = ?names, path = %path.display(), "loaded plugin");
            active.extend(rules);
            results.push(LoadResult {
                path,
                status: LoadStatus::Loaded {
                    plugin_id,
                    rules: names,
                    skipped,
                },
            });
        }

        Ok(RuleSet::from_parts(active, results))
    }

    /// Collect plugin module paths in file-name order, recording skipped files.
    fn discover(&self, results: &mut Vec<LoadResult>) -> Result<Vec<PathBuf>> {
        let mut entries = fs::read_dir(&self.plugin_dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()?;
        entries.sort();

        let mut modules = Vec::new();
        for path in entries {
            let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                continue;
            };

            // Skip dotfiles/dotdirs
            if name.starts_with('.') {
                if path.is_file() {
                    results.push(skipped(path, "dotfile"));
                }
                continue;
            }

            if path.is_dir() {
                let init = path.join(INITIALIZER);
                if init.is_file() {
                    modules.push(init);
                } else {
                    results.push(skipped(path, "directory without mod.yml"));
                }
                continue;
            }

            if name == INITIALIZER || BASE_MODULES.contains(&name.as_str()) {
                results.push(skipped(path, "not a plugin module"));
                continue;
            }

            let is_yaml = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e == "yml" || e == "yaml")
                .unwrap_or(false);
            if !is_yaml {
                results.push(skipped(path, "not a YAML file"));
                continue;
            }

            modules.push(path);
        }
        Ok(modules)
    }

    /// Parse and validate a single manifest.
    pub fn load_file(&self, path: &Path) -> Result<PluginManifest> {
        let contents = fs::read_to_string(path)?;
        let manifest: PluginManifest = serde_yaml::from_str(&contents)?;

        if manifest.kind != PLUGIN_KIND {
            return Err(PluginError::Validation(format!(
                "expected kind '{}', found '{}'",
                PLUGIN_KIND, manifest.kind
            )));
        }
        if manifest.metadata.id.is_empty() {
            return Err(PluginError::Validation(
                "plugin metadata.id must not be empty".to_string(),
            ));
        }
        Ok(manifest)
    }
}

fn skipped(path: PathBuf, reason: &str) -> LoadResult {
    LoadResult {
        path,
        status: LoadStatus::Skipped {
            reason: reason.to_string(),
        },
    }
}

/// Turn a module's entries into active rules.
///
/// Each entry is checked on its own: malformed, private, abstract, reserved
/// and unknown entries are dropped and the rest kept. A rule name already
/// active in this or an earlier module is dropped as a duplicate.
fn resolve_entries(
    plugin_id: &str,
    manifest: &PluginManifest,
    registry: &RuleRegistry,
    defaults: &RuleDefaults,
    active_names: &mut HashSet<String>,
) -> (Vec<ActiveRule>, Vec<String>) {
    let mut rules = Vec::new();
    let mut skipped = Vec::new();

    for (idx, raw) in manifest.rules.iter().enumerate() {
        let entry: RuleEntry = match serde_yaml::from_value(raw.clone()) {
            Ok(e) => e,
            Err(e) => {
                warn!(plugin = %plugin_id, entry = idx, error = %e, "malformed rule entry dropped");
                skipped.push(format!("#{} (malformed)", idx));
                continue;
            }
        };

        if let Some(reason) = entry.exclusion() {
            skipped.push(format!("{} ({})", entry.name, reason));
            continue;
        }

        let Some(factory) = registry.resolve(entry.lookup_key()) else {
            warn!(plugin = %plugin_id, rule = %entry.lookup_key(), "unknown rule, entry dropped");
            skipped.push(format!("{} (unknown rule)", entry.name));
            continue;
        };

        if !active_names.insert(entry.name.clone()) {
            warn!(plugin = %plugin_id, rule = %entry.name, "rule already active, entry dropped");
            skipped.push(format!("{} (duplicate rule)", entry.name));
            continue;
        }

        rules.push(ActiveRule {
            name: entry.name.clone(),
            factory: *factory,
            config: defaults.config_for(factory, Some(&entry)),
        });
    }

    (rules, skipped)
}
