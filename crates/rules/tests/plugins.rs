//! Integration tests that verify the shipped manifests in `plugins/`
//! activate the whole catalog with the expected configuration.

use mops_rules::registry::LoadStatus;
use mops_rules::{PluginLoader, RuleDefaults, RuleRegistry, RuleScope, RuleSet};

/// Resolve the plugin directory relative to the workspace root.
/// Integration tests run from the crate directory, so we go up two levels.
fn plugins_dir() -> std::path::PathBuf {
    let manifest = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest.join("../../plugins")
}

fn shipped() -> RuleSet {
    PluginLoader::new(plugins_dir())
        .load(&RuleRegistry::builtin(), &RuleDefaults::default())
        .unwrap_or_else(|e| panic!("Failed to load {}: {}", plugins_dir().display(), e))
}

#[test]
fn shipped_plugins_load_cleanly() {
    let set = shipped();
    assert_eq!(set.plugin_errors(), 0);
    for result in set.load_results() {
        if let LoadStatus::Loaded { plugin_id, skipped, .. } = &result.status {
            assert!(skipped.is_empty(), "{plugin_id} dropped entries: {skipped:?}");
        }
    }
}

#[test]
fn shipped_plugins_cover_the_catalog() {
    let set = shipped();
    let registry = RuleRegistry::builtin();
    assert_eq!(set.len(), registry.len());
    for factory in registry.iter() {
        assert!(
            set.iter().any(|r| r.key() == factory.key),
            "{} is not activated by any manifest",
            factory.key
        );
    }
}

#[test]
fn module_order_follows_file_names() {
    let set = shipped();
    let ids: Vec<_> = set
        .load_results()
        .iter()
        .filter_map(|r| match &r.status {
            LoadStatus::Loaded { plugin_id, .. } => Some(plugin_id.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(ids, vec!["families", "observations", "orbital", "sednas"]);
}

#[test]
fn shipped_channels_and_scopes() {
    let set = shipped();
    assert_eq!(set.get("Sednas").unwrap().config.channel, "schaller");
    assert_eq!(set.get("Centaurs").unwrap().config.channel, "all");
    assert_eq!(set.get("KnownAsteroid").unwrap().scope(), RuleScope::Tracklet);
    assert_eq!(
        set.get("UnlinkedFastMovers").unwrap().config.min_arc_length,
        Some(0.01)
    );
}
