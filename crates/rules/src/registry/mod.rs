//! Rule registry and plugin manifest loading.
//!
//! Rules are compiled types registered under a stable key. YAML plugin
//! manifests in the plugin directory choose which of them run and with what
//! configuration; the result is an ordered [`RuleSet`].

mod core;
mod error;
mod loader;
mod manifest;


pub use self::core::{ActiveRule, RuleConstructor, RuleDefaults, RuleFactory, RuleRegistry, RuleSet};
pub use self::error::{LoadResult, LoadStatus, PluginError, Result};
pub use self::loader::PluginLoader;
pub use self::manifest::{PluginManifest, PluginMetadata, RuleEntry, PLUGIN_KIND, RESERVED_NAMES};
