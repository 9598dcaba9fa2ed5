use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u16(profile: &str, key: &str, default: u16) -> u16 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    profiled_env_opt(profile, key)
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub postgres: PostgresConfig,
    pub engine: EngineConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `MOPS_PROFILE`. When set (e.g. `PROD`), every key
    /// is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("MOPS_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            postgres: PostgresConfig::from_env_profiled(p),
            engine: EngineConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  postgres:    host={}, db={}", self.postgres.host, self.postgres.database);
        tracing::info!(
            "  engine:      plugin_dir={}, channel={}, synthetic={}, min_arc={:?}",
            self.engine.plugin_dir.display(),
            self.engine.channel.as_deref().unwrap_or("(per rule)"),
            self.engine.include_synthetic,
            self.engine.min_arc_length,
        );
    }
}

// ── PostgreSQL ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub ssl_mode: String,
    pub max_connections: u32,
}

impl PostgresConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "PG_HOST", "localhost"),
            port: profiled_env_u16(p, "PG_PORT", 5432),
            database: profiled_env_or(p, "PG_DATABASE", "mops"),
            username: profiled_env_opt(p, "PG_USERNAME"),
            password: profiled_env_opt(p, "PG_PASSWORD"),
            ssl_mode: profiled_env_or(p, "PG_SSL_MODE", "prefer"),
            max_connections: profiled_env_u32(p, "PG_MAX_CONNECTIONS", 4),
        }
    }

    pub fn connection_string(&self) -> String {
        let user = self.username.as_deref().unwrap_or("postgres");
        let pass = self.password.as_deref().unwrap_or("");
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            user, pass, self.host, self.port, self.database, self.ssl_mode
        )
    }

    pub fn is_configured(&self) -> bool {
        self.username.is_some()
    }
}

// ── Alert engine ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory scanned for rule plugin manifests.
    pub plugin_dir: PathBuf,
    /// Channel forced on every rule whose manifest entry does not set one.
    pub channel: Option<String>,
    /// Admit synthetic-tagged subjects.
    pub include_synthetic: bool,
    /// Exclude subjects whose arc (days) is shorter than this.
    pub min_arc_length: Option<f64>,
    /// Where the JSON-lines publisher appends alert records.
    pub alert_log: Option<PathBuf>,
}

impl EngineConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            plugin_dir: PathBuf::from(profiled_env_or(p, "MOPS_PLUGIN_DIR", "plugins")),
            channel: profiled_env_opt(p, "MOPS_CHANNEL"),
            include_synthetic: profiled_env_bool(p, "MOPS_INCLUDE_SYNTHETIC", false),
            min_arc_length: profiled_env_opt(p, "MOPS_MIN_ARC_LENGTH").and_then(|v| v.parse().ok()),
            alert_log: profiled_env_opt(p, "MOPS_ALERT_LOG").map(PathBuf::from),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            plugin_dir: PathBuf::from("plugins"),
            channel: None,
            include_synthetic: false,
            min_arc_length: None,
            alert_log: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_string_uses_defaults() {
        let pg = PostgresConfig {
            host: "db.local".to_string(),
            port: 5433,
            database: "mops_night".to_string(),
            username: None,
            password: None,
            ssl_mode: "disable".to_string(),
            max_connections: 2,
        };
        assert_eq!(
            pg.connection_string(),
            "postgres://postgres:@db.local:5433/mops_night?sslmode=disable"
        );
        assert!(!pg.is_configured());
    }

    #[test]
    fn engine_defaults() {
        let cfg = EngineConfig::default();
        assert!(cfg.channel.is_none());
        assert!(!cfg.include_synthetic);
        assert!(cfg.min_arc_length.is_none());
    }
}
