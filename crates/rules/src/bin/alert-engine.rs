//! alert-engine: batch driver of the alert rule engine.
//!
//! Sub-commands:
//! - `run`: stage the queue, evaluate every active rule, publish the alerts
//! - `schedule --cron "<expr>"`: repeat `run` on a cron schedule
//! - `rules`: list the active rule set and the plugin load report

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use mops_core::config::{load_dotenv, EngineConfig};
use mops_core::Config;
use mops_notify::{Dispatcher, JsonLinesPublisher, LogPublisher, Publisher};
use mops_queue::{AlertStore, Fixture, MemoryAlertStore, PgAlertStore};
use mops_rules::registry::LoadStatus;
use mops_rules::{AlertEngine, PluginLoader, RuleDefaults, RuleRegistry, RuleSet, RunSchedule};

// ── CLI ─────────────────────────────────────────────────────────────

/// Moving-object alert rule engine.
#[derive(Parser, Debug)]
#[command(name = "alert-engine", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory scanned for rule plugin manifests.
    #[arg(long, global = true)]
    plugin_dir: Option<PathBuf>,

    /// Ignore the plugin directory and activate every built-in rule.
    #[arg(long, global = true)]
    builtin: bool,

    /// Channel forced on every rule whose manifest entry does not set one.
    #[arg(long, global = true)]
    channel: Option<String>,

    /// Admit synthetic-tagged subjects.
    #[arg(long, global = true)]
    include_synthetic: bool,

    /// Exclude subjects whose arc (days) is shorter than this.
    #[arg(long, global = true)]
    min_arc_length: Option<f64>,

    /// Append published alerts to this JSON-lines file.
    #[arg(long, global = true)]
    alert_log: Option<PathBuf>,

    /// Use an in-memory store instead of PostgreSQL.
    #[arg(long, global = true)]
    dry_run: bool,

    /// JSON file of subjects queued as NEW in the in-memory store.
    #[arg(long, global = true, requires = "dry_run")]
    fixture: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Perform one run and publish its alerts.
    Run,
    /// Repeat runs on a cron schedule.
    Schedule {
        /// 5- or 6-field cron expression.
        #[arg(long)]
        cron: String,
    },
    /// List the active rules and the plugin load report.
    Rules,
}

impl Cli {
    /// Apply command-line overrides on top of the environment.
    fn apply(&self, engine: &mut EngineConfig) {
        if let Some(dir) = &self.plugin_dir {
            engine.plugin_dir = dir.clone();
        }
        if let Some(channel) = &self.channel {
            engine.channel = Some(channel.clone());
        }
        if self.include_synthetic {
            engine.include_synthetic = true;
        }
        if self.min_arc_length.is_some() {
            engine.min_arc_length = self.min_arc_length;
        }
        if let Some(path) = &self.alert_log {
            engine.alert_log = Some(path.clone());
        }
    }
}

// ── Setup ───────────────────────────────────────────────────────────

fn load_rules(engine: &EngineConfig, builtin: bool) -> anyhow::Result<RuleSet> {
    let registry = RuleRegistry::builtin();
    let defaults = RuleDefaults::from_engine_config(engine);

    if builtin {
        return Ok(RuleSet::builtin(&registry, &defaults));
    }
    if !engine.plugin_dir.is_dir() {
        warn!(
            path = %engine.plugin_dir.display(),
            "plugin directory not found, activating built-in rules"
        );
        return Ok(RuleSet::builtin(&registry, &defaults));
    }

    PluginLoader::new(&engine.plugin_dir)
        .load(&registry, &defaults)
        .with_context(|| format!("reading plugin directory {}", engine.plugin_dir.display()))
}

async fn memory_store(config: &Config, fixture: Option<&Path>) -> anyhow::Result<MemoryAlertStore> {
    let store = MemoryAlertStore::new(config.postgres.database.clone());
    let Some(path) = fixture else {
        return Ok(store);
    };

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading fixture {}", path.display()))?;
    let fixture: Fixture = serde_json::from_str(&raw)
        .with_context(|| format!("parsing fixture {}", path.display()))?;
    let queued = store.seed(fixture).await?;

    info!(path = %path.display(), queued, "fixture loaded");
    Ok(store)
}

fn build_dispatcher(engine: &EngineConfig) -> anyhow::Result<Dispatcher> {
    let mut publishers: Vec<Box<dyn Publisher>> = vec![Box::new(LogPublisher)];
    if let Some(path) = &engine.alert_log {
        publishers.push(Box::new(JsonLinesPublisher::new(path)?));
    }
    Ok(Dispatcher::with_defaults(publishers))
}

fn print_rules(rules: &RuleSet) {
    println!("Active rules ({}):", rules.len());
    for rule in rules.iter() {
        println!("  {}", rule);
    }
    if rules.load_results().is_empty() {
        return;
    }
    println!("Plugin load report:");
    for result in rules.load_results() {
        let path = result.path.display();
        match &result.status {
            LoadStatus::Loaded { plugin_id, rules, skipped } => {
                println!("  {path}: loaded '{plugin_id}' {rules:?}");
                if !skipped.is_empty() {
                    println!("    skipped: {}", skipped.join(", "));
                }
            }
            LoadStatus::Skipped { reason } => println!("  {path}: skipped ({reason})"),
            LoadStatus::Failed { error } => println!("  {path}: FAILED {error}"),
        }
    }
}

// ── Runs ────────────────────────────────────────────────────────────

async fn run_once(engine: &AlertEngine, dispatcher: &Dispatcher) -> anyhow::Result<()> {
    let outcome = engine.run().await?;

    let results = dispatcher.dispatch(&outcome.alerts).await;
    let failed = results.iter().filter(|r| !r.success).count();
    if failed > 0 {
        warn!(failed, total = results.len(), "some alerts were not published");
    }

    println!("{}", serde_json::to_string_pretty(&outcome.report)?);
    Ok(())
}

async fn run_scheduled(
    engine: &AlertEngine,
    dispatcher: &Dispatcher,
    schedule: &RunSchedule,
) -> anyhow::Result<()> {
    info!(cron = %schedule.expr(), "scheduler started");
    loop {
        let Some(delay) = schedule.delay_from(Utc::now()) else {
            info!(cron = %schedule.expr(), "schedule has no further ticks");
            return Ok(());
        };

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown requested");
                return Ok(());
            }
        }

        // A failed run is retried on the next tick.
        if let Err(e) = run_once(engine, dispatcher).await {
            error!(error = %e, "scheduled run failed");
        }
    }
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    load_dotenv();
    let mut config = Config::from_env();
    cli.apply(&mut config.engine);
    config.log_summary();

    let rules = load_rules(&config.engine, cli.builtin)?;
    if rules.plugin_errors() > 0 {
        warn!(errors = rules.plugin_errors(), "some plugin modules failed to load");
    }

    let schedule = match &cli.command {
        Command::Rules => {
            print_rules(&rules);
            return Ok(());
        }
        Command::Run => None,
        Command::Schedule { cron } => Some(RunSchedule::parse(cron)?),
    };

    let store: Arc<dyn AlertStore> = if cli.dry_run {
        info!("dry run: using in-memory store");
        Arc::new(memory_store(&config, cli.fixture.as_deref()).await?)
    } else {
        Arc::new(
            PgAlertStore::connect(&config.postgres)
                .await
                .context("connecting to PostgreSQL")?,
        )
    };

    let dispatcher = build_dispatcher(&config.engine)?;
    let engine = AlertEngine::new(store, rules)?;

    match schedule {
        Some(schedule) => run_scheduled(&engine, &dispatcher, &schedule).await?,
        None => run_once(&engine, &dispatcher).await?,
    }

    info!("alert-engine exited cleanly");
    Ok(())
}
