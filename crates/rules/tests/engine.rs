//! End-to-end alert runs against the in-memory store.

use std::sync::Arc;

use async_trait::async_trait;

use mops_core::{
    AlertCandidate, AlertStatus, DerivedObject, Orbit, SubjectKind, Submission, Tracklet,
    TrackletStatus,
};
use mops_notify::{Dispatcher, JsonLinesPublisher, Publisher};
use mops_queue::{AlertStore, Fixture, MemoryAlertStore, QueueError, QueueRecord};
use mops_rules::{AlertEngine, EngineError, PluginLoader, RuleDefaults, RuleRegistry, RuleSet};

// ── Fixtures ────────────────────────────────────────────────────────

fn derived(id: i64, orbit: Option<Orbit>) -> DerivedObject {
    DerivedObject {
        id,
        orbit,
        tracklets: Vec::new(),
        arc_length_days: Some(4.0),
        synthetic: false,
    }
}

fn tracklet(id: i64, status: TrackletStatus, v_tot: f64, known: Option<&str>) -> Tracklet {
    Tracklet {
        id,
        derived_object_id: None,
        v_tot,
        v_ra: v_tot,
        v_dec: 0.0,
        epoch: 55200.5,
        magnitude: 20.4,
        status,
        known_name: known.map(str::to_string),
        arc_length_days: None,
        synthetic: false,
        orbit: None,
        submissions: Vec::new(),
    }
}

fn with_digests(mut obj: DerivedObject, digests: &[f64]) -> DerivedObject {
    for (n, d) in digests.iter().enumerate() {
        let mut t = tracklet(obj.id * 100 + n as i64, TrackletStatus::Linked, 0.2, None);
        t.submissions.push(Submission {
            tracklet_id: t.id,
            digest: *d,
            desig: format!("K{}", t.id),
        });
        obj.tracklets.push(t);
    }
    obj
}

async fn add_derived(store: &MemoryAlertStore, obj: DerivedObject) {
    let id = obj.id;
    store.insert_derived_object(obj);
    store.enqueue(id, SubjectKind::Derived).await.unwrap();
}

async fn add_tracklet(store: &MemoryAlertStore, t: Tracklet) {
    let id = t.id;
    store.insert_tracklet(t);
    store.enqueue(id, SubjectKind::Tracklet).await.unwrap();
}

/// One subject per scenario, all queued as NEW.
async fn night() -> Arc<MemoryAlertStore> {
    let store = Arc::new(MemoryAlertStore::new("mops_night"));
    add_derived(&store, derived(1, Some(Orbit::from_elements(6.0, 0.1, 10.0, 12.0)))).await;
    add_derived(&store, derived(2, Some(Orbit::from_elements(1.0, 0.7, 20.0, 16.0)))).await;
    add_derived(&store, derived(3, Some(Orbit::from_elements(30.0, 0.5, 5.0, 8.0)))).await;
    add_derived(&store, derived(4, Some(Orbit::from_elements(31.0, 0.5, 5.0, 8.0)))).await;
    add_derived(&store, with_digests(derived(5, None), &[10.0, 25.0])).await;
    add_derived(&store, with_digests(derived(6, None), &[5.0, 15.0])).await;
    add_tracklet(&store, tracklet(20, TrackletStatus::Attributed, 0.4, Some("j90k01n"))).await;
    add_tracklet(&store, tracklet(21, TrackletStatus::Unattributed, 1.01, None)).await;
    add_tracklet(&store, tracklet(22, TrackletStatus::Unattributed, 0.98, None)).await;
    add_tracklet(&store, tracklet(23, TrackletStatus::Attributed, 1.5, None)).await;
    store
}

fn engine(store: Arc<dyn AlertStore>) -> AlertEngine {
    let rules = RuleSet::builtin(&RuleRegistry::builtin(), &RuleDefaults::default());
    AlertEngine::new(store, rules).unwrap()
}

fn matched(alerts: &mops_notify::ChannelMap, rule: &str) -> Vec<i64> {
    alerts
        .iter()
        .flat_map(|(_, entries)| entries.iter())
        .filter(|e| e.rule == rule)
        .map(|e| e.candidate.id())
        .collect()
}

fn statuses(records: &[QueueRecord]) -> Vec<((i64, SubjectKind), AlertStatus)> {
    records.iter().map(|r| (r.key(), r.status)).collect()
}

// ── Scenarios ───────────────────────────────────────────────────────

#[tokio::test]
async fn nightly_run_matches_each_scenario() {
    let store = night().await;
    let outcome = engine(store.clone()).run().await.unwrap();
    let alerts = &outcome.alerts;

    assert_eq!(matched(alerts, "Centaurs"), vec![1]);
    assert!(matched(alerts, "Comets").contains(&2));
    assert_eq!(matched(alerts, "DistantPlanets"), vec![4]);
    assert_eq!(matched(alerts, "HighDigestDO"), vec![5]);
    assert_eq!(matched(alerts, "KnownAsteroid"), vec![20]);
    assert_eq!(matched(alerts, "UnlinkedFastMovers"), vec![21]);

    let centaur = alerts
        .get("all")
        .iter()
        .find(|e| e.rule == "Centaurs")
        .unwrap();
    assert!(centaur
        .candidate
        .subject_line
        .as_deref()
        .unwrap()
        .contains("a=6.667,e=0.100,q=6.000,i=10.000"));

    let known = alerts
        .get("all")
        .iter()
        .find(|e| e.rule == "KnownAsteroid")
        .unwrap();
    assert!(known
        .candidate
        .subject_line
        .as_deref()
        .unwrap()
        .starts_with("Known Object J90K01N"));

    let report = &outcome.report;
    assert_eq!(report.candidates_processed, 10);
    assert_eq!(report.rules_evaluated, 13);
    assert_eq!(report.rules_failed, 0);
    assert_eq!(report.contract_errors, 0);
    assert_eq!(report.total_matches(), alerts.len());
}

#[tokio::test]
async fn every_alert_is_annotated_and_tagged() {
    let store = night().await;
    let outcome = engine(store).run().await.unwrap();

    assert!(!outcome.alerts.is_empty());
    for (channel, entries) in outcome.alerts.iter() {
        for entry in entries {
            assert!(entry.candidate.is_annotated(), "{} lacks annotations", entry.rule);
            assert_eq!(entry.candidate.channel.as_deref(), Some(channel));
        }
    }
}

#[tokio::test]
async fn completed_run_marks_everything_done() {
    let store = night().await;
    engine(store.clone()).run().await.unwrap();

    let records = store.records().await.unwrap();
    assert_eq!(records.len(), 10);
    assert!(records.iter().all(|r| r.status == AlertStatus::Done));
}

#[tokio::test]
async fn rerun_over_done_queue_is_idempotent() {
    let store = night().await;
    let engine = engine(store.clone());
    engine.run().await.unwrap();
    let before = statuses(&store.records().await.unwrap());

    let outcome = engine.run().await.unwrap();
    assert!(outcome.alerts.is_empty());
    assert_eq!(outcome.report.candidates_processed, 0);
    assert_eq!(statuses(&store.records().await.unwrap()), before);
}

#[tokio::test]
async fn status_never_moves_backward_across_runs() {
    let store = night().await;
    let engine = engine(store.clone());
    engine.run().await.unwrap();

    // A DONE subject cannot be re-queued without a purge.
    let err = store.enqueue(1, SubjectKind::Derived).await.unwrap_err();
    assert!(matches!(err, QueueError::InvalidTransition { .. }));

    assert!(store.purge(1, SubjectKind::Derived).await.unwrap());
    store.enqueue(1, SubjectKind::Derived).await.unwrap();
    let outcome = engine.run().await.unwrap();
    assert_eq!(outcome.report.candidates_processed, 1);
    assert_eq!(matched(&outcome.alerts, "Centaurs"), vec![1]);

    let records = store.records().await.unwrap();
    assert!(records.iter().all(|r| r.status == AlertStatus::Done));
}

#[tokio::test]
async fn interrupted_run_is_picked_up_again() {
    let store = night().await;
    // Intake ran but the run never completed.
    let staged = store.intake().await.unwrap();
    assert_eq!(staged.len(), 10);

    let outcome = engine(store.clone()).run().await.unwrap();
    assert_eq!(outcome.report.candidates_processed, 10);
    assert_eq!(matched(&outcome.alerts, "Centaurs"), vec![1]);
}

#[tokio::test]
async fn synthetic_subjects_need_opt_in() {
    let store = Arc::new(MemoryAlertStore::new("mops_sim"));
    let mut obj = derived(1, Some(Orbit::from_elements(6.0, 0.1, 10.0, 12.0)));
    obj.synthetic = true;
    add_derived(&store, obj).await;

    let outcome = engine(store.clone()).run().await.unwrap();
    assert!(outcome.alerts.is_empty());

    store.purge(1, SubjectKind::Derived).await.unwrap();
    store.enqueue(1, SubjectKind::Derived).await.unwrap();
    let defaults = RuleDefaults {
        include_synthetic_objects: true,
        ..RuleDefaults::default()
    };
    let rules = RuleSet::builtin(&RuleRegistry::builtin(), &defaults);
    let outcome = AlertEngine::new(store, rules).unwrap().run().await.unwrap();
    assert_eq!(matched(&outcome.alerts, "Centaurs"), vec![1]);
}

#[tokio::test]
async fn sedna_goes_to_private_channel() {
    let store = Arc::new(MemoryAlertStore::new("mops_night"));
    add_derived(&store, derived(9, Some(Orbit::from_elements(76.0, 0.85, 11.9, 1.6)))).await;

    let outcome = engine(store).run().await.unwrap();
    let schaller = outcome.alerts.get("schaller");
    assert_eq!(schaller.len(), 1);
    assert_eq!(schaller[0].rule, "Sednas");
    // The same object also matches DistantPlanets on the shared channel.
    assert_eq!(matched(&outcome.alerts, "DistantPlanets"), vec![9]);
}

#[tokio::test]
async fn rule_named_by_two_modules_alerts_once() {
    let dir = tempfile::TempDir::new().unwrap();
    for id in ["a", "b"] {
        std::fs::write(
            dir.path().join(format!("{id}.yml")),
            format!(
                "apiVersion: v1\nkind: RulePlugin\nmetadata:\n  id: {id}\n  name: {id}\nrules:\n  - name: Centaurs\n    rule: centaurs\n"
            ),
        )
        .unwrap();
    }
    let rules = PluginLoader::new(dir.path())
        .load(&RuleRegistry::builtin(), &RuleDefaults::default())
        .unwrap();
    assert_eq!(rules.names(), vec!["Centaurs"]);

    let store = Arc::new(MemoryAlertStore::new("mops_night"));
    add_derived(&store, derived(1, Some(Orbit::from_elements(6.0, 0.1, 10.0, 12.0)))).await;
    let outcome = AlertEngine::new(store, rules).unwrap().run().await.unwrap();

    assert_eq!(matched(&outcome.alerts, "Centaurs"), vec![1]);
    assert_eq!(outcome.report.total_matches(), 1);
}

#[tokio::test]
async fn alerts_reach_the_jsonl_publisher() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("alerts.jsonl");
    let publisher: Box<dyn Publisher> = Box::new(JsonLinesPublisher::new(&path).unwrap());
    let dispatcher = Dispatcher::with_defaults(vec![publisher]);

    let outcome = engine(night().await).run().await.unwrap();
    let results = dispatcher.dispatch(&outcome.alerts).await;
    assert!(results.iter().all(|r| r.success));

    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents.lines().count(), outcome.alerts.len());
    for line in contents.lines() {
        let record: mops_notify::AlertRecord = serde_json::from_str(line).unwrap();
        assert_eq!(record.dbname, "mops_night");
        assert!(!record.message.is_empty() && !record.subject.is_empty());
    }
}

#[tokio::test]
async fn demo_fixture_drives_a_dry_run() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/night.json");
    let raw = std::fs::read_to_string(&path).unwrap();
    let fixture: Fixture = serde_json::from_str(&raw).unwrap();

    let store = Arc::new(MemoryAlertStore::new("mops_demo"));
    assert_eq!(store.seed(fixture).await.unwrap(), 5);

    let outcome = engine(store).run().await.unwrap();
    assert_eq!(matched(&outcome.alerts, "Centaurs"), vec![1]);
    assert_eq!(matched(&outcome.alerts, "Sednas"), vec![2]);
    assert_eq!(matched(&outcome.alerts, "Impactors"), vec![3]);
    assert_eq!(matched(&outcome.alerts, "HighDigestDO"), vec![3]);
    assert_eq!(matched(&outcome.alerts, "KnownAsteroid"), vec![20]);
    assert_eq!(matched(&outcome.alerts, "UnlinkedFastMovers"), vec![21]);
}

// ── Storage failures ────────────────────────────────────────────────

/// Store whose database is unreachable.
struct Unreachable;

fn down() -> QueueError {
    QueueError::Storage("connection refused".to_string())
}

#[async_trait]
impl AlertStore for Unreachable {
    fn dbname(&self) -> &str {
        "mops_down"
    }

    async fn fetch_candidates(
        &self,
        _kind: SubjectKind,
        _status: AlertStatus,
    ) -> Result<Vec<AlertCandidate>, QueueError> {
        Err(down())
    }

    async fn fetch_derived_object(
        &self,
        _id: i64,
        _dbname: &str,
    ) -> Result<Option<DerivedObject>, QueueError> {
        Err(down())
    }

    async fn fetch_tracklets(&self, _id: i64) -> Result<Vec<Tracklet>, QueueError> {
        Err(down())
    }

    async fn fetch_submissions(&self, _id: i64) -> Result<Vec<Submission>, QueueError> {
        Err(down())
    }

    async fn update_status(
        &self,
        _subject_id: i64,
        _kind: SubjectKind,
        _status: AlertStatus,
    ) -> Result<(), QueueError> {
        Err(down())
    }

    async fn intake(&self) -> Result<Vec<(i64, SubjectKind)>, QueueError> {
        Err(down())
    }

    async fn enqueue(&self, _subject_id: i64, _kind: SubjectKind) -> Result<(), QueueError> {
        Err(down())
    }

    async fn purge(&self, _subject_id: i64, _kind: SubjectKind) -> Result<bool, QueueError> {
        Err(down())
    }

    async fn records(&self) -> Result<Vec<QueueRecord>, QueueError> {
        Err(down())
    }
}

#[tokio::test]
async fn storage_failure_aborts_the_run() {
    let err = engine(Arc::new(Unreachable)).run().await.unwrap_err();
    assert!(matches!(err, EngineError::Storage(ref e) if e.is_storage()));
}
