//! Tests for the rule base and the provided `evaluate`.

use mops_core::{
    AlertCandidate, AlertStatus, DerivedObject, Subject, Tracklet, TrackletStatus,
};

use super::*;

fn derived(id: i64, arc: Option<f64>, synthetic: bool) -> AlertCandidate {
    AlertCandidate::new(
        "mops_test",
        AlertStatus::Ready,
        Subject::DerivedObject(DerivedObject {
            id,
            orbit: None,
            tracklets: Vec::new(),
            arc_length_days: arc,
            synthetic,
        }),
    )
}

fn tracklet(id: i64) -> AlertCandidate {
    AlertCandidate::new(
        "mops_test",
        AlertStatus::Ready,
        Subject::Tracklet(Tracklet {
            id,
            derived_object_id: None,
            v_tot: 0.5,
            v_ra: 0.3,
            v_dec: 0.4,
            epoch: 55000.0,
            magnitude: 20.0,
            status: TrackletStatus::Unattributed,
            known_name: None,
            arc_length_days: None,
            synthetic: false,
            orbit: None,
            submissions: Vec::new(),
        }),
    )
}

fn pool() -> CandidatePool {
    CandidatePool::new(
        vec![
            derived(1, Some(5.0), false),
            derived(2, Some(0.5), false),
            derived(3, None, true),
            derived(4, None, false),
        ],
        vec![tracklet(10), tracklet(11)],
    )
}

/// Matches even IDs, raises on ID 4.
struct EvenIds {
    base: RuleBase,
}

impl Rule for EvenIds {
    fn base(&self) -> &RuleBase {
        &self.base
    }

    fn check(&self, candidate: &AlertCandidate) -> Result<Option<Annotation>, PredicateError> {
        if candidate.id() == 4 {
            return Err(PredicateError::Compute("boom".to_string()));
        }
        Ok((candidate.id() % 2 == 0).then(|| Annotation {
            subject: format!("even {}", candidate.id()),
            message: "<p>even</p>".to_string(),
        }))
    }
}

#[test]
fn variants_draw_from_their_scope() {
    let pool = pool();
    let derived = RuleBase::derived_object("D", RuleConfig::default(), &pool);
    let tracklets = RuleBase::tracklet("T", RuleConfig::default(), &pool);

    assert!(derived.new_alerts().iter().all(|c| c.subject.as_derived_object().is_some()));
    assert_eq!(tracklets.new_alerts().len(), 2);
    assert_eq!(tracklets.scope(), RuleScope::Tracklet);
}

#[test]
fn synthetic_subjects_excluded_by_default() {
    let pool = pool();
    let base = RuleBase::derived_object("D", RuleConfig::default(), &pool);
    let ids: Vec<_> = base.new_alerts().iter().map(|c| c.id()).collect();
    assert_eq!(ids, vec![1, 2, 4]);

    let config = RuleConfig {
        include_synthetic_objects: true,
        ..RuleConfig::default()
    };
    let base = RuleBase::derived_object("D", config, &pool);
    assert_eq!(base.new_alerts().len(), 4);
}

#[test]
fn min_arc_length_admits_unknown_arcs() {
    let pool = pool();
    let config = RuleConfig {
        min_arc_length: Some(1.0),
        ..RuleConfig::default()
    };
    let base = RuleBase::derived_object("D", config, &pool);
    let ids: Vec<_> = base.new_alerts().iter().map(|c| c.id()).collect();
    assert_eq!(ids, vec![1, 4]);
}

#[test]
fn config_defaults_to_all_channel() {
    let config: RuleConfig = serde_yaml::from_str("minArcLength: 2.5").unwrap();
    assert_eq!(config.channel, "all");
    assert_eq!(config.min_arc_length, Some(2.5));
    assert!(!config.include_synthetic_objects);
}

#[test]
fn evaluate_annotates_matches_and_counts_errors() {
    let pool = pool();
    let rule = EvenIds {
        base: RuleBase::derived_object("EvenIds", RuleConfig::default(), &pool),
    };

    let eval = rule.evaluate().unwrap();
    let ids: Vec<_> = eval.matches.iter().map(|c| c.id()).collect();
    assert_eq!(ids, vec![2]);
    assert_eq!(eval.predicate_errors, 1);
    assert!(eval.matches[0].is_annotated());
    // The rule's own copy stays untouched.
    assert!(rule.base().new_alerts().iter().all(|c| c.message.is_none()));
}
