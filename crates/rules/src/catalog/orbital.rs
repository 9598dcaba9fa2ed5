//! Predicates on a derived object's orbital elements.
//!
//! Every rule here is a [`OrbitRule`]: a subject without an orbit never
//! matches, and a match is annotated with the element summary.

use std::sync::Arc;

use mops_core::{AlertCandidate, Orbit};
use mops_notify::MessageRenderer;

use super::math::{three_figure_elements, tisserand};
use super::orbit_annotation;
use crate::rule::{Annotation, PredicateError, Rule, RuleBase};

type OrbitPredicate = fn(&Orbit) -> Result<bool, PredicateError>;

/// A rule that tests the subject's orbit with a single predicate.
pub struct OrbitRule {
    base: RuleBase,
    renderer: Arc<MessageRenderer>,
    headline: &'static str,
    predicate: OrbitPredicate,
}

impl OrbitRule {
    pub fn new(
        base: RuleBase,
        renderer: Arc<MessageRenderer>,
        headline: &'static str,
        predicate: OrbitPredicate,
    ) -> Self {
        Self {
            base,
            renderer,
            headline,
            predicate,
        }
    }
}

impl Rule for OrbitRule {
    fn base(&self) -> &RuleBase {
        &self.base
    }

    fn check(&self, candidate: &AlertCandidate) -> Result<Option<Annotation>, PredicateError> {
        let Some(orbit) = candidate.subject.orbit() else {
            return Ok(None);
        };
        if !(self.predicate)(orbit)? {
            return Ok(None);
        }
        orbit_annotation(&self.renderer, candidate, self.headline, orbit, Vec::new()).map(Some)
    }
}

// ── Predicates ──────────────────────────────────────────────────────

const CENTAUR_MIN: f64 = 5.2;
const CENTAUR_MAX: f64 = 29.0;
const DISTANT_A: f64 = 60.0;
const IMPACTOR_MOID: f64 = 0.005;
const SEDNA_Q: f64 = 50.0;

pub fn is_centaur(orbit: &Orbit) -> Result<bool, PredicateError> {
    let Some(a) = orbit.semi_major_axis() else {
        return Ok(false);
    };
    let inside = |x: f64| CENTAUR_MIN < x && x < CENTAUR_MAX;
    Ok(inside(a) && inside(orbit.q))
}

pub fn is_comet(orbit: &Orbit) -> Result<bool, PredicateError> {
    let Some(t_j) = tisserand(orbit) else {
        return Ok(false);
    };
    if !t_j.is_finite() {
        return Err(PredicateError::Compute(format!(
            "Tisserand parameter undefined for q={}, e={}",
            orbit.q, orbit.e
        )));
    }
    Ok(t_j < 3.0)
}

pub fn is_distant_planet(orbit: &Orbit) -> Result<bool, PredicateError> {
    Ok(orbit.semi_major_axis().is_some_and(|a| a > DISTANT_A))
}

pub fn is_hyperbolic(orbit: &Orbit) -> Result<bool, PredicateError> {
    Ok(orbit.e > 1.0)
}

pub fn is_impactor(orbit: &Orbit) -> Result<bool, PredicateError> {
    let close = |moid: Option<f64>| moid.is_some_and(|m| m < IMPACTOR_MOID);
    Ok(close(orbit.moid_1) || close(orbit.moid_2))
}

pub fn is_sedna(orbit: &Orbit) -> Result<bool, PredicateError> {
    Ok(orbit.q > SEDNA_Q)
}

/// Encke family, compared at three significant figures.
pub fn is_encke_family(orbit: &Orbit) -> Result<bool, PredicateError> {
    Ok(three_figure_elements(orbit)
        .is_some_and(|(a, e, i)| e > 0.8 && (2.0..=2.5).contains(&a) && i > 4.0))
}

/// Phaethon family, compared at three significant figures.
pub fn is_phaethon_family(orbit: &Orbit) -> Result<bool, PredicateError> {
    Ok(three_figure_elements(orbit)
        .is_some_and(|(a, e, i)| e > 0.7 && (0.9..=1.8).contains(&a) && i > 14.0))
}

/// Thule family, compared at three significant figures.
pub fn is_thule_family(orbit: &Orbit) -> Result<bool, PredicateError> {
    Ok(three_figure_elements(orbit).is_some_and(|(a, _, _)| (4.25..=4.35).contains(&a)))
}

/// Hilda family. An unbound orbit has no `a` and simply does not match.
pub fn is_hilda_family(orbit: &Orbit) -> Result<bool, PredicateError> {
    Ok(orbit
        .semi_major_axis()
        .is_some_and(|a| (3.7..=4.2).contains(&a) && orbit.e <= 0.3 && orbit.i <= 20.0))
}

// ── Constructors ────────────────────────────────────────────────────

pub fn centaurs(base: RuleBase, renderer: Arc<MessageRenderer>) -> Box<dyn Rule> {
    Box::new(OrbitRule::new(base, renderer, "Centaur", is_centaur))
}

pub fn comets(base: RuleBase, renderer: Arc<MessageRenderer>) -> Box<dyn Rule> {
    Box::new(OrbitRule::new(base, renderer, "Cometary orbit", is_comet))
}

pub fn distant_planets(base: RuleBase, renderer: Arc<MessageRenderer>) -> Box<dyn Rule> {
    Box::new(OrbitRule::new(base, renderer, "Distant object", is_distant_planet))
}

pub fn hyperbolics(base: RuleBase, renderer: Arc<MessageRenderer>) -> Box<dyn Rule> {
    Box::new(OrbitRule::new(base, renderer, "Hyperbolic orbit", is_hyperbolic))
}

pub fn impactors(base: RuleBase, renderer: Arc<MessageRenderer>) -> Box<dyn Rule> {
    Box::new(OrbitRule::new(base, renderer, "Possible impactor", is_impactor))
}

pub fn sednas(base: RuleBase, renderer: Arc<MessageRenderer>) -> Box<dyn Rule> {
    Box::new(OrbitRule::new(base, renderer, "Sedna-like object", is_sedna))
}

pub fn encke_family(base: RuleBase, renderer: Arc<MessageRenderer>) -> Box<dyn Rule> {
    Box::new(OrbitRule::new(base, renderer, "Encke family", is_encke_family))
}

pub fn phaethon_family(base: RuleBase, renderer: Arc<MessageRenderer>) -> Box<dyn Rule> {
    Box::new(OrbitRule::new(base, renderer, "Phaethon family", is_phaethon_family))
}

pub fn thule_family(base: RuleBase, renderer: Arc<MessageRenderer>) -> Box<dyn Rule> {
    Box::new(OrbitRule::new(base, renderer, "Thule family", is_thule_family))
}

pub fn hilda_family(base: RuleBase, renderer: Arc<MessageRenderer>) -> Box<dyn Rule> {
    Box::new(OrbitRule::new(base, renderer, "Hilda family", is_hilda_family))
}
