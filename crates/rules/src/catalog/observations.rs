//! Predicates on tracklets and their clearing-house submissions.

use std::sync::Arc;

use mops_core::{AlertCandidate, TrackletStatus};
use mops_notify::MessageRenderer;

use super::{orbit_annotation, plain_annotation};
use crate::rule::{Annotation, PredicateError, Rule, RuleBase};

const HIGH_DIGEST: f64 = 20.0;
const FAST_MOVER_VTOT: f64 = 0.99;

/// Designations, upper-cased, that always raise an alert when observed.
pub const KNOWN_OBJECT_WATCHLIST: &[&str] = &["1990 KN1", "J90K01N"];

fn wrong_subject(rule: &str, candidate: &AlertCandidate) -> PredicateError {
    PredicateError::WrongSubject {
        rule: rule.to_string(),
        kind: candidate.kind(),
    }
}

/// Derived objects with a tracklet whose best submission scored above 20.
pub struct HighDigestDO {
    base: RuleBase,
    renderer: Arc<MessageRenderer>,
}

impl Rule for HighDigestDO {
    fn base(&self) -> &RuleBase {
        &self.base
    }

    fn check(&self, candidate: &AlertCandidate) -> Result<Option<Annotation>, PredicateError> {
        let obj = candidate
            .subject
            .as_derived_object()
            .ok_or_else(|| wrong_subject(self.name(), candidate))?;
        let Some(digest) = obj.max_digest().filter(|d| *d > HIGH_DIGEST) else {
            return Ok(None);
        };

        let headline = format!("High digest ({:.1})", digest);
        let details = vec![("digest".to_string(), format!("{:.1}", digest))];
        let annotation = match obj.orbit.as_ref() {
            Some(orbit) => orbit_annotation(&self.renderer, candidate, &headline, orbit, details)?,
            None => plain_annotation(&self.renderer, candidate, &headline, headline.clone(), details)?,
        };
        Ok(Some(annotation))
    }
}

/// Tracklets attributed to an object on the watchlist.
pub struct KnownAsteroid {
    base: RuleBase,
    renderer: Arc<MessageRenderer>,
}

impl Rule for KnownAsteroid {
    fn base(&self) -> &RuleBase {
        &self.base
    }

    fn check(&self, candidate: &AlertCandidate) -> Result<Option<Annotation>, PredicateError> {
        let tracklet = candidate
            .subject
            .as_tracklet()
            .ok_or_else(|| wrong_subject(self.name(), candidate))?;
        let Some(name) = tracklet.known_name.as_deref().map(str::to_uppercase) else {
            return Ok(None);
        };
        if !KNOWN_OBJECT_WATCHLIST.contains(&name.as_str()) {
            return Ok(None);
        }

        let subject = format!("Known Object {} vTot={:.3}", name, tracklet.v_tot);
        let details = vec![
            ("designation".to_string(), name),
            ("vTot".to_string(), format!("{:.3} deg/day", tracklet.v_tot)),
            ("magnitude".to_string(), format!("{:.1}", tracklet.magnitude)),
        ];
        plain_annotation(&self.renderer, candidate, "Known Object", subject, details).map(Some)
    }
}

/// Unattributed tracklets moving faster than 0.99 deg/day.
pub struct UnlinkedFastMovers {
    base: RuleBase,
    renderer: Arc<MessageRenderer>,
}

impl Rule for UnlinkedFastMovers {
    fn base(&self) -> &RuleBase {
        &self.base
    }

    fn check(&self, candidate: &AlertCandidate) -> Result<Option<Annotation>, PredicateError> {
        let tracklet = candidate
            .subject
            .as_tracklet()
            .ok_or_else(|| wrong_subject(self.name(), candidate))?;
        if tracklet.status != TrackletStatus::Unattributed || tracklet.v_tot <= FAST_MOVER_VTOT {
            return Ok(None);
        }

        let subject = format!(
            "Unlinked Fast Mover vTot={:.3} (vRA={:.3}, vDec={:.3})",
            tracklet.v_tot, tracklet.v_ra, tracklet.v_dec
        );
        let details = vec![
            ("vTot".to_string(), format!("{:.3} deg/day", tracklet.v_tot)),
            ("epoch".to_string(), format!("{:.5} MJD", tracklet.epoch)),
            ("magnitude".to_string(), format!("{:.1}", tracklet.magnitude)),
        ];
        plain_annotation(&self.renderer, candidate, "Unlinked Fast Mover", subject, details)
            .map(Some)
    }
}

pub fn high_digest_do(base: RuleBase, renderer: Arc<MessageRenderer>) -> Box<dyn Rule> {
    Box::new(HighDigestDO { base, renderer })
}

pub fn known_asteroid(base: RuleBase, renderer: Arc<MessageRenderer>) -> Box<dyn Rule> {
    Box::new(KnownAsteroid { base, renderer })
}

pub fn unlinked_fast_movers(base: RuleBase, renderer: Arc<MessageRenderer>) -> Box<dyn Rule> {
    Box::new(UnlinkedFastMovers { base, renderer })
}
