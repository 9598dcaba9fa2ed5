//! The built-in rule catalog.
//!
//! Ten orbital predicates over derived objects and three predicates over
//! tracklets and submissions. [`BUILTIN`] lists one factory per rule, in
//! registry order.

pub mod math;
pub mod observations;
pub mod orbital;


use mops_core::{AlertCandidate, Orbit};
use mops_notify::{ElementsContext, MessageContext, MessageRenderer};

use crate::registry::RuleFactory;
use crate::rule::{Annotation, PredicateError, RuleScope};

pub use self::math::round_sig;

/// Private channel of the Sedna watcher.
pub const SCHALLER_CHANNEL: &str = "schaller";

/// Annotation listing the orbit's elements. The subject line is the
/// headline followed by the bracketed element summary.
pub(crate) fn orbit_annotation(
    renderer: &MessageRenderer,
    candidate: &AlertCandidate,
    headline: &str,
    orbit: &Orbit,
    details: Vec<(String, String)>,
) -> Result<Annotation, PredicateError> {
    let elements = ElementsContext::from_orbit(orbit);
    let subject = format!("{} {}", headline, elements.summary());
    let mut ctx = MessageContext::new(headline, &candidate.dbname, candidate.kind(), candidate.id())
        .with_elements(elements);
    ctx.details = details;
    Ok(Annotation {
        subject,
        message: renderer.render(&ctx)?,
    })
}

/// Annotation with a rule-specific subject line and no element table.
pub(crate) fn plain_annotation(
    renderer: &MessageRenderer,
    candidate: &AlertCandidate,
    headline: &str,
    subject: String,
    details: Vec<(String, String)>,
) -> Result<Annotation, PredicateError> {
    let mut ctx = MessageContext::new(headline, &candidate.dbname, candidate.kind(), candidate.id());
    ctx.details = details;
    Ok(Annotation {
        subject,
        message: renderer.render(&ctx)?,
    })
}

const fn orbit_rule(
    key: &'static str,
    name: &'static str,
    description: &'static str,
    construct: crate::registry::RuleConstructor,
) -> RuleFactory {
    RuleFactory {
        key,
        name,
        scope: RuleScope::DerivedObject,
        default_channel: None,
        description,
        construct,
    }
}

/// Every rule shipped with the engine.
pub static BUILTIN: &[RuleFactory] = &[
    orbit_rule("centaurs", "Centaurs", "5.2 < a < 29 and 5.2 < q < 29", orbital::centaurs),
    orbit_rule("comets", "Comets", "Tisserand parameter below 3", orbital::comets),
    orbit_rule("distant_planets", "DistantPlanets", "a > 60", orbital::distant_planets),
    orbit_rule(
        "encke_family",
        "EnckeFamily",
        "e > 0.8, 2.0 <= a <= 2.5, i > 4 (three figures)",
        orbital::encke_family,
    ),
    orbit_rule(
        "phaethon_family",
        "PhaethonFamily",
        "e > 0.7, 0.9 <= a <= 1.8, i > 14 (three figures)",
        orbital::phaethon_family,
    ),
    orbit_rule(
        "thule_family",
        "ThuleFamily",
        "4.25 <= a <= 4.35 (three figures)",
        orbital::thule_family,
    ),
    orbit_rule(
        "hilda_family",
        "HildaFamily",
        "3.7 <= a <= 4.2, e <= 0.3, i <= 20",
        orbital::hilda_family,
    ),
    orbit_rule("hyperbolics", "Hyperbolics", "e > 1", orbital::hyperbolics),
    orbit_rule("impactors", "Impactors", "either MOID below 0.005 AU", orbital::impactors),
    RuleFactory {
        key: "sednas",
        name: "Sednas",
        scope: RuleScope::DerivedObject,
        default_channel: Some(SCHALLER_CHANNEL),
        description: "q > 50",
        construct: orbital::sednas,
    },
    RuleFactory {
        key: "high_digest_do",
        name: "HighDigestDO",
        scope: RuleScope::DerivedObject,
        default_channel: None,
        description: "a tracklet's best submission has digest > 20",
        construct: observations::high_digest_do,
    },
    RuleFactory {
        key: "known_asteroid",
        name: "KnownAsteroid",
        scope: RuleScope::Tracklet,
        default_channel: None,
        description: "known designation is on the watchlist",
        construct: observations::known_asteroid,
    },
    RuleFactory {
        key: "unlinked_fast_movers",
        name: "UnlinkedFastMovers",
        scope: RuleScope::Tracklet,
        default_channel: None,
        description: "unattributed and vTot > 0.99 deg/day",
        construct: observations::unlinked_fast_movers,
    },
];
