//! Annotation contract every emitted alert must satisfy.

use mops_core::AlertCandidate;

use crate::rule::ContractError;

/// Verify a rule's match carries a non-empty message and subject line.
pub fn check_annotations(rule: &str, candidate: &AlertCandidate) -> Result<(), ContractError> {
    let missing = |field: &Option<String>| field.as_deref().map_or(true, |v| v.trim().is_empty());
    let what = match (missing(&candidate.message), missing(&candidate.subject_line)) {
        (false, false) => return Ok(()),
        (true, true) => "message and subject",
        (true, false) => "message",
        (false, true) => "subject",
    };
    Err(ContractError {
        rule: rule.to_string(),
        subject_id: candidate.id(),
        kind: candidate.kind(),
        missing: what,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mops_core::{AlertStatus, DerivedObject, Subject};

    fn candidate(message: Option<&str>, subject: Option<&str>) -> AlertCandidate {
        let mut c = AlertCandidate::new(
            "mops_test",
            AlertStatus::Ready,
            Subject::DerivedObject(DerivedObject {
                id: 8,
                orbit: None,
                tracklets: Vec::new(),
                arc_length_days: None,
                synthetic: false,
            }),
        );
        c.message = message.map(str::to_string);
        c.subject_line = subject.map(str::to_string);
        c
    }

    #[test]
    fn complete_annotation_passes() {
        assert!(check_annotations("Centaurs", &candidate(Some("<p/>"), Some("[a=1]"))).is_ok());
    }

    #[test]
    fn names_the_missing_field() {
        let err = check_annotations("Centaurs", &candidate(Some("<p/>"), Some(" "))).unwrap_err();
        assert_eq!(err.missing, "subject");
        assert_eq!(err.subject_id, 8);

        let err = check_annotations("Centaurs", &candidate(None, None)).unwrap_err();
        assert_eq!(err.missing, "message and subject");
        assert!(err.to_string().contains("rule 'Centaurs'"));
    }
}
