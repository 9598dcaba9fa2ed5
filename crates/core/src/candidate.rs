use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::orbit::Orbit;
use crate::tracklet::{DerivedObject, Tracklet};

/// Well-known channel every rule publishes to unless configured otherwise.
pub const DEFAULT_CHANNEL: &str = "all";

/// Processing status of a queued subject. Ordered `New < Ready < Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertStatus {
    New,
    Ready,
    Done,
}

impl AlertStatus {
    /// Single-character code stored in the queue table.
    pub fn code(&self) -> char {
        match self {
            AlertStatus::New => 'N',
            AlertStatus::Ready => 'R',
            AlertStatus::Done => 'D',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'N' => Some(AlertStatus::New),
            'R' => Some(AlertStatus::Ready),
            'D' => Some(AlertStatus::Done),
            _ => None,
        }
    }

    /// Whether moving from `self` to `to` is allowed.
    ///
    /// Forward steps only: NEW to READY, READY to DONE. Re-staging a READY row
    /// left over from an interrupted run and writing DONE over DONE are no-ops.
    pub fn can_transition_to(&self, to: AlertStatus) -> bool {
        matches!(
            (self, to),
            (AlertStatus::New, AlertStatus::Ready)
                | (AlertStatus::Ready, AlertStatus::Ready)
                | (AlertStatus::Ready, AlertStatus::Done)
                | (AlertStatus::Done, AlertStatus::Done)
        )
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertStatus::New => write!(f, "NEW"),
            AlertStatus::Ready => write!(f, "READY"),
            AlertStatus::Done => write!(f, "DONE"),
        }
    }
}

impl FromStr for AlertStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(AlertStatus::New),
            "READY" => Ok(AlertStatus::Ready),
            "DONE" => Ok(AlertStatus::Done),
            other => Err(format!("unknown alert status: '{}'", other)),
        }
    }
}

/// Type of subject a queue row refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubjectKind {
    Derived,
    Tracklet,
}

impl SubjectKind {
    pub fn code(&self) -> char {
        match self {
            SubjectKind::Derived => 'D',
            SubjectKind::Tracklet => 'T',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'D' => Some(SubjectKind::Derived),
            'T' => Some(SubjectKind::Tracklet),
            _ => None,
        }
    }
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectKind::Derived => write!(f, "DERIVED"),
            SubjectKind::Tracklet => write!(f, "TRACKLET"),
        }
    }
}

/// The object an alert is about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Subject {
    DerivedObject(DerivedObject),
    Tracklet(Tracklet),
}

impl Subject {
    pub fn id(&self) -> i64 {
        match self {
            Subject::DerivedObject(d) => d.id,
            Subject::Tracklet(t) => t.id,
        }
    }

    pub fn kind(&self) -> SubjectKind {
        match self {
            Subject::DerivedObject(_) => SubjectKind::Derived,
            Subject::Tracklet(_) => SubjectKind::Tracklet,
        }
    }

    /// Orbit of the subject: the derived object's own, or the one a tracklet inherits.
    pub fn orbit(&self) -> Option<&Orbit> {
        match self {
            Subject::DerivedObject(d) => d.orbit.as_ref(),
            Subject::Tracklet(t) => t.orbit.as_ref(),
        }
    }

    pub fn arc_length_days(&self) -> Option<f64> {
        match self {
            Subject::DerivedObject(d) => d.arc_length_days,
            Subject::Tracklet(t) => t.arc_length_days,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        match self {
            Subject::DerivedObject(d) => d.synthetic,
            Subject::Tracklet(t) => t.synthetic,
        }
    }

    pub fn as_derived_object(&self) -> Option<&DerivedObject> {
        match self {
            Subject::DerivedObject(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_tracklet(&self) -> Option<&Tracklet> {
        match self {
            Subject::Tracklet(t) => Some(t),
            _ => None,
        }
    }
}

/// A queued subject as handed to the rules, plus the annotations a matching
/// rule attaches to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertCandidate {
    /// Database the subject lives in; used in message links.
    pub dbname: String,
    pub status: AlertStatus,
    pub subject: Subject,
    /// HTML fragment describing the match.
    #[serde(default)]
    pub message: Option<String>,
    /// Short one-line summary of the match.
    #[serde(default)]
    pub subject_line: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
}

impl AlertCandidate {
    pub fn new(dbname: impl Into<String>, status: AlertStatus, subject: Subject) -> Self {
        Self {
            dbname: dbname.into(),
            status,
            subject,
            message: None,
            subject_line: None,
            channel: None,
        }
    }

    /// Stable identifier of the candidate (the subject ID).
    pub fn id(&self) -> i64 {
        self.subject.id()
    }

    pub fn kind(&self) -> SubjectKind {
        self.subject.kind()
    }

    /// Queue key `(subject_id, kind)`.
    pub fn key(&self) -> (i64, SubjectKind) {
        (self.id(), self.kind())
    }

    /// Channel the candidate was tagged with, or the default.
    pub fn channel_or_default(&self) -> &str {
        self.channel.as_deref().unwrap_or(DEFAULT_CHANNEL)
    }

    /// Both `message` and `subject_line` are present and non-empty.
    pub fn is_annotated(&self) -> bool {
        let filled = |s: &Option<String>| s.as_deref().is_some_and(|v| !v.trim().is_empty());
        filled(&self.message) && filled(&self.subject_line)
    }
}
