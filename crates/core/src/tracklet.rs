use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::orbit::Orbit;

/// Lifecycle state of a tracklet inside the linking pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrackletStatus {
    /// Not yet linked or attributed to any known object.
    Unattributed,
    /// Attributed to an existing derived object.
    Attributed,
    /// Linked with other tracklets into a new derived object.
    Linked,
    /// Found by precovery against an existing orbit.
    Precovered,
    /// Rejected by a downstream stage.
    Killed,
}

impl TrackletStatus {
    /// Single-character code used in the tracklet table.
    pub fn code(&self) -> char {
        match self {
            TrackletStatus::Unattributed => 'U',
            TrackletStatus::Attributed => 'A',
            TrackletStatus::Linked => 'L',
            TrackletStatus::Precovered => 'P',
            TrackletStatus::Killed => 'K',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'U' => Some(TrackletStatus::Unattributed),
            'A' => Some(TrackletStatus::Attributed),
            'L' => Some(TrackletStatus::Linked),
            'P' => Some(TrackletStatus::Precovered),
            'K' => Some(TrackletStatus::Killed),
            _ => None,
        }
    }
}

impl fmt::Display for TrackletStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackletStatus::Unattributed => write!(f, "UNATTRIBUTED"),
            TrackletStatus::Attributed => write!(f, "ATTRIBUTED"),
            TrackletStatus::Linked => write!(f, "LINKED"),
            TrackletStatus::Precovered => write!(f, "PRECOVERED"),
            TrackletStatus::Killed => write!(f, "KILLED"),
        }
    }
}

impl FromStr for TrackletStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UNATTRIBUTED" => Ok(TrackletStatus::Unattributed),
            "ATTRIBUTED" => Ok(TrackletStatus::Attributed),
            "LINKED" => Ok(TrackletStatus::Linked),
            "PRECOVERED" => Ok(TrackletStatus::Precovered),
            "KILLED" => Ok(TrackletStatus::Killed),
            other => Err(format!("unknown tracklet status: '{}'", other)),
        }
    }
}

/// A report of a tracklet to an external clearing house.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub tracklet_id: i64,
    /// Interestingness score assigned by the receiving observatory.
    pub digest: f64,
    /// Designation the submission was filed under.
    pub desig: String,
}

/// A short single-night arc of detections of one moving source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tracklet {
    pub id: i64,
    /// Owning derived object, when the tracklet has been linked or attributed.
    #[serde(default)]
    pub derived_object_id: Option<i64>,
    /// Total angular velocity (deg/day).
    pub v_tot: f64,
    pub v_ra: f64,
    pub v_dec: f64,
    /// Mid-arc epoch (MJD).
    pub epoch: f64,
    pub magnitude: f64,
    pub status: TrackletStatus,
    /// Designation of the catalogued object this tracklet matched, if any.
    #[serde(default)]
    pub known_name: Option<String>,
    #[serde(default)]
    pub arc_length_days: Option<f64>,
    #[serde(default)]
    pub synthetic: bool,
    /// Orbit of the owning derived object.
    #[serde(default)]
    pub orbit: Option<Orbit>,
    #[serde(default)]
    pub submissions: Vec<Submission>,
}

impl Tracklet {
    /// The submission with the largest digest score.
    pub fn best_submission(&self) -> Option<&Submission> {
        self.submissions
            .iter()
            .max_by(|a, b| a.digest.total_cmp(&b.digest))
    }
}

/// A candidate solar-system object assembled from linked tracklets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedObject {
    pub id: i64,
    #[serde(default)]
    pub orbit: Option<Orbit>,
    #[serde(default)]
    pub tracklets: Vec<Tracklet>,
    #[serde(default)]
    pub arc_length_days: Option<f64>,
    #[serde(default)]
    pub synthetic: bool,
}

impl DerivedObject {
    /// Highest digest over all submissions of all owned tracklets.
    pub fn max_digest(&self) -> Option<f64> {
        self.tracklets
            .iter()
            .filter_map(|t| t.best_submission())
            .map(|s| s.digest)
            .reduce(f64::max)
    }
}
