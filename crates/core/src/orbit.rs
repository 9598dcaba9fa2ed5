use serde::{Deserialize, Serialize};

/// Osculating elements of a derived object's orbit plus photometry and MOIDs.
///
/// Angles are stored in degrees, distances in AU, times as MJD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Orbit {
    /// Perihelion distance (AU).
    pub q: f64,
    /// Eccentricity.
    pub e: f64,
    /// Inclination (degrees).
    pub i: f64,
    /// Longitude of the ascending node (degrees).
    pub node: f64,
    /// Argument of perihelion (degrees).
    pub arg_peri: f64,
    /// Time of perihelion passage (MJD).
    pub time_peri: f64,
    /// Osculating epoch (MJD).
    pub epoch: f64,
    /// Absolute magnitude, when the orbit solution carries one.
    #[serde(default)]
    pub h_v: Option<f64>,
    #[serde(default)]
    pub moid_1: Option<f64>,
    #[serde(default)]
    pub moid_2: Option<f64>,
}

impl Orbit {
    /// Orbit with only the shape elements set; everything else zeroed.
    pub fn from_elements(q: f64, e: f64, i: f64, h_v: f64) -> Self {
        Self {
            q,
            e,
            i,
            node: 0.0,
            arg_peri: 0.0,
            time_peri: 0.0,
            epoch: 0.0,
            h_v: Some(h_v),
            moid_1: None,
            moid_2: None,
        }
    }

    /// Semi-major axis `q / (1 - e)`.
    ///
    /// `None` for parabolic and hyperbolic orbits (`e >= 1`), where the
    /// quantity is either undefined or negative.
    pub fn semi_major_axis(&self) -> Option<f64> {
        if self.e < 1.0 {
            Some(self.q / (1.0 - self.e))
        } else {
            None
        }
    }

    /// Whether the orbit is bound to the Sun.
    pub fn is_bound(&self) -> bool {
        self.e < 1.0
    }

    /// Inclination in radians.
    pub fn inclination_rad(&self) -> f64 {
        self.i.to_radians()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semi_major_axis_for_bound_orbit() {
        let orbit = Orbit::from_elements(6.0, 0.1, 10.0, 12.0);
        let a = orbit.semi_major_axis().unwrap();
        assert!((a - 6.666_666).abs() < 1e-5);
    }

    #[test]
    fn semi_major_axis_undefined_when_unbound() {
        assert!(Orbit::from_elements(1.0, 1.0, 0.0, 0.0).semi_major_axis().is_none());
        assert!(Orbit::from_elements(1.0, 1.3, 0.0, 0.0).semi_major_axis().is_none());
    }

    #[test]
    fn inclination_converts_to_radians() {
        let orbit = Orbit::from_elements(1.0, 0.0, 180.0, 0.0);
        assert!((orbit.inclination_rad() - std::f64::consts::PI).abs() < 1e-12);
    }
}
