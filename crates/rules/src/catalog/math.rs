//! Numeric helpers shared by the orbital predicates.

use mops_core::Orbit;

/// Semi-major axis of Jupiter (AU).
pub const JUPITER_A: f64 = 5.203;

/// Round to `digits` significant figures, ties to even.
///
/// Zero and non-finite values are returned unchanged.
pub fn round_sig(x: f64, digits: i32) -> f64 {
    if x == 0.0 || !x.is_finite() {
        return x;
    }
    let magnitude = x.abs().log10().floor() as i32 + 1;
    let shift = digits - magnitude;
    // Scale by an exact power of ten in both directions so that rounded
    // values compare equal to the matching decimal literal.
    if shift >= 0 {
        let f = 10f64.powi(shift);
        (x * f).round_ties_even() / f
    } else {
        let f = 10f64.powi(-shift);
        (x / f).round_ties_even() * f
    }
}

/// Tisserand parameter with respect to Jupiter.
///
/// `None` for unbound orbits.
pub fn tisserand(orbit: &Orbit) -> Option<f64> {
    let a = orbit.semi_major_axis()?;
    let e = orbit.e;
    Some(JUPITER_A / a + 2.0 * orbit.inclination_rad().cos() * ((1.0 - e * e) * a / JUPITER_A).sqrt())
}

/// `(a, e, i)` of a bound orbit rounded to three significant figures.
pub fn three_figure_elements(orbit: &Orbit) -> Option<(f64, f64, f64)> {
    let a = orbit.semi_major_axis()?;
    Some((round_sig(a, 3), round_sig(orbit.e, 3), round_sig(orbit.i, 3)))
}
