//! Knot refinement on homogeneous control poles.

use curvelab_core::{CurveLabError, Result};
use curvelab_math::{DVec4, Point3};

use super::knot::{domain, find_span};

/// Lift a control point and weight into homogeneous space `(w*P, w)`.
pub(crate) fn to_homogeneous(p: Point3, w: f64) -> DVec4 {
    DVec4::new(p.x * w, p.y * w, p.z * w, w)
}

/// Project a homogeneous pole back to a `(point, weight)` pair.
pub(crate) fn from_homogeneous(q: DVec4) -> (Point3, f64) {
    let w = q.w;
    (Point3::new(q.x / w, q.y / w, q.z / w), w)
}

/// Insert `t` once into a knot vector, recomputing the affected poles (Boehm).
///
/// Returns the refined knot vector and pole row. The parameterization of the
/// underlying curve is unchanged; only the representation is refined.
///
/// Fails when `t` lies outside the domain or when the insertion would raise
/// the multiplicity of `t` above the degree.
pub(crate) fn insert_knot(
    degree: usize,
    knots: &[f64],
    poles: &[DVec4],
    t: f64,
    eps: f64,
) -> Result<(Vec<f64>, Vec<DVec4>)> {
    let p = degree;
    let n = poles.len() - 1;
    let (t_min, t_max) = domain(p, knots);

    if t < t_min || t > t_max {
        return Err(CurveLabError::Construction(format!(
            "Knot insertion parameter {} outside domain [{}, {}]",
            t, t_min, t_max
        )));
    }

    let mult = knots.iter().filter(|&&k| (k - t).abs() <= eps).count();
    if mult >= p {
        return Err(CurveLabError::Construction(format!(
            "Inserting knot {} would raise its multiplicity above the degree {}",
            t, p
        )));
    }

    let k = find_span(p, knots, n, t);

    let mut new_poles = vec![DVec4::ZERO; n + 2];
    for i in 0..=k - p {
        new_poles[i] = poles[i];
    }
    for i in k - mult..=n {
        new_poles[i + 1] = poles[i];
    }
    for i in k - p + 1..=k - mult {
        let alpha = (t - knots[i]) / (knots[i + p] - knots[i]);
        new_poles[i] = alpha * poles[i] + (1.0 - alpha) * poles[i - 1];
    }

    let mut new_knots = Vec::with_capacity(knots.len() + 1);
    new_knots.extend_from_slice(&knots[..=k]);
    new_knots.push(t);
    new_knots.extend_from_slice(&knots[k + 1..]);

    Ok((new_knots, new_poles))
}
