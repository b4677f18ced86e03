//! Data-point parameterization and interpolation knot vectors.

use curvelab_math::Point3;

/// Chord-length parameterization of a point sequence, normalized to `[0, 1]`.
///
/// Parameter spacing follows the geometric spacing of the points, which
/// conditions the interpolation system much better than uniform spacing for
/// unevenly sampled data. When the total chord length is negligible (all
/// points coincident) the parameters fall back to uniform spacing; callers
/// that need to reject such input check the chord length themselves.
pub fn chord_length_parameters(points: &[Point3]) -> Vec<f64> {
    if points.len() < 2 {
        return vec![0.0; points.len()];
    }

    let mut params = Vec::with_capacity(points.len());
    params.push(0.0);
    let mut total = 0.0;
    for pair in points.windows(2) {
        total += (pair[1] - pair[0]).length();
        params.push(total);
    }

    if total < 1e-14 {
        let last = (points.len() - 1) as f64;
        return (0..points.len()).map(|i| i as f64 / last).collect();
    }

    for p in &mut params {
        *p /= total;
    }
    params
}

/// Total chord length of a point sequence.
pub(crate) fn total_chord_length(points: &[Point3]) -> f64 {
    points.windows(2).map(|pair| (pair[1] - pair[0]).length()).sum()
}

/// Clamped knot vector for interpolation at the given parameters.
///
/// Interior knots are placed at averages of `degree` consecutive parameters,
/// which keeps every knot span populated with data and the interpolation
/// matrix banded and nonsingular for strictly increasing parameters.
pub fn averaged_knot_vector(params: &[f64], degree: usize) -> Vec<f64> {
    let n = params.len();
    let mut knots = Vec::with_capacity(n + degree + 1);

    for _ in 0..=degree {
        knots.push(0.0);
    }

    if n > degree + 1 {
        for j in 1..=(n - degree - 1) {
            let sum: f64 = params[j..j + degree].iter().sum();
            knots.push(sum / degree as f64);
        }
    }

    for _ in 0..=degree {
        knots.push(1.0);
    }

    knots
}
