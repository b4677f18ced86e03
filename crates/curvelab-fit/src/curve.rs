//! Global curve interpolation and least-squares approximation.

use curvelab_core::{CurveLabError, Result, Tolerance};
use curvelab_geometry::basis::{basis_functions, clamped_knot_vector, find_span};
use curvelab_geometry::NurbsCurve;
use curvelab_math::Point3;
use nalgebra::DMatrix;
use rayon::prelude::*;

use crate::param::{averaged_knot_vector, chord_length_parameters, total_chord_length};

/// Point count above which `fit_curve` switches from interpolation to
/// least-squares approximation.
const APPROXIMATION_THRESHOLD: usize = 50;

/// Fit a NURBS curve to an ordered point sequence.
///
/// Small inputs are interpolated exactly. Above [`APPROXIMATION_THRESHOLD`]
/// points the curve is approximated in the least-squares sense with a control
/// point count derived from `tolerance` (a tighter linear tolerance keeps
/// more control points).
pub fn fit_curve(points: &[Point3], degree: usize, tolerance: Tolerance) -> Result<NurbsCurve> {
    let n = points.len();
    if n <= APPROXIMATION_THRESHOLD {
        return interpolate_curve(points, degree, tolerance);
    }

    let fraction = if tolerance.linear < 1e-3 { 0.5 } else { 0.3 };
    let control_count = ((n as f64 * fraction) as usize).clamp(degree + 1, n);
    log::debug!(
        "fit_curve: approximating {} points with {} control points (degree {})",
        n,
        control_count,
        degree
    );

    if control_count == n {
        interpolate_curve(points, degree, tolerance)
    } else {
        approximate_curve(points, degree, control_count, tolerance)
    }
}

/// Fit many independent point sequences in parallel.
pub fn fit_curves(
    point_sets: &[Vec<Point3>],
    degree: usize,
    tolerance: Tolerance,
) -> Vec<Result<NurbsCurve>> {
    point_sets
        .par_iter()
        .map(|points| fit_curve(points, degree, tolerance))
        .collect()
}

/// Interpolate a NURBS curve exactly through the given points.
///
/// Chord-length parameters and the averaged knot vector set up the square
/// system `B * P = Q` over the basis matrix `B`, solved by LU decomposition.
/// The returned curve carries unit weights and reproduces every input point
/// at its fitting parameter.
pub fn interpolate_curve(
    points: &[Point3],
    degree: usize,
    tolerance: Tolerance,
) -> Result<NurbsCurve> {
    validate_fit_input(points, degree, tolerance)?;
    if degree >= points.len() {
        return Err(CurveLabError::Construction(format!(
            "Degree ({}) must be less than the number of points ({})",
            degree,
            points.len()
        )));
    }

    let params = chord_length_parameters(points);
    if params.windows(2).any(|w| w[1] - w[0] < 1e-14) {
        return Err(CurveLabError::Degenerate(
            "Duplicate parameter values from coincident consecutive points".to_string(),
        ));
    }

    let knots = averaged_knot_vector(&params, degree);
    let b = basis_matrix(&params, degree, &knots, points.len());
    log::debug!(
        "interpolate_curve: solving {0}x{0} system (degree {1})",
        points.len(),
        degree
    );

    let solution = b
        .lu()
        .solve(&points_matrix(points))
        .ok_or_else(|| singular_system(points.len()))?;

    let control_points = matrix_rows_to_points(&solution);
    let weights = vec![1.0; control_points.len()];
    NurbsCurve::new(degree, knots, control_points, weights)
}

/// Approximate points with a curve of `control_count` control points in the
/// least-squares sense.
///
/// Solves the normal equations `B^T B * P = B^T Q` over a clamped uniform
/// knot vector. Endpoint deviation is governed by the residual, not pinned.
pub fn approximate_curve(
    points: &[Point3],
    degree: usize,
    control_count: usize,
    tolerance: Tolerance,
) -> Result<NurbsCurve> {
    validate_fit_input(points, degree, tolerance)?;
    if control_count > points.len() {
        return Err(CurveLabError::Construction(format!(
            "Control point count ({}) must not exceed point count ({})",
            control_count,
            points.len()
        )));
    }
    if control_count <= degree {
        return Err(CurveLabError::Construction(format!(
            "Control point count ({}) must exceed the degree ({})",
            control_count, degree
        )));
    }

    let params = chord_length_parameters(points);
    let knots = clamped_knot_vector(control_count, degree);
    let b = basis_matrix(&params, degree, &knots, control_count);
    log::debug!(
        "approximate_curve: {} points -> {} control points (degree {})",
        points.len(),
        control_count,
        degree
    );

    let bt = b.transpose();
    let normal = &bt * &b;
    let rhs = &bt * points_matrix(points);

    let solution = normal
        .lu()
        .solve(&rhs)
        .ok_or_else(|| singular_system(control_count))?;

    let control_points = matrix_rows_to_points(&solution);
    let weights = vec![1.0; control_points.len()];
    NurbsCurve::new(degree, knots, control_points, weights)
}

/// Basis matrix `B[i][j] = N_{j,degree}(params[i])`.
///
/// Each row has at most `degree + 1` non-zero entries, located by the knot
/// span of the row's parameter.
pub(crate) fn basis_matrix(
    params: &[f64],
    degree: usize,
    knots: &[f64],
    control_count: usize,
) -> DMatrix<f64> {
    let mut b = DMatrix::zeros(params.len(), control_count);
    for (row, &t) in params.iter().enumerate() {
        let span = find_span(degree, knots, control_count - 1, t);
        let basis = basis_functions(degree, knots, span, t);
        for (i, &val) in basis.iter().enumerate() {
            b[(row, span - degree + i)] = val;
        }
    }
    b
}

pub(crate) fn points_matrix(points: &[Point3]) -> DMatrix<f64> {
    DMatrix::from_fn(points.len(), 3, |i, j| points[i][j])
}

pub(crate) fn matrix_rows_to_points(m: &DMatrix<f64>) -> Vec<Point3> {
    (0..m.nrows())
        .map(|i| Point3::new(m[(i, 0)], m[(i, 1)], m[(i, 2)]))
        .collect()
}

fn validate_fit_input(points: &[Point3], degree: usize, tolerance: Tolerance) -> Result<()> {
    if points.len() < 2 {
        return Err(CurveLabError::Construction(format!(
            "At least 2 points required for fitting, got {}",
            points.len()
        )));
    }
    if degree < 1 {
        return Err(CurveLabError::Construction(
            "Degree must be at least 1".to_string(),
        ));
    }
    if total_chord_length(points) < tolerance.linear {
        return Err(CurveLabError::Degenerate(
            "All input points coincide within tolerance".to_string(),
        ));
    }
    Ok(())
}

fn singular_system(size: usize) -> CurveLabError {
    CurveLabError::Singular(format!(
        "Interpolation system of size {} is singular (degenerate parameterization)",
        size
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use curvelab_geometry::Curve;
    use curvelab_math::DVec3;

    fn wavy_points() -> Vec<Point3> {
        (0..7)
            .map(|i| {
                let x = i as f64;
                DVec3::new(x, (x * 0.8).sin(), 0.0)
            })
            .collect()
    }

    #[test]
    fn test_interpolation_passes_through_points() {
        let points = wavy_points();
        let curve = interpolate_curve(&points, 3, Tolerance::default_precision()).unwrap();
        let params = chord_length_parameters(&points);

        for (p, &t) in points.iter().zip(&params) {
            let q = curve.point_at(t);
            assert!(
                (q - *p).length() < 1e-9,
                "curve misses point {:?} at t={}: {:?}",
                p,
                t,
                q
            );
        }
    }

    #[test]
    fn test_interpolation_endpoint_property() {
        let points = wavy_points();
        let curve = interpolate_curve(&points, 3, Tolerance::default_precision()).unwrap();
        let (t_min, t_max) = curve.domain();
        assert!((curve.point_at(t_min) - points[0]).length() < 1e-10);
        assert!((curve.point_at(t_max) - points[points.len() - 1]).length() < 1e-10);
    }

    #[test]
    fn test_interpolation_rejects_bad_input() {
        let tol = Tolerance::default_precision();
        assert!(interpolate_curve(&[DVec3::ZERO], 1, tol).is_err());
        assert!(interpolate_curve(&[DVec3::ZERO, DVec3::X], 0, tol).is_err());
        assert!(interpolate_curve(&[DVec3::ZERO, DVec3::X], 2, tol).is_err());
    }

    #[test]
    fn test_interpolation_rejects_coincident_points() {
        let tol = Tolerance::default_precision();
        let coincident = vec![DVec3::ONE; 4];
        let err = interpolate_curve(&coincident, 3, tol).unwrap_err();
        assert!(matches!(err, CurveLabError::Degenerate(_)));
    }

    #[test]
    fn test_interpolation_rejects_duplicate_consecutive_points() {
        let tol = Tolerance::default_precision();
        let points = vec![
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(2.0, 1.0, 0.0),
        ];
        let err = interpolate_curve(&points, 2, tol).unwrap_err();
        assert!(matches!(err, CurveLabError::Degenerate(_)));
    }

    #[test]
    fn test_approximation_of_line_is_exact() {
        let points: Vec<Point3> = (0..20)
            .map(|i| DVec3::new(i as f64, 2.0 * i as f64, 0.0))
            .collect();
        let curve = approximate_curve(&points, 2, 5, Tolerance::default_precision()).unwrap();

        // A straight line is reproducible exactly by any spline space
        let params = chord_length_parameters(&points);
        for (p, &t) in points.iter().zip(&params) {
            assert!((curve.point_at(t) - *p).length() < 1e-8);
        }
    }

    #[test]
    fn test_approximation_control_count_bounds() {
        let points = wavy_points();
        let tol = Tolerance::default_precision();
        assert!(approximate_curve(&points, 3, 3, tol).is_err());
        assert!(approximate_curve(&points, 3, 100, tol).is_err());
    }

    #[test]
    fn test_fit_curve_small_input_interpolates() {
        let points = wavy_points();
        let curve = fit_curve(&points, 3, Tolerance::default_precision()).unwrap();
        assert_eq!(curve.control_point_count(), points.len());
    }

    #[test]
    fn test_fit_curve_large_input_approximates() {
        let points: Vec<Point3> = (0..200)
            .map(|i| {
                let t = i as f64 / 199.0 * std::f64::consts::TAU;
                DVec3::new(t.cos(), t.sin(), 0.1 * t)
            })
            .collect();
        let curve = fit_curve(&points, 3, Tolerance::default_precision()).unwrap();
        assert!(curve.control_point_count() < points.len());

        // The helix should still be followed closely
        let params = chord_length_parameters(&points);
        for (p, &t) in points.iter().zip(&params) {
            assert!((curve.point_at(t) - *p).length() < 1e-2);
        }
    }

    #[test]
    fn test_fit_curves_batch() {
        let sets: Vec<Vec<Point3>> = (0..4)
            .map(|k| {
                (0..6)
                    .map(|i| DVec3::new(i as f64, (k * i) as f64 * 0.5, k as f64))
                    .collect()
            })
            .collect();

        let results = fit_curves(&sets, 2, Tolerance::default_precision());
        assert_eq!(results.len(), 4);
        for r in &results {
            assert!(r.is_ok());
        }
    }
}
