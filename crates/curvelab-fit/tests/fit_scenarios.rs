// Integration tests for curve and surface fitting

use curvelab_core::{CurveLabError, Tolerance};
use curvelab_fit::{chord_length_parameters, fit_curve, fit_surface};
use curvelab_geometry::{Curve, Surface};
use curvelab_math::DVec3;

#[test]
fn cubic_polynomial_is_reproduced_exactly() {
    // Points sampled from a degree-3 polynomial lie in the spline space of a
    // degree-3 fit, so interpolation reproduces them at their parameters.
    let points: Vec<DVec3> = (0..8)
        .map(|i| {
            let x = i as f64 * 0.5;
            DVec3::new(x, x * x * x - 2.0 * x * x + x, 0.0)
        })
        .collect();

    let curve = fit_curve(&points, 3, Tolerance::default_precision()).unwrap();
    let params = chord_length_parameters(&points);

    for (p, &t) in points.iter().zip(&params) {
        assert!(
            (curve.point_at(t) - *p).length() < 1e-8,
            "fit misses {:?} at t={}",
            p,
            t
        );
    }
}

#[test]
fn fitted_curve_interpolates_endpoints() {
    let points = vec![
        DVec3::new(0.0, 0.0, 0.0),
        DVec3::new(1.0, 1.5, 0.0),
        DVec3::new(2.5, 1.0, 0.5),
        DVec3::new(4.0, -0.5, 0.0),
    ];
    let curve = fit_curve(&points, 2, Tolerance::default_precision()).unwrap();

    let (t_min, t_max) = curve.domain();
    assert!((curve.point_at(t_min) - points[0]).length() < 1e-10);
    assert!((curve.point_at(t_max) - points[3]).length() < 1e-10);
}

#[test]
fn coincident_points_fail_cleanly() {
    let coincident = vec![DVec3::new(1.0, 2.0, 3.0); 4];
    let err = fit_curve(&coincident, 3, Tolerance::default_precision()).unwrap_err();
    assert!(
        matches!(err, CurveLabError::Degenerate(_)),
        "expected a degenerate-input error, got {:?}",
        err
    );
}

#[test]
fn fitted_surface_interpolates_corners() {
    let grid: Vec<Vec<DVec3>> = (0..5)
        .map(|i| {
            (0..5)
                .map(|j| {
                    let x = i as f64;
                    let y = j as f64;
                    DVec3::new(x, y, (0.5 * x).sin() * (0.5 * y).cos())
                })
                .collect()
        })
        .collect();

    let surf = fit_surface(&grid, 3, 3, Tolerance::default_precision()).unwrap();

    let (u_min, u_max) = surf.domain_u();
    let (v_min, v_max) = surf.domain_v();
    assert!((surf.point_at(u_min, v_min) - grid[0][0]).length() < 1e-9);
    assert!((surf.point_at(u_max, v_min) - grid[4][0]).length() < 1e-9);
    assert!((surf.point_at(u_min, v_max) - grid[0][4]).length() < 1e-9);
    assert!((surf.point_at(u_max, v_max) - grid[4][4]).length() < 1e-9);
}

#[test]
fn fitted_surface_carries_weights() {
    // The fit wires its weights into the returned surface
    let grid: Vec<Vec<DVec3>> = (0..4)
        .map(|i| (0..4).map(|j| DVec3::new(i as f64, j as f64, 0.0)).collect())
        .collect();
    let surf = fit_surface(&grid, 2, 2, Tolerance::default_precision()).unwrap();

    assert_eq!(surf.weights().len(), surf.u_control_point_count());
    assert!(surf.weights().iter().flatten().all(|&w| w > 0.0));
}
