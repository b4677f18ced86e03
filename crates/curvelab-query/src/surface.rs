//! Surface queries: closest-point grid search.

use curvelab_geometry::Surface;
use curvelab_math::Point3;

use crate::QueryConfig;

/// Closest point on the surface to `target`, as a `(point, u, v)` triple.
///
/// Uniform grid search with `config.surface_samples` samples per parametric
/// direction; the grid density is the documented accuracy knob. Returns the
/// best grid sample.
pub fn closest_point_on_surface(
    surface: &dyn Surface,
    target: Point3,
    config: &QueryConfig,
) -> (Point3, f64, f64) {
    let samples = config.surface_samples.max(2);
    let (u_min, u_max) = surface.domain_u();
    let (v_min, v_max) = surface.domain_v();
    let u_step = (u_max - u_min) / (samples - 1) as f64;
    let v_step = (v_max - v_min) / (samples - 1) as f64;

    let mut best = (surface.point_at(u_min, v_min), u_min, v_min);
    let mut best_dist = f64::MAX;

    for i in 0..samples {
        let u = u_min + i as f64 * u_step;
        for j in 0..samples {
            let v = v_min + j as f64 * v_step;
            let p = surface.point_at(u, v);
            let d = (p - target).length_squared();
            if d < best_dist {
                best_dist = d;
                best = (p, u, v);
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use curvelab_geometry::NurbsSurface;
    use curvelab_math::DVec3;

    fn flat_patch() -> NurbsSurface {
        NurbsSurface::from_control_points(
            vec![
                vec![DVec3::new(0.0, 0.0, 0.0), DVec3::new(0.0, 2.0, 0.0)],
                vec![DVec3::new(2.0, 0.0, 0.0), DVec3::new(2.0, 2.0, 0.0)],
            ],
            1,
            1,
        )
        .unwrap()
    }

    #[test]
    fn test_closest_point_above_patch() {
        let surf = flat_patch();
        let config = QueryConfig::default();

        let target = DVec3::new(1.0, 1.0, 3.0);
        let (p, u, v) = closest_point_on_surface(&surf, target, &config);

        // Foot point is directly below the target
        assert!((p - DVec3::new(1.0, 1.0, 0.0)).length() < 0.1);
        assert!((u - 0.5).abs() < 0.05);
        assert!((v - 0.5).abs() < 0.05);
    }

    #[test]
    fn test_closest_point_outside_corner() {
        let surf = flat_patch();
        let config = QueryConfig::default();

        let (p, u, v) = closest_point_on_surface(&surf, DVec3::new(-1.0, -1.0, 0.0), &config);
        assert!((p - DVec3::ZERO).length() < 1e-12);
        assert_eq!(u, 0.0);
        assert_eq!(v, 0.0);
    }

    #[test]
    fn test_denser_grid_not_worse() {
        let surf = flat_patch();
        let target = DVec3::new(0.73, 1.21, 0.4);

        let coarse = QueryConfig {
            surface_samples: 10,
            ..QueryConfig::default()
        };
        let dense = QueryConfig {
            surface_samples: 80,
            ..QueryConfig::default()
        };

        let (p_coarse, _, _) = closest_point_on_surface(&surf, target, &coarse);
        let (p_dense, _, _) = closest_point_on_surface(&surf, target, &dense);
        assert!((p_dense - target).length() <= (p_coarse - target).length() + 1e-12);
    }
}
