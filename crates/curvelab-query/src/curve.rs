//! Curve queries: uniform sampling, arc length, closest point.

use curvelab_core::{CurveLabError, Result};
use curvelab_geometry::Curve;
use curvelab_math::{distance, Point3};

use crate::QueryConfig;

/// Sample a curve at `n` uniformly spaced parameters across its domain.
///
/// Requires `n >= 2`; the first and last samples are the evaluated domain
/// endpoints.
pub fn sample_curve(curve: &dyn Curve, n: usize) -> Result<Vec<Point3>> {
    if n < 2 {
        return Err(CurveLabError::Evaluation(format!(
            "At least 2 samples required, got {}",
            n
        )));
    }

    let (t_min, t_max) = curve.domain();
    let step = (t_max - t_min) / (n - 1) as f64;

    Ok((0..n)
        .map(|i| curve.point_at(t_min + i as f64 * step))
        .collect())
}

/// Chordal arc-length approximation over `[t_start, t_end]`.
///
/// Sums the chords of `segments` uniform parameter steps. The estimate is
/// monotonically non-decreasing in `segments` and converges from below for a
/// smooth curve; `segments` is the accuracy knob.
pub fn arc_length(curve: &dyn Curve, t_start: f64, t_end: f64, segments: usize) -> f64 {
    let segments = segments.max(1);
    let step = (t_end - t_start) / segments as f64;

    let mut length = 0.0;
    let mut prev = curve.point_at(t_start);
    for i in 1..=segments {
        let next = curve.point_at(t_start + i as f64 * step);
        length += distance(prev, next);
        prev = next;
    }
    length
}

/// Arc length over the full domain, using the configured segment count.
pub fn arc_length_full(curve: &dyn Curve, config: &QueryConfig) -> f64 {
    let (t_min, t_max) = curve.domain();
    arc_length(curve, t_min, t_max, config.arc_segments)
}

/// Closest point on the curve to `target`, as a `(point, parameter)` pair.
///
/// Coarse uniform sampling brackets the minimum; `config.curve_samples` is
/// the documented accuracy knob. With `config.refine_steps > 0` the bracket
/// is tightened by golden-section iterations, which can only improve on the
/// best sample.
pub fn closest_point(curve: &dyn Curve, target: Point3, config: &QueryConfig) -> (Point3, f64) {
    let samples = config.curve_samples.max(2);
    let (t_min, t_max) = curve.domain();
    let step = (t_max - t_min) / (samples - 1) as f64;

    let mut best_t = t_min;
    let mut best_dist = f64::MAX;
    for i in 0..samples {
        let t = t_min + i as f64 * step;
        let d = (curve.point_at(t) - target).length_squared();
        if d < best_dist {
            best_dist = d;
            best_t = t;
        }
    }

    if config.refine_steps > 0 {
        let lo = (best_t - step).max(t_min);
        let hi = (best_t + step).min(t_max);
        best_t = golden_section(
            curve,
            target,
            lo,
            hi,
            config.refine_steps,
            config.tolerance.linear,
        );
    }

    (curve.point_at(best_t), best_t)
}

/// Golden-section minimization of the squared distance over `[lo, hi]`.
///
/// Stops after `steps` iterations or once the bracket shrinks below `eps`.
fn golden_section(
    curve: &dyn Curve,
    target: Point3,
    lo: f64,
    hi: f64,
    steps: usize,
    eps: f64,
) -> f64 {
    const INV_PHI: f64 = 0.618_033_988_749_894_8;

    let f = |t: f64| (curve.point_at(t) - target).length_squared();

    let mut a = lo;
    let mut b = hi;
    let mut c = b - INV_PHI * (b - a);
    let mut d = a + INV_PHI * (b - a);
    let mut fc = f(c);
    let mut fd = f(d);

    for _ in 0..steps {
        if b - a < eps {
            break;
        }
        if fc < fd {
            b = d;
            d = c;
            fd = fc;
            c = b - INV_PHI * (b - a);
            fc = f(c);
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + INV_PHI * (b - a);
            fd = f(d);
        }
    }

    (a + b) * 0.5
}
