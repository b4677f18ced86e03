//! Scalar helpers shared by the evaluation and query engines.

use crate::{Point3, Vector3};

/// Euclidean distance between two points.
pub fn distance(a: Point3, b: Point3) -> f64 {
    (b - a).length()
}

/// Angle between two vectors in radians, in `[0, pi]`.
///
/// Returns 0 when either vector has near-zero length.
pub fn angle_between(a: Vector3, b: Vector3) -> f64 {
    let len_a = a.length();
    let len_b = b.length();
    if len_a < 1e-15 || len_b < 1e-15 {
        return 0.0;
    }
    let cos = (a.dot(b) / (len_a * len_b)).clamp(-1.0, 1.0);
    cos.acos()
}
