//! Rational B-spline (NURBS) curve.

use curvelab_core::{CurveLabError, Result, Tolerance, Validate};
use curvelab_math::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use super::Curve;
use crate::basis::eval::{basis_function_derivs, basis_functions, binomial};
use crate::basis::knot::{clamped_knot_vector, domain, find_span, validate_knots};
use crate::basis::refine;

/// A NURBS curve owning its control points, weights, and knot vector.
///
/// The aggregate is a plain value: evaluation takes `&self` and is safe to
/// call concurrently, mutation takes `&mut self`. All constructors validate
/// the structural invariants (at least two control points, positive weights
/// parallel to the control points, knot vector of length `n + degree + 1`,
/// non-decreasing knots) and refuse to build a malformed curve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NurbsCurve {
    degree: usize,
    knots: Vec<f64>,
    control_points: Vec<Point3>,
    weights: Vec<f64>,
}

impl NurbsCurve {
    /// Full constructor: the import path for exchange-format collaborators.
    pub fn new(
        degree: usize,
        knots: Vec<f64>,
        control_points: Vec<Point3>,
        weights: Vec<f64>,
    ) -> Result<Self> {
        validate_inputs(&control_points, &weights, degree)?;
        validate_knots(degree, &knots, control_points.len())?;
        Ok(Self {
            degree,
            knots,
            control_points,
            weights,
        })
    }

    /// Build a clamped curve from control points with unit weights.
    pub fn from_control_points(control_points: Vec<Point3>, degree: usize) -> Result<Self> {
        let weights = vec![1.0; control_points.len()];
        Self::with_weights(control_points, weights, degree)
    }

    /// Build a clamped curve from control points and explicit weights.
    pub fn with_weights(
        control_points: Vec<Point3>,
        weights: Vec<f64>,
        degree: usize,
    ) -> Result<Self> {
        validate_inputs(&control_points, &weights, degree)?;
        if degree >= control_points.len() {
            return Err(CurveLabError::Construction(format!(
                "Degree ({}) must be less than the number of control points ({})",
                degree,
                control_points.len()
            )));
        }
        let knots = clamped_knot_vector(control_points.len(), degree);
        Ok(Self {
            degree,
            knots,
            control_points,
            weights,
        })
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn knots(&self) -> &[f64] {
        &self.knots
    }

    pub fn control_points(&self) -> &[Point3] {
        &self.control_points
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn control_point_count(&self) -> usize {
        self.control_points.len()
    }

    pub fn control_point(&self, index: usize) -> Result<Point3> {
        self.control_points
            .get(index)
            .copied()
            .ok_or_else(|| control_index_error(index, self.control_points.len()))
    }

    pub fn set_control_point(&mut self, index: usize, point: Point3) -> Result<()> {
        let count = self.control_points.len();
        match self.control_points.get_mut(index) {
            Some(p) => {
                *p = point;
                Ok(())
            }
            None => Err(control_index_error(index, count)),
        }
    }

    pub fn weight(&self, index: usize) -> Result<f64> {
        self.weights
            .get(index)
            .copied()
            .ok_or_else(|| control_index_error(index, self.weights.len()))
    }

    /// Set the weight at `index`. Non-positive weights are rejected.
    pub fn set_weight(&mut self, index: usize, weight: f64) -> Result<()> {
        if weight <= 0.0 {
            return Err(CurveLabError::Construction(format!(
                "Weight must be positive, got {}",
                weight
            )));
        }
        let count = self.weights.len();
        match self.weights.get_mut(index) {
            Some(w) => {
                *w = weight;
                Ok(())
            }
            None => Err(control_index_error(index, count)),
        }
    }

    /// Derivatives of the curve up to `order`, index 0 holding the point.
    ///
    /// Homogeneous derivatives are combined through the binomial quotient-rule
    /// recursion to recover the Euclidean derivatives of the projected curve.
    pub fn derivatives(&self, t: f64, order: usize) -> Vec<Vector3> {
        let (aders, wders) = self.homogeneous_derivs(t, order);

        let mut ck = vec![Vector3::ZERO; order + 1];
        for k in 0..=order {
            let mut v = aders[k];
            for i in 1..=k {
                v -= binomial(k, i) * wders[i] * ck[k - i];
            }
            ck[k] = if wders[0].abs() < 1e-15 {
                v
            } else {
                v / wders[0]
            };
        }
        ck
    }

    /// Second derivative of the projected curve.
    pub fn second_derivative_at(&self, t: f64) -> Vector3 {
        self.derivatives(t, 2)[2]
    }

    /// Frenet principal normal, `(C' x C'') x C'` normalized.
    ///
    /// For a locally straight curve the binormal is undefined; an arbitrary
    /// unit vector perpendicular to the tangent is returned instead.
    pub fn normal_at(&self, t: f64) -> Vector3 {
        let ders = self.derivatives(t, 2);
        let d1 = ders[1];
        let d2 = ders[2];

        let binormal = d1.cross(d2);
        if binormal.length() > 1e-12 {
            let n = binormal.cross(d1);
            return n / n.length();
        }

        // Straight segment: any perpendicular to the tangent
        let axis = if d1.x.abs() < d1.length() * 0.9 {
            Vector3::X
        } else {
            Vector3::Y
        };
        let n = d1.cross(axis);
        let len = n.length();
        if len < 1e-15 {
            Vector3::Z
        } else {
            n / len
        }
    }

    /// Curvature `|C' x C''| / |C'|^3`.
    ///
    /// Defined as 0 where the parameterization has near-zero speed.
    pub fn curvature_at(&self, t: f64) -> f64 {
        let ders = self.derivatives(t, 2);
        let d1 = ders[1];
        let d2 = ders[2];

        let speed = d1.length();
        if speed < 1e-12 {
            return 0.0;
        }

        d1.cross(d2).length() / (speed * speed * speed)
    }

    /// Reverse the curve orientation in place.
    ///
    /// `C_rev(t) == C(t_min + t_max - t)` over the unchanged domain.
    pub fn reverse(&mut self) {
        self.control_points.reverse();
        self.weights.reverse();
        let (t_min, t_max) = domain(self.degree, &self.knots);
        self.knots = self
            .knots
            .iter()
            .rev()
            .map(|&k| t_min + t_max - k)
            .collect();
    }

    /// Insert `t` once into the knot vector without changing the curve shape.
    ///
    /// Fails if `t` is outside the domain or already has multiplicity equal
    /// to the degree.
    pub fn insert_knot(&mut self, t: f64) -> Result<()> {
        let poles: Vec<_> = self
            .control_points
            .iter()
            .zip(&self.weights)
            .map(|(&p, &w)| refine::to_homogeneous(p, w))
            .collect();

        let (new_knots, new_poles) = refine::insert_knot(self.degree, &self.knots, &poles, t, 1e-12)?;

        let (points, weights): (Vec<Point3>, Vec<f64>) = new_poles
            .iter()
            .map(|&q| refine::from_homogeneous(q))
            .unzip();
        self.knots = new_knots;
        self.control_points = points;
        self.weights = weights;
        Ok(())
    }

    fn homogeneous_derivs(&self, t: f64, order: usize) -> (Vec<Vector3>, Vec<f64>) {
        let n = self.control_points.len() - 1;
        let span = find_span(self.degree, &self.knots, n, t);
        let ders = basis_function_derivs(self.degree, &self.knots, span, t, order);

        let mut aders = vec![Vector3::ZERO; order + 1];
        let mut wders = vec![0.0; order + 1];

        for k in 0..=order {
            for i in 0..=self.degree {
                let idx = span - self.degree + i;
                let bw = ders[k][i] * self.weights[idx];
                aders[k] += bw * self.control_points[idx];
                wders[k] += bw;
            }
        }

        (aders, wders)
    }
}

impl Curve for NurbsCurve {
    fn point_at(&self, t: f64) -> Point3 {
        let n = self.control_points.len() - 1;
        let span = find_span(self.degree, &self.knots, n, t);
        let basis = basis_functions(self.degree, &self.knots, span, t);

        let mut point = Vector3::ZERO;
        let mut w = 0.0;

        for (i, &b) in basis.iter().enumerate() {
            let idx = span - self.degree + i;
            let bw = b * self.weights[idx];
            point += bw * self.control_points[idx];
            w += bw;
        }

        if w.abs() < 1e-15 {
            point
        } else {
            point / w
        }
    }

    fn tangent_at(&self, t: f64) -> Vector3 {
        self.derivatives(t, 1)[1]
    }

    fn domain(&self) -> (f64, f64) {
        domain(self.degree, &self.knots)
    }

    fn is_closed(&self) -> bool {
        let (t_min, t_max) = self.domain();
        (self.point_at(t_max) - self.point_at(t_min)).length() < Tolerance::DEFAULT_LINEAR
    }
}

impl Validate for NurbsCurve {
    fn validate(&self) -> Result<()> {
        validate_inputs(&self.control_points, &self.weights, self.degree)?;
        validate_knots(self.degree, &self.knots, self.control_points.len())
    }
}

fn validate_inputs(control_points: &[Point3], weights: &[f64], degree: usize) -> Result<()> {
    if control_points.len() < 2 {
        return Err(CurveLabError::Construction(format!(
            "At least 2 control points required, got {}",
            control_points.len()
        )));
    }
    if degree < 1 {
        return Err(CurveLabError::Construction(
            "Degree must be at least 1".to_string(),
        ));
    }
    if weights.len() != control_points.len() {
        return Err(CurveLabError::Construction(format!(
            "Weight count ({}) must match control point count ({})",
            weights.len(),
            control_points.len()
        )));
    }
    if let Some(w) = weights.iter().find(|&&w| w <= 0.0) {
        return Err(CurveLabError::Construction(format!(
            "Weights must be positive, got {}",
            w
        )));
    }
    Ok(())
}

fn control_index_error(index: usize, count: usize) -> CurveLabError {
    CurveLabError::IndexOutOfRange(format!(
        "Control point index {} out of range (count {})",
        index, count
    ))
}
