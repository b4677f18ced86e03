//! Rational B-spline (NURBS) surface.

use curvelab_core::{CurveLabError, Result, Tolerance, Validate};
use curvelab_math::{DVec4, Point3, Vector3};
use serde::{Deserialize, Serialize};

use super::Surface;
use crate::basis::eval::{basis_function_derivs, basis_functions, binomial};
use crate::basis::knot::{
    clamped_knot_vector, domain, find_span, is_periodic, validate_knots,
};
use crate::basis::refine;
use crate::curve::NurbsCurve;

/// A NURBS surface owning a rectangular control net, weights, and two knot
/// vectors.
///
/// `control_points[i][j]` is the control point at u-row `i` and v-column `j`;
/// the weight grid is parallel. Structural invariants are enforced per
/// parametric direction at construction and preserved by every mutator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NurbsSurface {
    degree_u: usize,
    degree_v: usize,
    knots_u: Vec<f64>,
    knots_v: Vec<f64>,
    control_points: Vec<Vec<Point3>>,
    weights: Vec<Vec<f64>>,
}

impl NurbsSurface {
    /// Full constructor: the import path for exchange-format collaborators.
    pub fn new(
        degree_u: usize,
        degree_v: usize,
        knots_u: Vec<f64>,
        knots_v: Vec<f64>,
        control_points: Vec<Vec<Point3>>,
        weights: Vec<Vec<f64>>,
    ) -> Result<Self> {
        let (n_u, n_v) = validate_grid(&control_points, &weights, degree_u, degree_v)?;
        validate_knots(degree_u, &knots_u, n_u)?;
        validate_knots(degree_v, &knots_v, n_v)?;
        Ok(Self {
            degree_u,
            degree_v,
            knots_u,
            knots_v,
            control_points,
            weights,
        })
    }

    /// Build a clamped surface from a control grid with unit weights.
    pub fn from_control_points(
        control_points: Vec<Vec<Point3>>,
        degree_u: usize,
        degree_v: usize,
    ) -> Result<Self> {
        let weights = control_points
            .iter()
            .map(|row| vec![1.0; row.len()])
            .collect();
        Self::with_weights(control_points, weights, degree_u, degree_v)
    }

    /// Build a clamped surface from a control grid and explicit weights.
    pub fn with_weights(
        control_points: Vec<Vec<Point3>>,
        weights: Vec<Vec<f64>>,
        degree_u: usize,
        degree_v: usize,
    ) -> Result<Self> {
        let (n_u, n_v) = validate_grid(&control_points, &weights, degree_u, degree_v)?;
        if degree_u >= n_u {
            return Err(CurveLabError::Construction(format!(
                "U degree ({}) must be less than the number of control rows ({})",
                degree_u, n_u
            )));
        }
        if degree_v >= n_v {
            return Err(CurveLabError::Construction(format!(
                "V degree ({}) must be less than the number of control columns ({})",
                degree_v, n_v
            )));
        }
        let knots_u = clamped_knot_vector(n_u, degree_u);
        let knots_v = clamped_knot_vector(n_v, degree_v);
        Ok(Self {
            degree_u,
            degree_v,
            knots_u,
            knots_v,
            control_points,
            weights,
        })
    }

    pub fn degree_u(&self) -> usize {
        self.degree_u
    }

    pub fn degree_v(&self) -> usize {
        self.degree_v
    }

    pub fn knots_u(&self) -> &[f64] {
        &self.knots_u
    }

    pub fn knots_v(&self) -> &[f64] {
        &self.knots_v
    }

    pub fn control_points(&self) -> &[Vec<Point3>] {
        &self.control_points
    }

    pub fn weights(&self) -> &[Vec<f64>] {
        &self.weights
    }

    pub fn u_control_point_count(&self) -> usize {
        self.control_points.len()
    }

    pub fn v_control_point_count(&self) -> usize {
        self.control_points[0].len()
    }

    pub fn control_point(&self, u_index: usize, v_index: usize) -> Result<Point3> {
        self.check_indices(u_index, v_index)?;
        Ok(self.control_points[u_index][v_index])
    }

    pub fn set_control_point(&mut self, u_index: usize, v_index: usize, point: Point3) -> Result<()> {
        self.check_indices(u_index, v_index)?;
        self.control_points[u_index][v_index] = point;
        Ok(())
    }

    pub fn weight(&self, u_index: usize, v_index: usize) -> Result<f64> {
        self.check_indices(u_index, v_index)?;
        Ok(self.weights[u_index][v_index])
    }

    /// Set the weight at `(u_index, v_index)`. Non-positive weights are
    /// rejected; out-of-range indices leave the grid untouched.
    pub fn set_weight(&mut self, u_index: usize, v_index: usize, weight: f64) -> Result<()> {
        if weight <= 0.0 {
            return Err(CurveLabError::Construction(format!(
                "Weight must be positive, got {}",
                weight
            )));
        }
        self.check_indices(u_index, v_index)?;
        self.weights[u_index][v_index] = weight;
        Ok(())
    }

    /// First partial derivative in the u direction.
    pub fn u_tangent_at(&self, u: f64, v: f64) -> Vector3 {
        self.derivatives(u, v, 1)[1][0]
    }

    /// First partial derivative in the v direction.
    pub fn v_tangent_at(&self, u: f64, v: f64) -> Vector3 {
        self.derivatives(u, v, 1)[0][1]
    }

    /// Rational partial derivatives `d^(k+l) S / du^k dv^l` for `k + l <= order`.
    ///
    /// Returned as a grid indexed `[k][l]`; entries with `k + l > order` are
    /// zero. Homogeneous derivatives are reduced through the two-parameter
    /// binomial quotient-rule recursion.
    pub fn derivatives(&self, u: f64, v: f64, order: usize) -> Vec<Vec<Vector3>> {
        let (aders, wders) = self.homogeneous_derivs(u, v, order);
        let w0 = wders[0][0];

        let mut skl = vec![vec![Vector3::ZERO; order + 1]; order + 1];
        for k in 0..=order {
            for l in 0..=(order - k) {
                let mut val = aders[k][l];
                for j in 1..=l {
                    val -= binomial(l, j) * wders[0][j] * skl[k][l - j];
                }
                for i in 1..=k {
                    val -= binomial(k, i) * wders[i][0] * skl[k - i][l];
                    let mut inner = Vector3::ZERO;
                    for j in 1..=l {
                        inner += binomial(l, j) * wders[i][j] * skl[k - i][l - j];
                    }
                    val -= binomial(k, i) * inner;
                }
                skl[k][l] = if w0.abs() < 1e-15 { val } else { val / w0 };
            }
        }
        skl
    }

    /// Coefficients `(E, F, G)` of the first fundamental form.
    pub fn first_fundamental_form(&self, u: f64, v: f64) -> (f64, f64, f64) {
        let skl = self.derivatives(u, v, 1);
        let su = skl[1][0];
        let sv = skl[0][1];
        (su.dot(su), su.dot(sv), sv.dot(sv))
    }

    /// Coefficients `(L, M, N)` of the second fundamental form.
    ///
    /// Zero when the surface normal is degenerate at `(u, v)`.
    pub fn second_fundamental_form(&self, u: f64, v: f64) -> (f64, f64, f64) {
        let skl = self.derivatives(u, v, 2);
        let normal = skl[1][0].cross(skl[0][1]);
        let len = normal.length();
        if len < 1e-12 {
            return (0.0, 0.0, 0.0);
        }
        let n = normal / len;
        (skl[2][0].dot(n), skl[1][1].dot(n), skl[0][2].dot(n))
    }

    /// Gaussian curvature `K = (LN - M^2) / (EG - F^2)`.
    ///
    /// Defined as 0 where the first fundamental form is degenerate.
    pub fn gaussian_curvature_at(&self, u: f64, v: f64) -> f64 {
        match self.curvature_terms(u, v) {
            Some((e, f, g, l, m, n)) => (l * n - m * m) / (e * g - f * f),
            None => 0.0,
        }
    }

    /// Mean curvature `H = (EN + GL - 2FM) / (2 (EG - F^2))`.
    ///
    /// Defined as 0 where the first fundamental form is degenerate.
    pub fn mean_curvature_at(&self, u: f64, v: f64) -> f64 {
        match self.curvature_terms(u, v) {
            Some((e, f, g, l, m, n)) => (e * n + g * l - 2.0 * f * m) / (2.0 * (e * g - f * f)),
            None => 0.0,
        }
    }

    /// Principal curvatures `(k1, k2)`, `k1` the larger root of
    /// `k^2 - 2Hk + K = 0`.
    pub fn principal_curvatures_at(&self, u: f64, v: f64) -> (f64, f64) {
        match self.curvature_terms(u, v) {
            Some((e, f, g, l, m, n)) => {
                let det = e * g - f * f;
                let k = (l * n - m * m) / det;
                let h = (e * n + g * l - 2.0 * f * m) / (2.0 * det);
                let s = (h * h - k).max(0.0).sqrt();
                (h + s, h - s)
            }
            None => (0.0, 0.0),
        }
    }

    /// Whether the first and last u-rows of the control net coincide.
    pub fn is_u_closed(&self) -> bool {
        let first = &self.control_points[0];
        let last = &self.control_points[self.control_points.len() - 1];
        first
            .iter()
            .zip(last)
            .all(|(&a, &b)| (a - b).length() < Tolerance::DEFAULT_LINEAR)
    }

    /// Whether the first and last v-columns of the control net coincide.
    pub fn is_v_closed(&self) -> bool {
        let last = self.control_points[0].len() - 1;
        self.control_points
            .iter()
            .all(|row| (row[0] - row[last]).length() < Tolerance::DEFAULT_LINEAR)
    }

    /// Whether the u knot vector has periodic structure.
    pub fn is_u_periodic(&self) -> bool {
        is_periodic(self.degree_u, &self.knots_u, 1e-9)
    }

    /// Whether the v knot vector has periodic structure.
    pub fn is_v_periodic(&self) -> bool {
        is_periodic(self.degree_v, &self.knots_v, 1e-9)
    }

    /// Extract the iso-parameter curve running in the u direction at fixed `v`.
    ///
    /// The v direction is collapsed in homogeneous space, so the returned
    /// curve evaluates identically to `point_at(u, v)` for every `u`.
    pub fn iso_curve_u(&self, v: f64) -> Result<NurbsCurve> {
        let n_v = self.control_points[0].len() - 1;
        let span_v = find_span(self.degree_v, &self.knots_v, n_v, v);
        let basis_v = basis_functions(self.degree_v, &self.knots_v, span_v, v);

        let mut points = Vec::with_capacity(self.control_points.len());
        let mut weights = Vec::with_capacity(self.control_points.len());
        for i in 0..self.control_points.len() {
            let mut q = DVec4::ZERO;
            for (j, &b) in basis_v.iter().enumerate() {
                let vj = span_v - self.degree_v + j;
                q += b * refine::to_homogeneous(self.control_points[i][vj], self.weights[i][vj]);
            }
            let (p, w) = refine::from_homogeneous(q);
            points.push(p);
            weights.push(w);
        }

        NurbsCurve::new(self.degree_u, self.knots_u.clone(), points, weights)
    }

    /// Extract the iso-parameter curve running in the v direction at fixed `u`.
    pub fn iso_curve_v(&self, u: f64) -> Result<NurbsCurve> {
        let n_u = self.control_points.len() - 1;
        let span_u = find_span(self.degree_u, &self.knots_u, n_u, u);
        let basis_u = basis_functions(self.degree_u, &self.knots_u, span_u, u);

        let n_v = self.control_points[0].len();
        let mut points = Vec::with_capacity(n_v);
        let mut weights = Vec::with_capacity(n_v);
        for j in 0..n_v {
            let mut q = DVec4::ZERO;
            for (i, &b) in basis_u.iter().enumerate() {
                let ui = span_u - self.degree_u + i;
                q += b * refine::to_homogeneous(self.control_points[ui][j], self.weights[ui][j]);
            }
            let (p, w) = refine::from_homogeneous(q);
            points.push(p);
            weights.push(w);
        }

        NurbsCurve::new(self.degree_v, self.knots_v.clone(), points, weights)
    }

    /// Reverse the u direction in place.
    pub fn reverse_u(&mut self) {
        self.control_points.reverse();
        self.weights.reverse();
        let (t_min, t_max) = domain(self.degree_u, &self.knots_u);
        self.knots_u = self
            .knots_u
            .iter()
            .rev()
            .map(|&k| t_min + t_max - k)
            .collect();
    }

    /// Reverse the v direction in place.
    pub fn reverse_v(&mut self) {
        for row in &mut self.control_points {
            row.reverse();
        }
        for row in &mut self.weights {
            row.reverse();
        }
        let (t_min, t_max) = domain(self.degree_v, &self.knots_v);
        self.knots_v = self
            .knots_v
            .iter()
            .rev()
            .map(|&k| t_min + t_max - k)
            .collect();
    }

    /// Insert `t` once into the u knot vector without changing the surface.
    pub fn insert_knot_u(&mut self, t: f64) -> Result<()> {
        let n_u = self.control_points.len();
        let n_v = self.control_points[0].len();

        let mut new_knots = Vec::new();
        let mut columns: Vec<(Vec<Point3>, Vec<f64>)> = Vec::with_capacity(n_v);
        for j in 0..n_v {
            let poles: Vec<DVec4> = (0..n_u)
                .map(|i| refine::to_homogeneous(self.control_points[i][j], self.weights[i][j]))
                .collect();
            let (knots, poles) =
                refine::insert_knot(self.degree_u, &self.knots_u, &poles, t, 1e-12)?;
            new_knots = knots;
            columns.push(poles.iter().map(|&q| refine::from_homogeneous(q)).unzip());
        }

        let mut points: Vec<Vec<Point3>> = (0..n_u + 1).map(|_| Vec::with_capacity(n_v)).collect();
        let mut weights: Vec<Vec<f64>> = (0..n_u + 1).map(|_| Vec::with_capacity(n_v)).collect();
        for (i, (points_row, weights_row)) in points.iter_mut().zip(weights.iter_mut()).enumerate()
        {
            for column in &columns {
                points_row.push(column.0[i]);
                weights_row.push(column.1[i]);
            }
        }

        self.knots_u = new_knots;
        self.control_points = points;
        self.weights = weights;
        Ok(())
    }

    /// Insert `t` once into the v knot vector without changing the surface.
    pub fn insert_knot_v(&mut self, t: f64) -> Result<()> {
        let mut new_knots = Vec::new();
        let mut rows: Vec<(Vec<Point3>, Vec<f64>)> = Vec::with_capacity(self.control_points.len());
        for (row, weight_row) in self.control_points.iter().zip(&self.weights) {
            let poles: Vec<DVec4> = row
                .iter()
                .zip(weight_row)
                .map(|(&p, &w)| refine::to_homogeneous(p, w))
                .collect();
            let (knots, poles) =
                refine::insert_knot(self.degree_v, &self.knots_v, &poles, t, 1e-12)?;
            new_knots = knots;
            rows.push(poles.iter().map(|&q| refine::from_homogeneous(q)).unzip());
        }

        self.knots_v = new_knots;
        self.control_points = rows.iter().map(|r| r.0.clone()).collect();
        self.weights = rows.iter().map(|r| r.1.clone()).collect();
        Ok(())
    }

    fn check_indices(&self, u_index: usize, v_index: usize) -> Result<()> {
        if u_index >= self.control_points.len() || v_index >= self.control_points[0].len() {
            return Err(CurveLabError::IndexOutOfRange(format!(
                "Control point index ({}, {}) out of range ({} x {})",
                u_index,
                v_index,
                self.control_points.len(),
                self.control_points[0].len()
            )));
        }
        Ok(())
    }

    fn curvature_terms(&self, u: f64, v: f64) -> Option<(f64, f64, f64, f64, f64, f64)> {
        let skl = self.derivatives(u, v, 2);
        let su = skl[1][0];
        let sv = skl[0][1];

        let e = su.dot(su);
        let f = su.dot(sv);
        let g = sv.dot(sv);
        if (e * g - f * f).abs() < 1e-12 {
            return None;
        }

        let normal = su.cross(sv);
        let len = normal.length();
        if len < 1e-12 {
            return None;
        }
        let n = normal / len;

        Some((e, f, g, skl[2][0].dot(n), skl[1][1].dot(n), skl[0][2].dot(n)))
    }

    fn homogeneous_derivs(
        &self,
        u: f64,
        v: f64,
        order: usize,
    ) -> (Vec<Vec<Vector3>>, Vec<Vec<f64>>) {
        let n_u = self.control_points.len() - 1;
        let n_v = self.control_points[0].len() - 1;
        let span_u = find_span(self.degree_u, &self.knots_u, n_u, u);
        let span_v = find_span(self.degree_v, &self.knots_v, n_v, v);
        let ders_u = basis_function_derivs(self.degree_u, &self.knots_u, span_u, u, order);
        let ders_v = basis_function_derivs(self.degree_v, &self.knots_v, span_v, v, order);

        let mut aders = vec![vec![Vector3::ZERO; order + 1]; order + 1];
        let mut wders = vec![vec![0.0; order + 1]; order + 1];

        for k in 0..=order {
            for l in 0..=(order - k) {
                for i in 0..=self.degree_u {
                    let ui = span_u - self.degree_u + i;
                    for j in 0..=self.degree_v {
                        let vj = span_v - self.degree_v + j;
                        let bw = ders_u[k][i] * ders_v[l][j] * self.weights[ui][vj];
                        aders[k][l] += bw * self.control_points[ui][vj];
                        wders[k][l] += bw;
                    }
                }
            }
        }

        (aders, wders)
    }
}

impl Surface for NurbsSurface {
    fn point_at(&self, u: f64, v: f64) -> Point3 {
        let n_u = self.control_points.len() - 1;
        let span_u = find_span(self.degree_u, &self.knots_u, n_u, u);
        let basis_u = basis_functions(self.degree_u, &self.knots_u, span_u, u);

        let n_v = self.control_points[0].len() - 1;
        let span_v = find_span(self.degree_v, &self.knots_v, n_v, v);
        let basis_v = basis_functions(self.degree_v, &self.knots_v, span_v, v);

        let mut point = Vector3::ZERO;
        let mut w = 0.0;

        for (i, &bu) in basis_u.iter().enumerate() {
            let ui = span_u - self.degree_u + i;
            for (j, &bv) in basis_v.iter().enumerate() {
                let vj = span_v - self.degree_v + j;
                let bw = bu * bv * self.weights[ui][vj];
                point += bw * self.control_points[ui][vj];
                w += bw;
            }
        }

        if w.abs() < 1e-15 {
            point
        } else {
            point / w
        }
    }

    fn normal_at(&self, u: f64, v: f64) -> Vector3 {
        let skl = self.derivatives(u, v, 1);
        let normal = skl[1][0].cross(skl[0][1]);
        let len = normal.length();
        if len < 1e-15 {
            Vector3::Z
        } else {
            normal / len
        }
    }

    fn domain_u(&self) -> (f64, f64) {
        domain(self.degree_u, &self.knots_u)
    }

    fn domain_v(&self) -> (f64, f64) {
        domain(self.degree_v, &self.knots_v)
    }
}

impl Validate for NurbsSurface {
    fn validate(&self) -> Result<()> {
        let (n_u, n_v) = validate_grid(
            &self.control_points,
            &self.weights,
            self.degree_u,
            self.degree_v,
        )?;
        validate_knots(self.degree_u, &self.knots_u, n_u)?;
        validate_knots(self.degree_v, &self.knots_v, n_v)
    }
}

fn validate_grid(
    control_points: &[Vec<Point3>],
    weights: &[Vec<f64>],
    degree_u: usize,
    degree_v: usize,
) -> Result<(usize, usize)> {
    if control_points.len() < 2 {
        return Err(CurveLabError::Construction(format!(
            "At least 2 control rows required, got {}",
            control_points.len()
        )));
    }
    let n_v = control_points[0].len();
    if n_v < 2 {
        return Err(CurveLabError::Construction(format!(
            "At least 2 control columns required, got {}",
            n_v
        )));
    }
    if control_points.iter().any(|row| row.len() != n_v) {
        return Err(CurveLabError::Construction(
            "Control point grid must be rectangular".to_string(),
        ));
    }
    if degree_u < 1 || degree_v < 1 {
        return Err(CurveLabError::Construction(
            "Degrees must be at least 1".to_string(),
        ));
    }
    if weights.len() != control_points.len()
        || weights.iter().zip(control_points).any(|(w, p)| w.len() != p.len())
    {
        return Err(CurveLabError::Construction(
            "Weight grid must match the control point grid".to_string(),
        ));
    }
    for row in weights {
        if let Some(w) = row.iter().find(|&&w| w <= 0.0) {
            return Err(CurveLabError::Construction(format!(
                "Weights must be positive, got {}",
                w
            )));
        }
    }
    Ok((control_points.len(), n_v))
}
