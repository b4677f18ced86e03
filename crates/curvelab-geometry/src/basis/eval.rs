//! Cox-de Boor basis function evaluation and derivatives.

/// Compute the non-vanishing basis functions at parameter `t`.
///
/// Returns `degree + 1` values `N_{span-degree,degree}(t)` through
/// `N_{span,degree}(t)`, built bottom-up from the triangular recurrence in
/// O(degree^2) time and O(degree) extra space.
///
/// # Arguments
/// * `degree` - Degree of the B-spline
/// * `knots` - The knot vector
/// * `span` - The knot span index (from `find_span`)
/// * `t` - Parameter value
pub fn basis_functions(degree: usize, knots: &[f64], span: usize, t: f64) -> Vec<f64> {
    let mut n = vec![0.0; degree + 1];
    let mut left = vec![0.0; degree + 1];
    let mut right = vec![0.0; degree + 1];

    n[0] = 1.0;

    for j in 1..=degree {
        left[j] = t - knots[span + 1 - j];
        right[j] = knots[span + j] - t;
        let mut saved = 0.0;

        for r in 0..j {
            let denom = right[r + 1] + left[j - r];
            // Zero span width only at an interior knot of full multiplicity
            let temp = if denom.abs() < 1e-15 { 0.0 } else { n[r] / denom };
            n[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }

        n[j] = saved;
    }

    n
}

/// Compute basis functions and their derivatives up to `order` at parameter `t`.
///
/// Returns `order + 1` rows: row `k` holds the `k`-th derivatives of the
/// `degree + 1` non-vanishing basis functions. Rows beyond the degree are
/// zero, since those derivatives vanish identically.
///
/// Shares a single triangular table of basis values and knot differences
/// between the value and derivative passes; derivative rows are assembled
/// from alternating two-row coefficient buffers.
pub fn basis_function_derivs(
    degree: usize,
    knots: &[f64],
    span: usize,
    t: f64,
    order: usize,
) -> Vec<Vec<f64>> {
    let p = degree;
    let n = order.min(p);

    // ndu[j][r] (j > r) stores knot differences, ndu[r][j] basis values.
    let mut ndu = vec![vec![0.0; p + 1]; p + 1];
    let mut left = vec![0.0; p + 1];
    let mut right = vec![0.0; p + 1];

    ndu[0][0] = 1.0;

    for j in 1..=p {
        left[j] = t - knots[span + 1 - j];
        right[j] = knots[span + j] - t;
        let mut saved = 0.0;

        for r in 0..j {
            ndu[j][r] = right[r + 1] + left[j - r];
            let temp = if ndu[j][r].abs() < 1e-15 {
                0.0
            } else {
                ndu[r][j - 1] / ndu[j][r]
            };

            ndu[r][j] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        ndu[j][j] = saved;
    }

    let mut ders = vec![vec![0.0; p + 1]; order + 1];
    for j in 0..=p {
        ders[0][j] = ndu[j][p];
    }

    if n == 0 {
        return ders;
    }

    let mut a = vec![vec![0.0; p + 1]; 2];

    for r in 0..=p {
        let mut s1 = 0usize;
        let mut s2 = 1usize;
        a[0][0] = 1.0;
        a[1].iter_mut().for_each(|v| *v = 0.0);

        for k in 1..=n {
            let mut d = 0.0;
            let rk = r as isize - k as isize;
            let pk = p - k;

            if r >= k {
                a[s2][0] = safe_div(a[s1][0], ndu[pk + 1][(rk) as usize]);
                d = a[s2][0] * ndu[rk as usize][pk];
            }

            let j1 = if rk >= -1 { 1 } else { (-rk) as usize };
            let j2 = if r <= pk + 1 { k - 1 } else { p - r };

            for j in j1..=j2 {
                let idx = (rk + j as isize) as usize;
                a[s2][j] = safe_div(a[s1][j] - a[s1][j - 1], ndu[pk + 1][idx]);
                d += a[s2][j] * ndu[idx][pk];
            }

            if r <= pk {
                a[s2][k] = safe_div(-a[s1][k - 1], ndu[pk + 1][r]);
                d += a[s2][k] * ndu[r][pk];
            }

            ders[k][r] = d;
            std::mem::swap(&mut s1, &mut s2);
        }
    }

    // Scale by p! / (p - k)!
    let mut factor = p as f64;
    for k in 1..=n {
        for j in 0..=p {
            ders[k][j] *= factor;
        }
        factor *= (p - k) as f64;
    }

    ders
}

fn safe_div(num: f64, den: f64) -> f64 {
    if den.abs() < 1e-15 {
        0.0
    } else {
        num / den
    }
}

/// Binomial coefficient as a float, for the rational derivative recursions.
pub(crate) fn binomial(n: usize, k: usize) -> f64 {
    if k > n {
        return 0.0;
    }
    let k = k.min(n - k);
    let mut result = 1.0;
    for i in 0..k {
        result = result * (n - i) as f64 / (i + 1) as f64;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basis::knot::find_span;
    use approx::assert_relative_eq;

    #[test]
    fn test_basis_functions_partition_of_unity() {
        let knots = vec![0.0, 0.0, 0.0, 1.0, 2.0, 3.0, 3.0, 3.0];
        let degree = 2;
        let n = 4;

        for &t in &[0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0] {
            let span = find_span(degree, &knots, n, t);
            let basis = basis_functions(degree, &knots, span, t);
            let sum: f64 = basis.iter().sum();
            assert!(
                (sum - 1.0).abs() < 1e-12,
                "Partition of unity failed at t={}: sum={}",
                t,
                sum
            );
        }
    }

    #[test]
    fn test_basis_functions_non_negative() {
        let knots = vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        let degree = 3;
        let n = 3;

        for i in 0..=20 {
            let t = i as f64 / 20.0;
            let span = find_span(degree, &knots, n, t);
            let basis = basis_functions(degree, &knots, span, t);
            for (j, &val) in basis.iter().enumerate() {
                assert!(val >= -1e-15, "Negative basis at t={}, j={}: {}", t, j, val);
            }
        }
    }

    #[test]
    fn test_bezier_cubic_values_and_derivs() {
        // Bezier basis: N_i = C(3,i) t^i (1-t)^(3-i)
        let knots = vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        let t = 0.3;
        let span = find_span(3, &knots, 3, t);
        let ders = basis_function_derivs(3, &knots, span, t, 2);

        let s = 1.0 - t;
        let expected = [s * s * s, 3.0 * t * s * s, 3.0 * t * t * s, t * t * t];
        for (i, &e) in expected.iter().enumerate() {
            assert_relative_eq!(ders[0][i], e, epsilon = 1e-12);
        }

        // Analytic first derivatives of the Bernstein polynomials
        let d_expected = [
            -3.0 * s * s,
            3.0 * s * s - 6.0 * t * s,
            6.0 * t * s - 3.0 * t * t,
            3.0 * t * t,
        ];
        for (i, &e) in d_expected.iter().enumerate() {
            assert_relative_eq!(ders[1][i], e, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_derivs_sum_to_zero() {
        // Derivatives of a partition of unity sum to zero
        let knots = vec![0.0, 0.0, 0.0, 1.0, 2.0, 3.0, 3.0, 3.0];
        for &t in &[0.2, 1.1, 2.7] {
            let span = find_span(2, &knots, 4, t);
            let ders = basis_function_derivs(2, &knots, span, t, 2);
            let d1: f64 = ders[1].iter().sum();
            let d2: f64 = ders[2].iter().sum();
            assert!(d1.abs() < 1e-12, "first derivs sum {} at t={}", d1, t);
            assert!(d2.abs() < 1e-12, "second derivs sum {} at t={}", d2, t);
        }
    }

    #[test]
    fn test_derivs_match_finite_difference() {
        let knots = vec![0.0, 0.0, 0.0, 0.25, 0.5, 0.75, 1.0, 1.0, 1.0];
        let degree = 2;
        let n = 5;
        let t = 0.4;
        let h = 1e-6;

        let span = find_span(degree, &knots, n, t);
        let ders = basis_function_derivs(degree, &knots, span, t, 1);
        let plus = basis_functions(degree, &knots, find_span(degree, &knots, n, t + h), t + h);
        let minus = basis_functions(degree, &knots, find_span(degree, &knots, n, t - h), t - h);

        for i in 0..=degree {
            let fd = (plus[i] - minus[i]) / (2.0 * h);
            assert_relative_eq!(ders[1][i], fd, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_order_beyond_degree_is_zero() {
        let knots = vec![0.0, 0.0, 1.0, 1.0];
        let ders = basis_function_derivs(1, &knots, 1, 0.5, 3);
        assert_eq!(ders.len(), 4);
        assert!(ders[2].iter().all(|&v| v == 0.0));
        assert!(ders[3].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_binomial() {
        assert_eq!(binomial(4, 0), 1.0);
        assert_eq!(binomial(4, 2), 6.0);
        assert_eq!(binomial(5, 5), 1.0);
        assert_eq!(binomial(3, 5), 0.0);
    }
}
