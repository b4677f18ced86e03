//! Separable surface interpolation over a rectangular point grid.

use curvelab_core::{CurveLabError, Result, Tolerance};
use curvelab_geometry::NurbsSurface;
use curvelab_math::Point3;

use crate::curve::{basis_matrix, matrix_rows_to_points, points_matrix};
use crate::param::{averaged_knot_vector, chord_length_parameters, total_chord_length};

/// Fit a NURBS surface through a rectangular grid of points.
///
/// `grid[i][j]` is the sample at u-row `i` and v-column `j`. The fit is
/// separable: every row is interpolated against a shared v-parameterization,
/// then every column of the intermediate control net is interpolated against
/// a shared u-parameterization. Parameters are chord-length values averaged
/// across rows/columns, so the surface passes through `grid[i][j]` at the
/// averaged parameter pair. The returned surface carries the weights used by
/// the solve (unit weights).
pub fn fit_surface(
    grid: &[Vec<Point3>],
    degree_u: usize,
    degree_v: usize,
    tolerance: Tolerance,
) -> Result<NurbsSurface> {
    let (n_u, n_v) = validate_grid_input(grid, degree_u, degree_v)?;

    let v_params =
        averaged_direction_params(grid.iter().cloned(), n_v, tolerance).ok_or_else(degenerate_grid)?;
    let columns: Vec<Vec<Point3>> = (0..n_v)
        .map(|j| grid.iter().map(|row| row[j]).collect())
        .collect();
    let u_params =
        averaged_direction_params(columns.iter().cloned(), n_u, tolerance).ok_or_else(degenerate_grid)?;

    check_strictly_increasing(&u_params)?;
    check_strictly_increasing(&v_params)?;

    log::debug!(
        "fit_surface: {}x{} grid, degrees ({}, {})",
        n_u,
        n_v,
        degree_u,
        degree_v
    );

    // Interpolate each row against the shared v basis
    let v_knots = averaged_knot_vector(&v_params, degree_v);
    let v_lu = basis_matrix(&v_params, degree_v, &v_knots, n_v).lu();
    let mut intermediate: Vec<Vec<Point3>> = Vec::with_capacity(n_u);
    for row in grid {
        let solved = v_lu
            .solve(&points_matrix(row))
            .ok_or_else(|| singular_direction("v"))?;
        intermediate.push(matrix_rows_to_points(&solved));
    }

    // Interpolate each column of the intermediate net against the u basis
    let u_knots = averaged_knot_vector(&u_params, degree_u);
    let u_lu = basis_matrix(&u_params, degree_u, &u_knots, n_u).lu();
    let mut control_points: Vec<Vec<Point3>> = (0..n_u).map(|_| vec![Point3::ZERO; n_v]).collect();
    for j in 0..n_v {
        let column: Vec<Point3> = intermediate.iter().map(|row| row[j]).collect();
        let solved = u_lu
            .solve(&points_matrix(&column))
            .ok_or_else(|| singular_direction("u"))?;
        for (i, p) in matrix_rows_to_points(&solved).into_iter().enumerate() {
            control_points[i][j] = p;
        }
    }

    let weights = vec![vec![1.0; n_v]; n_u];
    NurbsSurface::new(degree_u, degree_v, u_knots, v_knots, control_points, weights)
}

/// Chord-length parameters averaged over parallel point sequences.
///
/// Sequences shorter than their chord tolerance are skipped; `None` when
/// every sequence is degenerate.
fn averaged_direction_params(
    sequences: impl Iterator<Item = Vec<Point3>>,
    count: usize,
    tolerance: Tolerance,
) -> Option<Vec<f64>> {
    let mut sums = vec![0.0; count];
    let mut used = 0usize;
    for seq in sequences {
        if total_chord_length(&seq) < tolerance.linear {
            continue;
        }
        for (sum, p) in sums.iter_mut().zip(chord_length_parameters(&seq)) {
            *sum += p;
        }
        used += 1;
    }
    if used == 0 {
        return None;
    }
    Some(sums.into_iter().map(|s| s / used as f64).collect())
}

fn validate_grid_input(
    grid: &[Vec<Point3>],
    degree_u: usize,
    degree_v: usize,
) -> Result<(usize, usize)> {
    if grid.len() < 2 {
        return Err(CurveLabError::Construction(format!(
            "At least 2 grid rows required, got {}",
            grid.len()
        )));
    }
    let n_v = grid[0].len();
    if n_v < 2 {
        return Err(CurveLabError::Construction(format!(
            "At least 2 grid columns required, got {}",
            n_v
        )));
    }
    if grid.iter().any(|row| row.len() != n_v) {
        return Err(CurveLabError::Construction(
            "Point grid must be rectangular".to_string(),
        ));
    }
    if degree_u < 1 || degree_v < 1 {
        return Err(CurveLabError::Construction(
            "Degrees must be at least 1".to_string(),
        ));
    }
    if degree_u >= grid.len() {
        return Err(CurveLabError::Construction(format!(
            "U degree ({}) must be less than the number of rows ({})",
            degree_u,
            grid.len()
        )));
    }
    if degree_v >= n_v {
        return Err(CurveLabError::Construction(format!(
            "V degree ({}) must be less than the number of columns ({})",
            degree_v, n_v
        )));
    }
    Ok((grid.len(), n_v))
}

fn check_strictly_increasing(params: &[f64]) -> Result<()> {
    if params.windows(2).any(|w| w[1] - w[0] < 1e-14) {
        return Err(CurveLabError::Degenerate(
            "Duplicate parameter values in grid direction".to_string(),
        ));
    }
    Ok(())
}

fn degenerate_grid() -> CurveLabError {
    CurveLabError::Degenerate("All grid points coincide within tolerance".to_string())
}

fn singular_direction(direction: &str) -> CurveLabError {
    CurveLabError::Singular(format!(
        "Interpolation system in the {} direction is singular",
        direction
    ))
}
