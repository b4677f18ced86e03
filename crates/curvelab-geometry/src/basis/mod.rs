//! B-spline basis evaluation: knot vectors, Cox-de Boor recurrence, refinement.

pub mod eval;
pub mod knot;
pub(crate) mod refine;

pub use eval::{basis_function_derivs, basis_functions};
pub use knot::{
    clamped_knot_vector, domain, find_span, is_clamped, is_periodic, knot_multiplicities,
    normalize_knots, uniform_knot_vector, validate_knots,
};
