//! CurveLab fitting: build NURBS curves and surfaces from point samples.

pub mod curve;
pub mod param;
pub mod surface;

pub use curve::{approximate_curve, fit_curve, fit_curves, interpolate_curve};
pub use curvelab_geometry::basis::{clamped_knot_vector, uniform_knot_vector};
pub use param::{averaged_knot_vector, chord_length_parameters};
pub use surface::fit_surface;
