//! CurveLab geometry: rational B-spline curves and surfaces.

pub mod basis;
pub mod curve;
pub mod surface;

pub use curve::{Curve, NurbsCurve};
pub use surface::{NurbsSurface, Surface};
