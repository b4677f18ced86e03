//! CurveLab queries: sampling, arc length, and closest-point search.

pub mod curve;
pub mod surface;

use curvelab_core::Tolerance;

pub use curve::{arc_length, arc_length_full, closest_point, sample_curve};
pub use surface::closest_point_on_surface;

/// Sampling and iteration budgets for the query engine.
///
/// Passed by value into each query so independent pipelines can run with
/// different accuracy/effort trade-offs. The sample counts are the accuracy
/// knob of the coarse searches; `refine_steps` bounds the optional local
/// refinement of curve closest-point queries (0 disables it).
#[derive(Debug, Clone, Copy)]
pub struct QueryConfig {
    /// Samples for coarse closest-point search on curves
    pub curve_samples: usize,
    /// Samples per direction for coarse closest-point search on surfaces
    pub surface_samples: usize,
    /// Segments for chordal arc-length integration
    pub arc_segments: usize,
    /// Golden-section refinement iterations after the coarse search
    pub refine_steps: usize,
    pub tolerance: Tolerance,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            curve_samples: 100,
            surface_samples: 40,
            arc_segments: 100,
            refine_steps: 0,
            tolerance: Tolerance::default_precision(),
        }
    }
}
