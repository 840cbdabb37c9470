//! Tessellation quality and resource limits.

/// Parameters controlling mesh density and refinement limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TessellationParams {
    /// Maximum distance between a triangle and the true surface, model units.
    pub chord_tolerance: f64,
    /// Maximum turning angle between neighbouring samples, radians.
    pub angular_tolerance: f64,
    /// Distance within which mesh vertices are merged.
    pub weld_tolerance: f64,
    /// Refinement passes allowed per curved face.
    pub max_refinement_passes: u32,
    /// Triangle budget per face.
    pub max_triangles_per_face: usize,
    /// Run the edge and face stages on the rayon pool.
    pub parallel: bool,
}

impl Default for TessellationParams {
    fn default() -> Self {
        Self {
            chord_tolerance: 0.01,
            angular_tolerance: 0.5,
            weld_tolerance: 1e-6,
            max_refinement_passes: 24,
            max_triangles_per_face: 2_000_000,
            parallel: true,
        }
    }
}

impl TessellationParams {
    /// Default limits with a different chord tolerance.
    pub fn with_chord_tolerance(chord_tolerance: f64) -> Self {
        Self {
            chord_tolerance,
            ..Self::default()
        }
    }

    /// Angular step that keeps a chord of an arc with radius `radius`
    /// within both tolerances.
    pub fn arc_step(&self, radius: f64) -> f64 {
        let chord = if self.chord_tolerance < radius {
            2.0 * (1.0 - self.chord_tolerance / radius).acos()
        } else {
            std::f64::consts::PI
        };
        chord.min(self.angular_tolerance).max(1e-4)
    }
}
