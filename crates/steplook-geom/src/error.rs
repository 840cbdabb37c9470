//! Error types for geometry construction and evaluation.

use steplook_nurbs::NurbsError;
use thiserror::Error;

/// Errors from building or evaluating curves and surfaces.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// Knot count, multiplicities, degree or weights are inconsistent.
    #[error("degenerate knot vector: {0}")]
    DegenerateKnotVector(String),

    /// The partial derivatives are parallel or vanish at this parameter.
    #[error("degenerate normal at (u={u}, v={v})")]
    DegenerateNormal {
        /// First parameter.
        u: f64,
        /// Second parameter.
        v: f64,
    },

    /// A primitive was built from invalid dimensions (e.g. a negative radius).
    #[error("invalid geometry: {0}")]
    Invalid(String),
}

impl From<NurbsError> for GeometryError {
    fn from(e: NurbsError) -> Self {
        match e {
            NurbsError::DegenerateKnotVector(msg) => Self::DegenerateKnotVector(msg),
        }
    }
}
