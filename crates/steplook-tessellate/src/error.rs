//! Tessellation errors.

use thiserror::Error;

/// A face whose parameter domain could not be triangulated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TessellationError {
    /// The boundary could not be turned into a valid triangulation.
    #[error("face #{face_id} could not be tessellated: {reason}")]
    UnresolvedFace {
        /// STEP id of the face.
        face_id: u64,
        /// What went wrong.
        reason: String,
    },
}

impl TessellationError {
    /// Shorthand for [`TessellationError::UnresolvedFace`].
    pub fn unresolved(face_id: u64, reason: impl Into<String>) -> Self {
        Self::UnresolvedFace {
            face_id,
            reason: reason.into(),
        }
    }
}
