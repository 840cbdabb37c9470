//! Topology errors raised while assembling the B-rep.

use thiserror::Error;

/// Structural problems in the face/loop/edge graph.
///
/// Ids are STEP entity ids so messages can be matched against the file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopologyError {
    /// Consecutive edges of a loop do not meet, or the loop does not close.
    #[error("loop #{loop_id} is not closed")]
    UnclosedWire {
        /// The EDGE_LOOP.
        loop_id: u64,
    },

    /// The outer wire runs clockwise around the declared face normal.
    #[error("face #{face_id}: declared orientation disagrees with its outer wire")]
    InconsistentOrientation {
        /// The face.
        face_id: u64,
    },

    /// The face has no bound and its surface has no closed domain to use instead.
    #[error("face #{face_id} has no outer bound")]
    MissingOuterBound {
        /// The face.
        face_id: u64,
    },

    /// No solid, surface model or shell was found.
    #[error("file contains no solid or shell geometry")]
    NoGeometry,
}
