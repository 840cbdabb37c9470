//! Load errors.

use steplook_brep::TopologyError;
use steplook_step::{ParseError, ResolveError, StepError};
use steplook_tessellate::TessellationError;
use thiserror::Error;

/// Everything that can abort a load.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The exchange structure is malformed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// An entity reference, type or geometry could not be resolved.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The faces do not form a valid boundary representation.
    #[error(transparent)]
    Topology(#[from] TopologyError),

    /// A face could not be triangulated.
    #[error(transparent)]
    Tessellation(#[from] TessellationError),

    /// A [`LoadOptions`](crate::LoadOptions) value is out of range or
    /// malformed.
    #[error("invalid options: {0}")]
    Options(String),
}

impl From<StepError> for LoadError {
    fn from(e: StepError) -> Self {
        match e {
            StepError::Io(e) => Self::Io(e),
            StepError::Parse(e) => Self::Parse(e),
            StepError::Resolve(e) => Self::Resolve(e),
        }
    }
}

impl LoadError {
    /// Pipeline stage the error came from, for log lines.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Io(_) => "read",
            Self::Parse(_) => "parse",
            Self::Resolve(_) => "resolve",
            Self::Topology(_) => "assemble",
            Self::Tessellation(_) => "tessellate",
            Self::Options(_) => "configure",
        }
    }
}
