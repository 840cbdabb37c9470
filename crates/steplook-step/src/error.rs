//! Error types for reading and resolving STEP files.

use steplook_geom::GeometryError;
use thiserror::Error;

/// Malformed Part 21 syntax, with the position where it was detected.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("parse error at line {line}, column {column}: {reason}")]
pub struct ParseError {
    /// Line number (1-indexed).
    pub line: usize,
    /// Column number (1-indexed).
    pub column: usize,
    /// What went wrong.
    pub reason: String,
}

impl ParseError {
    /// Create a parse error at a position.
    pub fn new(line: usize, column: usize, reason: impl Into<String>) -> Self {
        Self {
            line,
            column,
            reason: reason.into(),
        }
    }
}

/// Failures while turning raw entities into typed nodes.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolveError {
    /// A reference points at an id that is not in the data section.
    #[error("missing entity reference: #{id}")]
    MissingEntity {
        /// The dangling id.
        id: u64,
    },

    /// A geometry or topology entity needed for the B-rep has no mapping.
    #[error("unsupported entity #{id}: {type_tag}")]
    UnsupportedEntity {
        /// Entity id.
        id: u64,
        /// Its type tag (the first record for complex instances).
        type_tag: String,
    },

    /// An attribute or referenced entity has the wrong kind.
    #[error("entity #{id}: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Entity id.
        id: u64,
        /// What the resolver expected.
        expected: String,
        /// What it found.
        actual: String,
    },

    /// Reference chains nested deeper than the resolver allows.
    #[error("cyclic dependency: reference depth exceeded at entity #{id}")]
    CyclicDependency {
        /// The entity being resolved when the bound was hit.
        id: u64,
    },

    /// A curve or surface could not be constructed from its attributes.
    #[error("invalid geometry in entity #{id}: {source}")]
    Geometry {
        /// Entity id.
        id: u64,
        /// Underlying geometry failure.
        #[source]
        source: GeometryError,
    },
}

impl ResolveError {
    /// Create a type mismatch error.
    pub fn type_mismatch(id: u64, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeMismatch {
            id,
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create an unsupported entity error.
    pub fn unsupported(id: u64, type_tag: impl Into<String>) -> Self {
        Self::UnsupportedEntity {
            id,
            type_tag: type_tag.into(),
        }
    }

    /// Wrap a geometry failure with the entity that caused it.
    pub fn geometry(id: u64, source: GeometryError) -> Self {
        Self::Geometry { id, source }
    }
}

/// Errors that can occur while reading a STEP file into an entity graph.
#[derive(Error, Debug)]
pub enum StepError {
    /// I/O error reading a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Syntax error.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Resolution error.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}
