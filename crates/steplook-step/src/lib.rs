#![warn(missing_docs)]

//! ISO 10303-21 reader for the steplook mesher.
//!
//! Three stages, each usable on its own:
//!
//! 1. [`lexer`] turns bytes into positioned tokens.
//! 2. [`parser`] builds the raw entity table, keeping complex instances and
//!    marking type tags outside the mapped schema as
//!    [`EntityKind::Unrecognized`].
//! 3. [`resolve`] follows references from the file's solids (or shells) and
//!    produces a typed [`EntityGraph`] of curves, surfaces and topology,
//!    memoized so shared entities are built once.
//!
//! # Example
//!
//! ```no_run
//! use steplook_step::read_step;
//!
//! let graph = read_step("part.step").unwrap();
//! println!("{} faces", graph.faces.len());
//! ```

mod error;
pub mod graph;
pub mod lexer;
pub mod parser;
mod reader;
pub mod resolve;
mod schema;

pub use error::{ParseError, ResolveError, StepError};
pub use graph::EntityGraph;
pub use parser::{EntityKind, Parser, StepEntity, StepFile, StepValue, MAX_NESTING};
pub use reader::{read_step, read_step_from_buffer};
pub use resolve::{resolve, MAX_DEPTH};
