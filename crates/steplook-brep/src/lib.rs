#![warn(missing_docs)]

//! Boundary representation for the steplook mesher.
//!
//! [`assemble`] turns the resolver's entity graph into a [`Brep`]: solids
//! made of shells made of oriented faces, each bounded by an outer wire
//! and zero or more holes. Loop and face orientation flags are applied
//! here so downstream stages see wires in traversal order and only need
//! [`FaceUse::flipped`] to wind triangles.

mod assemble;
mod error;
mod topology;

pub use assemble::{assemble, trim_range};
pub use error::TopologyError;
pub use topology::{
    Brep, Edge, EdgeId, Face, FaceId, FaceUse, OrientedEdge, Shell, ShellId, Solid, SolidId, Vertex,
    VertexId, Wire, WireId, WireKind,
};
