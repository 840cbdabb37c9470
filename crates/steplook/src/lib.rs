#![warn(missing_docs)]

//! steplook: STEP solid models as triangle meshes for quick preview.
//!
//! Reads an ISO 10303-21 exchange file, resolves its B-rep solids (or
//! surface models when there are none), tessellates every face within a
//! chord tolerance and returns one welded, indexed mesh with smooth
//! normals.
//!
//! # Example
//!
//! ```rust,no_run
//! let result = steplook::load("bracket.step");
//! if result.success {
//!     let mesh = &result.mesh;
//!     println!("{} vertices, {} triangles", mesh.vertex_count(), mesh.triangle_count());
//! }
//! steplook::release(result.mesh);
//! ```
//!
//! [`load`] collapses every failure to `success = false`; [`try_load`]
//! returns the [`LoadError`] instead. The library logs through the `log`
//! facade and installs no logger of its own.

mod error;
pub mod ffi;
mod handle;
mod load;
mod options;

pub use error::LoadError;
pub use handle::{LoadResult, MeshHandle};
pub use load::{load, load_from_bytes, release, try_load, try_load_with_stats, LoadStats};
pub use options::LoadOptions;
pub use steplook_tessellate::{Mesh, TessellationParams};
