//! Owned mesh handle returned by [`load`](crate::load).

use steplook_tessellate::Mesh;

/// Read-only access to a loaded mesh.
///
/// The handle owns its buffers. A failed load returns an empty handle with
/// zero counts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshHandle {
    mesh: Mesh,
}

impl MeshHandle {
    pub(crate) fn new(mesh: Mesh) -> Self {
        Self { mesh }
    }

    /// Handle with no vertices and no triangles.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Flat positions: `[x0, y0, z0, x1, y1, z1, ...]`.
    pub fn positions(&self) -> &[f32] {
        &self.mesh.positions
    }

    /// Flat unit normals, parallel to [`positions`](Self::positions).
    pub fn normals(&self) -> &[f32] {
        &self.mesh.normals
    }

    /// Flat triangle indices: `[i0, i1, i2, ...]`.
    pub fn indices(&self) -> &[u32] {
        &self.mesh.indices
    }

    /// Triangles as index triples.
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.mesh.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.mesh.num_vertices()
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.mesh.num_triangles()
    }

    /// Whether the handle holds no triangles.
    pub fn is_empty(&self) -> bool {
        self.mesh.is_empty()
    }

    /// Axis-aligned bounds as `(min, max)`.
    pub fn bounds(&self) -> Option<([f32; 3], [f32; 3])> {
        self.mesh.bounds()
    }

    /// Borrow the flat mesh buffers.
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// Take ownership of the flat mesh buffers.
    pub fn into_mesh(self) -> Mesh {
        self.mesh
    }
}

/// Outcome of [`load`](crate::load).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadResult {
    /// `true` when the whole file was meshed.
    pub success: bool,
    /// The mesh; empty when `success` is `false`.
    pub mesh: MeshHandle,
}

impl LoadResult {
    pub(crate) fn failed() -> Self {
        Self {
            success: false,
            mesh: MeshHandle::empty(),
        }
    }
}
