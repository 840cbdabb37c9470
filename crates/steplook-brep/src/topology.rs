//! Topological entities stored in slotmap arenas.
//!
//! The hierarchy is the usual one: solid → shell → face → wire → oriented
//! edge → edge → vertex. Geometry is not duplicated per edge or face; the
//! [`Brep`] owns every curve and surface once and the topology refers to
//! them by the resolver's indices.

use slotmap::SlotMap;
use steplook_geom::{Curve, Surface};
use steplook_math::Point3;
use steplook_step::graph::{CurveId, SurfaceId};

slotmap::new_key_type! {
    /// Unique identifier for a vertex.
    pub struct VertexId;
    /// Unique identifier for an edge.
    pub struct EdgeId;
    /// Unique identifier for a wire.
    pub struct WireId;
    /// Unique identifier for a face.
    pub struct FaceId;
    /// Unique identifier for a shell.
    pub struct ShellId;
    /// Unique identifier for a solid.
    pub struct SolidId;
}

/// A topological vertex.
#[derive(Debug, Clone)]
pub struct Vertex {
    /// STEP id of the VERTEX_POINT.
    pub step_id: u64,
    /// Position.
    pub point: Point3,
}

/// A bounded piece of a curve between two vertices.
///
/// `t_start` is the curve parameter at `start` and `t_end` the parameter at
/// `end`, so `t_end < t_start` when the edge runs against the curve.
#[derive(Debug, Clone)]
pub struct Edge {
    /// STEP id of the EDGE_CURVE.
    pub step_id: u64,
    /// Underlying curve.
    pub curve: CurveId,
    /// Start vertex.
    pub start: VertexId,
    /// End vertex.
    pub end: VertexId,
    /// Whether start → end follows the curve parameterization.
    pub same_sense: bool,
    /// Curve parameter at `start`.
    pub t_start: f64,
    /// Curve parameter at `end`.
    pub t_end: f64,
}

impl Edge {
    /// Whether the edge starts and ends at the same vertex.
    pub fn is_closed(&self) -> bool {
        self.start == self.end
    }
}

/// A use of an edge inside a wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrientedEdge {
    /// The shared edge.
    pub edge: EdgeId,
    /// `true` when the wire runs from the edge's start to its end.
    pub orientation: bool,
}

/// Contents of a wire.
#[derive(Debug, Clone)]
pub enum WireKind {
    /// Closed chain of oriented edges in traversal order.
    Edges(Vec<OrientedEdge>),
    /// Degenerate bound at a single point.
    Vertex(VertexId),
}

/// A closed boundary loop of a face, already in traversal order.
#[derive(Debug, Clone)]
pub struct Wire {
    /// STEP id of the loop.
    pub step_id: u64,
    /// Contents.
    pub kind: WireKind,
}

/// A bounded region on a surface.
#[derive(Debug, Clone)]
pub struct Face {
    /// STEP id of the face.
    pub step_id: u64,
    /// Underlying surface.
    pub surface: SurfaceId,
    /// If `true`, the face normal agrees with the surface normal.
    pub same_sense: bool,
    /// Outer boundary; `None` means the surface's whole natural domain.
    pub outer: Option<WireId>,
    /// Holes.
    pub inner: Vec<WireId>,
}

impl Face {
    /// Outer wire followed by holes.
    pub fn wires(&self) -> impl Iterator<Item = WireId> + '_ {
        self.outer.into_iter().chain(self.inner.iter().copied())
    }
}

/// A connected set of faces.
#[derive(Debug, Clone)]
pub struct Shell {
    /// STEP id of the shell.
    pub step_id: u64,
    /// Faces in file order.
    pub faces: Vec<FaceId>,
    /// Declared as a closed shell.
    pub closed: bool,
    /// Used inverted (a void, or an ORIENTED_CLOSED_SHELL with `.F.`).
    pub reversed: bool,
}

/// An outer shell with optional cavities.
#[derive(Debug, Clone)]
pub struct Solid {
    /// STEP id of the solid.
    pub step_id: u64,
    /// Outer boundary.
    pub outer: ShellId,
    /// Void shells, already reversed.
    pub voids: Vec<ShellId>,
}

/// A face as it should be meshed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceUse {
    /// The face.
    pub face: FaceId,
    /// STEP id, the merge order key.
    pub step_id: u64,
    /// Triangles wind against the surface normal.
    pub flipped: bool,
}

/// Boundary representation of everything found in one file.
#[derive(Debug, Clone, Default)]
pub struct Brep {
    /// Vertices.
    pub vertices: SlotMap<VertexId, Vertex>,
    /// Edges.
    pub edges: SlotMap<EdgeId, Edge>,
    /// Wires.
    pub wires: SlotMap<WireId, Wire>,
    /// Faces.
    pub faces: SlotMap<FaceId, Face>,
    /// Shells.
    pub shells: SlotMap<ShellId, Shell>,
    /// Solids.
    pub solids: SlotMap<SolidId, Solid>,
    /// Shells not owned by a solid (surface models and loose shells).
    pub free_shells: Vec<ShellId>,
    /// Curve geometry, indexed by [`CurveId`].
    pub curves: Vec<Curve>,
    /// Surface geometry, indexed by [`SurfaceId`].
    pub surfaces: Vec<Surface>,
}

impl Brep {
    /// Curve by id.
    pub fn curve(&self, id: CurveId) -> &Curve {
        &self.curves[id.index()]
    }

    /// Surface by id.
    pub fn surface(&self, id: SurfaceId) -> &Surface {
        &self.surfaces[id.index()]
    }

    /// Curve of an edge.
    pub fn edge_curve(&self, edge: EdgeId) -> &Curve {
        self.curve(self.edges[edge].curve)
    }

    /// Vertices an oriented edge runs between, in traversal order.
    pub fn oriented_vertices(&self, oe: OrientedEdge) -> (VertexId, VertexId) {
        let e = &self.edges[oe.edge];
        if oe.orientation {
            (e.start, e.end)
        } else {
            (e.end, e.start)
        }
    }

    /// Curve parameters an oriented edge runs between, in traversal order.
    pub fn oriented_params(&self, oe: OrientedEdge) -> (f64, f64) {
        let e = &self.edges[oe.edge];
        if oe.orientation {
            (e.t_start, e.t_end)
        } else {
            (e.t_end, e.t_start)
        }
    }

    /// Every shell that contributes triangles: solid outers, voids, free shells.
    pub fn shells_to_mesh(&self) -> Vec<ShellId> {
        let mut out = Vec::new();
        for solid in self.solids.values() {
            out.push(solid.outer);
            out.extend(solid.voids.iter().copied());
        }
        out.extend(self.free_shells.iter().copied());
        out
    }

    /// Faces to mesh, in ascending STEP id.
    ///
    /// A face reachable through several shells is meshed once, with the
    /// orientation of its first use.
    pub fn faces_to_mesh(&self) -> Vec<FaceUse> {
        let mut uses: Vec<FaceUse> = Vec::new();
        let mut seen = rustc_hash::FxHashSet::default();
        for shell_id in self.shells_to_mesh() {
            let shell = &self.shells[shell_id];
            for &face_id in &shell.faces {
                if !seen.insert(face_id) {
                    continue;
                }
                let face = &self.faces[face_id];
                uses.push(FaceUse {
                    face: face_id,
                    step_id: face.step_id,
                    flipped: face.same_sense == shell.reversed,
                });
            }
        }
        uses.sort_by_key(|u| u.step_id);
        uses
    }

    /// Number of solids.
    pub fn num_solids(&self) -> usize {
        self.solids.len()
    }

    /// Number of shells.
    pub fn num_shells(&self) -> usize {
        self.shells.len()
    }

    /// Number of faces.
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }
}
