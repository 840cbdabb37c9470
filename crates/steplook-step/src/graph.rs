//! Typed entity graph produced by the resolver.
//!
//! Nodes live in per-kind arenas and refer to each other by index, so an
//! edge shared by two faces is stored once and both loops point at it.
//! Every node remembers the STEP id it came from for diagnostics and for
//! deterministic ordering downstream.

use steplook_geom::{Curve, Surface};
use steplook_math::Point3;

macro_rules! node_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            /// Arena index.
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

node_id!(
    /// Index of a curve in [`EntityGraph::curves`].
    CurveId
);
node_id!(
    /// Index of a surface in [`EntityGraph::surfaces`].
    SurfaceId
);
node_id!(
    /// Index of a vertex in [`EntityGraph::vertices`].
    VertexId
);
node_id!(
    /// Index of an edge in [`EntityGraph::edges`].
    EdgeId
);
node_id!(
    /// Index of a loop in [`EntityGraph::loops`].
    LoopId
);
node_id!(
    /// Index of a face in [`EntityGraph::faces`].
    FaceId
);
node_id!(
    /// Index of a shell in [`EntityGraph::shells`].
    ShellId
);

/// A curve with the id of the entity it was read from.
#[derive(Debug, Clone)]
pub struct CurveNode {
    /// STEP id.
    pub step_id: u64,
    /// Geometry.
    pub curve: Curve,
}

/// A surface with the id of the entity it was read from.
#[derive(Debug, Clone)]
pub struct SurfaceNode {
    /// STEP id.
    pub step_id: u64,
    /// Geometry.
    pub surface: Surface,
}

/// VERTEX_POINT.
#[derive(Debug, Clone)]
pub struct VertexNode {
    /// STEP id.
    pub step_id: u64,
    /// Position.
    pub point: Point3,
}

/// EDGE_CURVE.
#[derive(Debug, Clone)]
pub struct EdgeNode {
    /// STEP id.
    pub step_id: u64,
    /// Start vertex.
    pub start: VertexId,
    /// End vertex.
    pub end: VertexId,
    /// Underlying curve.
    pub curve: CurveId,
    /// Whether the edge runs along the curve parameterization.
    pub same_sense: bool,
}

/// ORIENTED_EDGE, stored inline in its loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrientedEdgeRef {
    /// STEP id of the ORIENTED_EDGE.
    pub step_id: u64,
    /// The shared edge.
    pub edge: EdgeId,
    /// `.T.` when the loop traverses the edge start to end.
    pub orientation: bool,
}

/// Loop contents.
#[derive(Debug, Clone)]
pub enum LoopKind {
    /// EDGE_LOOP: oriented edges in traversal order.
    Edges(Vec<OrientedEdgeRef>),
    /// VERTEX_LOOP: a single point bound, such as a cone apex.
    Vertex(VertexId),
}

/// EDGE_LOOP or VERTEX_LOOP.
#[derive(Debug, Clone)]
pub struct LoopNode {
    /// STEP id.
    pub step_id: u64,
    /// Contents.
    pub kind: LoopKind,
}

/// FACE_BOUND / FACE_OUTER_BOUND, stored inline in its face.
#[derive(Debug, Clone, Copy)]
pub struct BoundRef {
    /// STEP id of the bound.
    pub step_id: u64,
    /// The bounding loop.
    pub loop_id: LoopId,
    /// `.F.` reverses the loop.
    pub orientation: bool,
    /// Declared as FACE_OUTER_BOUND.
    pub outer: bool,
}

/// ADVANCED_FACE or FACE_SURFACE.
#[derive(Debug, Clone)]
pub struct FaceNode {
    /// STEP id.
    pub step_id: u64,
    /// Underlying surface.
    pub surface: SurfaceId,
    /// Whether the face normal agrees with the surface normal.
    pub same_sense: bool,
    /// Bounds in file order.
    pub bounds: Vec<BoundRef>,
}

/// CLOSED_SHELL or OPEN_SHELL.
#[derive(Debug, Clone)]
pub struct ShellNode {
    /// STEP id.
    pub step_id: u64,
    /// Faces in file order.
    pub faces: Vec<FaceId>,
    /// Declared closed.
    pub closed: bool,
}

/// A shell referenced from a solid or surface model, possibly reversed by
/// an ORIENTED_CLOSED_SHELL wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShellUse {
    /// The shell.
    pub shell: ShellId,
    /// Whether every face is flipped.
    pub reversed: bool,
}

/// MANIFOLD_SOLID_BREP or BREP_WITH_VOIDS.
#[derive(Debug, Clone)]
pub struct SolidNode {
    /// STEP id.
    pub step_id: u64,
    /// Outer boundary.
    pub outer: ShellUse,
    /// Cavities.
    pub voids: Vec<ShellUse>,
}

/// Top-level objects found in the file, by precedence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Roots {
    /// Solid B-reps.
    Solids(Vec<usize>),
    /// Shells from surface models or loose top-level shells.
    Shells(Vec<ShellUse>),
    /// No geometry at all.
    Empty,
}

/// All typed nodes reachable from the file's roots.
#[derive(Debug, Clone, Default)]
pub struct EntityGraph {
    /// Curves.
    pub curves: Vec<CurveNode>,
    /// Surfaces.
    pub surfaces: Vec<SurfaceNode>,
    /// Vertices.
    pub vertices: Vec<VertexNode>,
    /// Edges.
    pub edges: Vec<EdgeNode>,
    /// Loops.
    pub loops: Vec<LoopNode>,
    /// Faces.
    pub faces: Vec<FaceNode>,
    /// Shells.
    pub shells: Vec<ShellNode>,
    /// Solids.
    pub solids: Vec<SolidNode>,
    /// Shells used directly when the file has no solids.
    pub free_shells: Vec<ShellUse>,
}

impl EntityGraph {
    /// Curve by id.
    pub fn curve(&self, id: CurveId) -> &CurveNode {
        &self.curves[id.index()]
    }

    /// Surface by id.
    pub fn surface(&self, id: SurfaceId) -> &SurfaceNode {
        &self.surfaces[id.index()]
    }

    /// Vertex by id.
    pub fn vertex(&self, id: VertexId) -> &VertexNode {
        &self.vertices[id.index()]
    }

    /// Edge by id.
    pub fn edge(&self, id: EdgeId) -> &EdgeNode {
        &self.edges[id.index()]
    }

    /// Loop by id.
    pub fn edge_loop(&self, id: LoopId) -> &LoopNode {
        &self.loops[id.index()]
    }

    /// Face by id.
    pub fn face(&self, id: FaceId) -> &FaceNode {
        &self.faces[id.index()]
    }

    /// Shell by id.
    pub fn shell(&self, id: ShellId) -> &ShellNode {
        &self.shells[id.index()]
    }

    /// What the B-rep assembler should start from.
    pub fn roots(&self) -> Roots {
        if !self.solids.is_empty() {
            Roots::Solids((0..self.solids.len()).collect())
        } else if !self.free_shells.is_empty() {
            Roots::Shells(self.free_shells.clone())
        } else {
            Roots::Empty
        }
    }
}
