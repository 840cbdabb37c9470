//! Vertices, edges, loops, faces, shells and solids.

use super::{EntityArgs, Resolver};
use crate::error::ResolveError;
use crate::graph::{
    BoundRef, EdgeId, EdgeNode, FaceId, FaceNode, LoopId, LoopKind, LoopNode, OrientedEdgeRef,
    ShellId, ShellNode, ShellUse, SolidNode, VertexId, VertexNode,
};

impl Resolver<'_> {
    /// VERTEX_POINT.
    pub(crate) fn resolve_vertex(&mut self, id: u64) -> Result<VertexId, ResolveError> {
        if let Some(v) = self.vertices.get(&id) {
            return Ok(*v);
        }
        let entity = self.require(id)?;
        if entity.type_name() != "VERTEX_POINT" {
            return Err(Self::wrong_kind(entity, "VERTEX_POINT"));
        }
        let point = self.enter(id, |r| r.resolve_point(entity.entity_ref(1)?))?;
        let vertex_id = VertexId(self.graph.vertices.len() as u32);
        self.graph.vertices.push(VertexNode { step_id: id, point });
        self.vertices.insert(id, vertex_id);
        Ok(vertex_id)
    }

    /// EDGE_CURVE.
    pub(crate) fn resolve_edge(&mut self, id: u64) -> Result<EdgeId, ResolveError> {
        if let Some(e) = self.edges.get(&id) {
            return Ok(*e);
        }
        let entity = self.require(id)?;
        if entity.type_name() != "EDGE_CURVE" {
            return Err(Self::wrong_kind(entity, "EDGE_CURVE"));
        }
        let node = self.enter(id, |r| {
            Ok(EdgeNode {
                step_id: id,
                start: r.resolve_vertex(entity.entity_ref(1)?)?,
                end: r.resolve_vertex(entity.entity_ref(2)?)?,
                curve: r.resolve_curve(entity.entity_ref(3)?)?,
                same_sense: entity.boolean(4)?,
            })
        })?;
        let edge_id = EdgeId(self.graph.edges.len() as u32);
        self.graph.edges.push(node);
        self.edges.insert(id, edge_id);
        Ok(edge_id)
    }

    /// ORIENTED_EDGE. Not memoized: each loop owns its oriented uses.
    fn resolve_oriented_edge(&mut self, id: u64) -> Result<OrientedEdgeRef, ResolveError> {
        let entity = self.require(id)?;
        match entity.type_name() {
            "ORIENTED_EDGE" => {
                let edge = self.enter(id, |r| r.resolve_edge(entity.entity_ref(3)?))?;
                Ok(OrientedEdgeRef {
                    step_id: id,
                    edge,
                    orientation: entity.boolean(4)?,
                })
            }
            // A bare edge in a loop is traversed forward.
            "EDGE_CURVE" => Ok(OrientedEdgeRef {
                step_id: id,
                edge: self.resolve_edge(id)?,
                orientation: true,
            }),
            _ => Err(Self::wrong_kind(entity, "ORIENTED_EDGE")),
        }
    }

    /// EDGE_LOOP or VERTEX_LOOP.
    pub(crate) fn resolve_loop(&mut self, id: u64) -> Result<LoopId, ResolveError> {
        if let Some(l) = self.loops.get(&id) {
            return Ok(*l);
        }
        let entity = self.require(id)?;
        let kind = self.enter(id, |r| match entity.type_name() {
            "EDGE_LOOP" => {
                let mut edges = Vec::new();
                for oe in entity.entity_ref_list(1)? {
                    edges.push(r.resolve_oriented_edge(oe)?);
                }
                Ok(LoopKind::Edges(edges))
            }
            "VERTEX_LOOP" => Ok(LoopKind::Vertex(r.resolve_vertex(entity.entity_ref(1)?)?)),
            _ => Err(Self::wrong_kind(entity, "EDGE_LOOP")),
        })?;
        let loop_id = LoopId(self.graph.loops.len() as u32);
        self.graph.loops.push(LoopNode { step_id: id, kind });
        self.loops.insert(id, loop_id);
        Ok(loop_id)
    }

    /// FACE_BOUND or FACE_OUTER_BOUND.
    fn resolve_bound(&mut self, id: u64) -> Result<BoundRef, ResolveError> {
        let entity = self.require(id)?;
        let outer = match entity.type_name() {
            "FACE_OUTER_BOUND" => true,
            "FACE_BOUND" => false,
            _ => return Err(Self::wrong_kind(entity, "FACE_BOUND")),
        };
        let loop_id = self.enter(id, |r| r.resolve_loop(entity.entity_ref(1)?))?;
        Ok(BoundRef {
            step_id: id,
            loop_id,
            orientation: entity.boolean(2)?,
            outer,
        })
    }

    /// ADVANCED_FACE or FACE_SURFACE.
    pub(crate) fn resolve_face(&mut self, id: u64) -> Result<FaceId, ResolveError> {
        if let Some(f) = self.faces.get(&id) {
            return Ok(*f);
        }
        let entity = self.require(id)?;
        if !matches!(entity.type_name(), "ADVANCED_FACE" | "FACE_SURFACE") {
            return Err(Self::wrong_kind(entity, "ADVANCED_FACE"));
        }
        let node = self.enter(id, |r| {
            let mut bounds = Vec::new();
            for b in entity.entity_ref_list(1)? {
                bounds.push(r.resolve_bound(b)?);
            }
            Ok(FaceNode {
                step_id: id,
                surface: r.resolve_surface(entity.entity_ref(2)?)?,
                same_sense: entity.boolean(3)?,
                bounds,
            })
        })?;
        let face_id = FaceId(self.graph.faces.len() as u32);
        self.graph.faces.push(node);
        self.faces.insert(id, face_id);
        Ok(face_id)
    }

    /// CLOSED_SHELL, OPEN_SHELL or an oriented wrapper around one.
    pub(crate) fn resolve_shell(&mut self, id: u64) -> Result<ShellUse, ResolveError> {
        let entity = self.require(id)?;
        match entity.type_name() {
            "ORIENTED_CLOSED_SHELL" | "ORIENTED_OPEN_SHELL" => {
                let orientation = entity.boolean(3)?;
                let inner = self.enter(id, |r| r.resolve_shell(entity.entity_ref(2)?))?;
                Ok(ShellUse {
                    shell: inner.shell,
                    reversed: inner.reversed != !orientation,
                })
            }
            "CLOSED_SHELL" | "OPEN_SHELL" => Ok(ShellUse {
                shell: self.resolve_plain_shell(id)?,
                reversed: false,
            }),
            _ => Err(Self::wrong_kind(entity, "CLOSED_SHELL")),
        }
    }

    fn resolve_plain_shell(&mut self, id: u64) -> Result<ShellId, ResolveError> {
        if let Some(s) = self.shells.get(&id) {
            return Ok(*s);
        }
        let entity = self.require(id)?;
        let closed = entity.type_name() == "CLOSED_SHELL";
        let faces = self.enter(id, |r| {
            let mut faces = Vec::new();
            for f in entity.entity_ref_list(1)? {
                faces.push(r.resolve_face(f)?);
            }
            Ok(faces)
        })?;
        let shell_id = ShellId(self.graph.shells.len() as u32);
        self.graph.shells.push(ShellNode {
            step_id: id,
            faces,
            closed,
        });
        self.shells.insert(id, shell_id);
        Ok(shell_id)
    }

    /// MANIFOLD_SOLID_BREP or BREP_WITH_VOIDS.
    pub(crate) fn resolve_solid(&mut self, id: u64) -> Result<(), ResolveError> {
        let entity = self.require(id)?;
        let has_voids = match entity.type_name() {
            "BREP_WITH_VOIDS" => true,
            "MANIFOLD_SOLID_BREP" => false,
            _ => return Err(Self::wrong_kind(entity, "MANIFOLD_SOLID_BREP")),
        };
        let node = self.enter(id, |r| {
            let outer = r.resolve_shell(entity.entity_ref(1)?)?;
            let mut voids = Vec::new();
            if has_voids {
                for v in entity.entity_ref_list(2)? {
                    voids.push(r.resolve_shell(v)?);
                }
            }
            Ok(SolidNode {
                step_id: id,
                outer,
                voids,
            })
        })?;
        self.graph.solids.push(node);
        Ok(())
    }
}
