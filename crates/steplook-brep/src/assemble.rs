//! Entity graph → [`Brep`].

use log::{debug, warn};
use rustc_hash::FxHashMap;
use steplook_geom::{sweep_end, Curve, Surface};
use steplook_math::{newell_normal, Point3, Tolerance};
use steplook_step::graph::{self as g, EntityGraph, Roots};

use crate::topology::{
    Brep, Edge, EdgeId, Face, FaceId, OrientedEdge, Shell, ShellId, Solid, Vertex, VertexId, Wire,
    WireId, WireKind,
};
use crate::TopologyError;

/// Samples per curved edge when estimating a wire's Newell normal.
const ORIENTATION_SAMPLES: usize = 16;

/// Build the B-rep for every root of `graph`.
///
/// The graph's curves and surfaces move into the result. `tol.linear` is
/// the distance within which consecutive loop edges are considered to
/// meet.
pub fn assemble(mut graph: EntityGraph, tol: &Tolerance) -> Result<Brep, TopologyError> {
    let roots = graph.roots();
    if roots == Roots::Empty {
        return Err(TopologyError::NoGeometry);
    }
    let brep = Brep {
        curves: std::mem::take(&mut graph.curves)
            .into_iter()
            .map(|c| c.curve)
            .collect(),
        surfaces: std::mem::take(&mut graph.surfaces)
            .into_iter()
            .map(|s| s.surface)
            .collect(),
        ..Brep::default()
    };

    let mut asm = Assembler {
        graph: &graph,
        tol: *tol,
        brep,
        vertices: FxHashMap::default(),
        edges: FxHashMap::default(),
        wires: FxHashMap::default(),
        faces: FxHashMap::default(),
        shells: FxHashMap::default(),
    };

    match roots {
        Roots::Solids(indices) => {
            for i in indices {
                asm.solid(&graph.solids[i])?;
            }
        }
        Roots::Shells(uses) => {
            for u in uses {
                let id = asm.shell(u)?;
                asm.brep.free_shells.push(id);
            }
        }
        Roots::Empty => return Err(TopologyError::NoGeometry),
    }

    let brep = asm.brep;
    debug!(
        "assembled {} solids, {} shells, {} faces, {} edges",
        brep.num_solids(),
        brep.num_shells(),
        brep.num_faces(),
        brep.edges.len()
    );
    Ok(brep)
}

struct Assembler<'a> {
    graph: &'a EntityGraph,
    tol: Tolerance,
    brep: Brep,
    vertices: FxHashMap<g::VertexId, VertexId>,
    edges: FxHashMap<g::EdgeId, EdgeId>,
    wires: FxHashMap<(g::LoopId, bool), WireId>,
    faces: FxHashMap<g::FaceId, FaceId>,
    shells: FxHashMap<g::ShellUse, ShellId>,
}

impl Assembler<'_> {
    fn solid(&mut self, node: &g::SolidNode) -> Result<(), TopologyError> {
        let outer = self.shell(node.outer)?;
        let voids = node
            .voids
            .iter()
            .map(|&v| self.shell(v))
            .collect::<Result<Vec<_>, _>>()?;
        self.brep.solids.insert(Solid {
            step_id: node.step_id,
            outer,
            voids,
        });
        Ok(())
    }

    fn shell(&mut self, use_: g::ShellUse) -> Result<ShellId, TopologyError> {
        if let Some(&id) = self.shells.get(&use_) {
            return Ok(id);
        }
        let graph = self.graph;
        let node = graph.shell(use_.shell);
        let faces = node
            .faces
            .iter()
            .map(|&f| self.face(f))
            .collect::<Result<Vec<_>, _>>()?;
        let id = self.brep.shells.insert(Shell {
            step_id: node.step_id,
            faces,
            closed: node.closed,
            reversed: use_.reversed,
        });
        self.shells.insert(use_, id);
        Ok(id)
    }

    fn face(&mut self, id: g::FaceId) -> Result<FaceId, TopologyError> {
        if let Some(&f) = self.faces.get(&id) {
            return Ok(f);
        }
        let graph = self.graph;
        let node = graph.face(id);

        let mut wires = Vec::with_capacity(node.bounds.len());
        for b in &node.bounds {
            wires.push(self.wire(b.loop_id, b.orientation)?);
        }

        let outer_idx = match node.bounds.iter().position(|b| b.outer) {
            Some(i) => Some(i),
            None if wires.len() == 1 => Some(0),
            None if wires.is_empty() => {
                if self.brep.surface(node.surface).full_domain().is_none() {
                    return Err(TopologyError::MissingOuterBound {
                        face_id: node.step_id,
                    });
                }
                None
            }
            None if self.brep.surface(node.surface).is_planar() => {
                warn!(
                    "face #{}: no outer bound among {} bounds, using the largest",
                    node.step_id,
                    wires.len()
                );
                let areas: Vec<f64> = wires
                    .iter()
                    .map(|&w| newell_normal(&self.wire_samples(w)).norm())
                    .collect();
                let mut best = 0;
                for (i, a) in areas.iter().enumerate() {
                    if *a > areas[best] {
                        best = i;
                    }
                }
                Some(best)
            }
            None => Some(0),
        };

        let outer = outer_idx.map(|i| wires[i]);
        let inner = wires
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != outer_idx)
            .map(|(_, &w)| w)
            .collect();

        if let (Some(w), Surface::Plane { frame }) = (outer, self.brep.surface(node.surface)) {
            let n = newell_normal(&self.wire_samples(w));
            let sign = if node.same_sense { 1.0 } else { -1.0 };
            if n.norm() > self.tol.linear * self.tol.linear && n.dot(frame.z.as_ref()) * sign < 0.0 {
                return Err(TopologyError::InconsistentOrientation {
                    face_id: node.step_id,
                });
            }
        }

        let f = self.brep.faces.insert(Face {
            step_id: node.step_id,
            surface: node.surface,
            same_sense: node.same_sense,
            outer,
            inner,
        });
        self.faces.insert(id, f);
        Ok(f)
    }

    /// Build a wire, reversed when its bound says `.F.`.
    fn wire(&mut self, id: g::LoopId, orientation: bool) -> Result<WireId, TopologyError> {
        if let Some(&w) = self.wires.get(&(id, orientation)) {
            return Ok(w);
        }
        let graph = self.graph;
        let node = graph.edge_loop(id);
        let kind = match &node.kind {
            g::LoopKind::Vertex(v) => WireKind::Vertex(self.vertex(*v)),
            g::LoopKind::Edges(refs) => {
                let mut oes = Vec::with_capacity(refs.len());
                for r in refs {
                    oes.push(OrientedEdge {
                        edge: self.edge(r.edge),
                        orientation: r.orientation,
                    });
                }
                if !orientation {
                    oes.reverse();
                    for oe in &mut oes {
                        oe.orientation = !oe.orientation;
                    }
                }
                self.check_closed(node.step_id, &oes)?;
                WireKind::Edges(oes)
            }
        };
        let w = self.brep.wires.insert(Wire {
            step_id: node.step_id,
            kind,
        });
        self.wires.insert((id, orientation), w);
        Ok(w)
    }

    fn check_closed(&self, loop_id: u64, oes: &[OrientedEdge]) -> Result<(), TopologyError> {
        if oes.is_empty() {
            return Err(TopologyError::UnclosedWire { loop_id });
        }
        for (i, &oe) in oes.iter().enumerate() {
            let next = oes[(i + 1) % oes.len()];
            let (_, end) = self.brep.oriented_vertices(oe);
            let (start, _) = self.brep.oriented_vertices(next);
            if end != start {
                let a = self.brep.vertices[end].point;
                let b = self.brep.vertices[start].point;
                if !self.tol.points_equal(&a, &b) {
                    return Err(TopologyError::UnclosedWire { loop_id });
                }
            }
        }
        Ok(())
    }

    fn vertex(&mut self, id: g::VertexId) -> VertexId {
        if let Some(&v) = self.vertices.get(&id) {
            return v;
        }
        let node = self.graph.vertex(id);
        let v = self.brep.vertices.insert(Vertex {
            step_id: node.step_id,
            point: node.point,
        });
        self.vertices.insert(id, v);
        v
    }

    fn edge(&mut self, id: g::EdgeId) -> EdgeId {
        if let Some(&e) = self.edges.get(&id) {
            return e;
        }
        let graph = self.graph;
        let node = graph.edge(id);
        let start = self.vertex(node.start);
        let end = self.vertex(node.end);
        let p0 = self.brep.vertices[start].point;
        let p1 = self.brep.vertices[end].point;
        let closed = start == end || self.tol.points_equal(&p0, &p1);
        let (t_start, t_end) = trim_range(self.brep.curve(node.curve), &p0, &p1, node.same_sense, closed);
        let e = self.brep.edges.insert(Edge {
            step_id: node.step_id,
            curve: node.curve,
            start,
            end,
            same_sense: node.same_sense,
            t_start,
            t_end,
        });
        self.edges.insert(id, e);
        e
    }

    /// Coarse polyline of a wire, enough to tell its winding.
    fn wire_samples(&self, id: WireId) -> Vec<Point3> {
        let mut pts = Vec::new();
        let WireKind::Edges(oes) = &self.brep.wires[id].kind else {
            return pts;
        };
        for &oe in oes {
            let curve = self.brep.edge_curve(oe.edge);
            let (a, b) = self.brep.oriented_params(oe);
            let n = if curve.is_linear() { 1 } else { ORIENTATION_SAMPLES };
            for i in 0..n {
                pts.push(curve.point(a + (b - a) * i as f64 / n as f64));
            }
        }
        pts
    }
}

/// Curve parameters at an edge's start and end vertices.
///
/// The result runs in the curve's direction when `same_sense`, against it
/// otherwise. Closed edges on periodic curves span one full period; closed
/// B-spline edges span the whole knot domain.
pub fn trim_range(curve: &Curve, start: &Point3, end: &Point3, same_sense: bool, closed: bool) -> (f64, f64) {
    let t0 = curve.parameter_of(start);
    if let Some(period) = curve.period() {
        let t1 = if closed { t0 } else { curve.parameter_of(end) };
        return (t0, sweep_end(t0, t1, period, same_sense));
    }
    if closed {
        if let Some((d0, d1)) = curve.domain() {
            return if same_sense { (d0, d1) } else { (d1, d0) };
        }
    }
    (t0, curve.parameter_of(end))
}
