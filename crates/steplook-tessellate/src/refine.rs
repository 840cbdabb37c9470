//! Adaptive refinement of a curved-face triangulation.
//!
//! Triangles are first reshaped with edge flips toward a constrained
//! Delaunay triangulation under a metric that scales `u` and `v` by the
//! sample spacing each direction needs. On a cylinder this turns the fans
//! left by the ear clipper into strips along the axis, which already meet
//! the tolerances without new nodes.
//!
//! Each pass then splits only the interior edges whose chord midpoint is
//! too far from the surface or whose end normals turn too far. A triangle
//! whose centroid deviates while its own edges pass has its longest
//! splittable edge split, or a centroid node inserted when every edge is a
//! boundary segment. Boundary segments are never split or flipped; they
//! belong to edges shared with the adjacent face.

use std::f64::consts::PI;

use rustc_hash::{FxHashMap, FxHashSet};
use steplook_geom::Surface;
use steplook_math::{angle_between, triangle_area_2d, Point2, Point3, Vec3};

use crate::domain::{segment_nodes, Node};
use crate::triangulate::{centroid, Triangulation};
use crate::TessellationParams;

type EdgeKey = (u32, u32);

/// No triangle on this side of an edge.
const NONE: u32 = u32::MAX;

/// Iso-lines sampled per direction when estimating the metric.
const ISO_LINES: usize = 5;

#[inline]
fn key(a: u32, b: u32) -> EdgeKey {
    (a.min(b), a.max(b))
}

/// Per-direction scale of the parameter plane under which the spacing the
/// surface needs is about the same along `u` and `v`.
#[derive(Debug, Clone, Copy)]
struct Metric {
    su: f64,
    sv: f64,
}

impl Metric {
    fn estimate(surface: &Surface, lo: Point2, hi: Point2, params: &TessellationParams) -> Self {
        let span = hi - lo;
        let step = |along_u: bool| {
            let len = if along_u { span.x } else { span.y };
            let mut finest = len;
            for k in 0..ISO_LINES {
                let f = (k as f64 + 0.5) / ISO_LINES as f64;
                let (a, b) = if along_u {
                    let v = lo.y + span.y * f;
                    (Point2::new(lo.x, v), Point2::new(hi.x, v))
                } else {
                    let u = lo.x + span.x * f;
                    (Point2::new(u, lo.y), Point2::new(u, hi.y))
                };
                let samples = segment_nodes(surface, a, b, params).len();
                finest = finest.min(len / (samples + 1) as f64);
            }
            finest
        };
        let scale = |s: f64| if s.is_finite() && s > 0.0 { 1.0 / s } else { 1.0 };
        Self {
            su: scale(step(true)),
            sv: scale(step(false)),
        }
    }

    fn map(&self, uv: Point2) -> Point2 {
        Point2::new(uv.x * self.su, uv.y * self.sv)
    }
}

/// Interior angle at `c` of the triangle `a`, `b`, `c`.
fn angle_at(c: Point2, a: Point2, b: Point2) -> f64 {
    let x = a - c;
    let y = b - c;
    (x.x * y.y - x.y * y.x).abs().atan2(x.dot(&y))
}

/// Vertex opposite the directed edge `a`→`b` of `t`.
fn opposite(t: &[u32; 3], a: u32, b: u32) -> Option<u32> {
    (0..3).find(|&e| t[e] == a && t[(e + 1) % 3] == b).map(|e| t[(e + 2) % 3])
}

/// Triangles on each side of every edge.
fn adjacency(triangles: &[[u32; 3]]) -> FxHashMap<EdgeKey, [u32; 2]> {
    let mut adj: FxHashMap<EdgeKey, [u32; 2]> = FxHashMap::default();
    for (ti, t) in triangles.iter().enumerate() {
        for e in 0..3 {
            let slot = adj.entry(key(t[e], t[(e + 1) % 3])).or_insert([NONE; 2]);
            if slot[0] == NONE {
                slot[0] = ti as u32;
            } else {
                slot[1] = ti as u32;
            }
        }
    }
    adj
}

fn relink(adj: &mut FxHashMap<EdgeKey, [u32; 2]>, k: EdgeKey, from: u32, to: u32) {
    if let Some(slot) = adj.get_mut(&k) {
        if let Some(s) = slot.iter_mut().find(|s| **s == from) {
            *s = to;
        }
    }
}

/// Lawson flips toward the constrained Delaunay triangulation of `tri`
/// under `metric`. Returns the number of flips made.
fn flip_edges(tri: &mut Triangulation, metric: &Metric, fixed: &FxHashSet<EdgeKey>) -> usize {
    let mut adj = adjacency(&tri.triangles);
    let mut stack: Vec<EdgeKey> = adj.keys().copied().filter(|k| !fixed.contains(k)).collect();
    // sorted so the result does not depend on hash order
    stack.sort_unstable();
    let budget = tri.triangles.len().saturating_mul(tri.triangles.len()).max(1024);
    let mut flips = 0;

    while let Some(k) = stack.pop() {
        if flips >= budget {
            log::debug!("edge flipping stopped after {flips} flips");
            break;
        }
        let Some(&[t1, t2]) = adj.get(&k) else { continue };
        if t1 == NONE || t2 == NONE {
            continue;
        }
        let (a, b) = k;
        // t1 holds a→b, t2 holds b→a
        let (t1, t2) = if opposite(&tri.triangles[t1 as usize], a, b).is_some() {
            (t1, t2)
        } else {
            (t2, t1)
        };
        let (Some(c), Some(d)) = (
            opposite(&tri.triangles[t1 as usize], a, b),
            opposite(&tri.triangles[t2 as usize], b, a),
        ) else {
            continue;
        };
        if c == d {
            continue;
        }

        let uv = |i: u32| tri.nodes[i as usize].uv;
        if triangle_area_2d(&uv(a), &uv(d), &uv(c)) <= 0.0 || triangle_area_2d(&uv(d), &uv(b), &uv(c)) <= 0.0 {
            continue;
        }
        let m = |i: u32| metric.map(uv(i));
        if angle_at(m(c), m(a), m(b)) + angle_at(m(d), m(b), m(a)) <= PI + 1e-9 {
            continue;
        }

        tri.triangles[t1 as usize] = [a, d, c];
        tri.triangles[t2 as usize] = [d, b, c];
        adj.remove(&k);
        adj.insert(key(c, d), [t1, t2]);
        relink(&mut adj, key(b, c), t1, t2);
        relink(&mut adj, key(a, d), t2, t1);
        flips += 1;
        for e in [key(a, d), key(d, b), key(b, c), key(c, a)] {
            if !fixed.contains(&e) {
                stack.push(e);
            }
        }
    }
    flips
}

struct Refiner<'a> {
    surface: &'a Surface,
    params: &'a TessellationParams,
    metric: Metric,
    boundary: FxHashSet<EdgeKey>,
    normals: Vec<Option<Vec3>>,
    uv_eps: f64,
}

/// Work found by one pass.
#[derive(Default)]
struct Marks {
    edges: FxHashSet<EdgeKey>,
    centres: Vec<usize>,
}

impl Marks {
    fn is_empty(&self) -> bool {
        self.edges.is_empty() && self.centres.is_empty()
    }
}

impl Refiner<'_> {
    fn normal_at(&self, uv: Point2) -> Option<Vec3> {
        self.surface.partials(uv.x, uv.y).normal().map(|n| n.into_inner())
    }

    fn node_at(&self, uv: Point2) -> Node {
        Node {
            uv,
            xyz: self.surface.point(uv.x, uv.y),
        }
    }

    /// Distance from `p` to the surface near `hint`.
    fn off_surface(&self, p: &Point3, hint: Point2) -> f64 {
        let uv = self.surface.project(p, Some(hint));
        (self.surface.point(uv.x, uv.y) - p).norm()
    }

    fn splittable(&self, nodes: &[Node], k: EdgeKey) -> bool {
        !self.boundary.contains(&k) && (nodes[k.0 as usize].uv - nodes[k.1 as usize].uv).norm() > self.uv_eps
    }

    fn metric_len(&self, nodes: &[Node], k: EdgeKey) -> f64 {
        (self.metric.map(nodes[k.0 as usize].uv) - self.metric.map(nodes[k.1 as usize].uv)).norm()
    }

    fn edge_fails(&self, nodes: &[Node], k: EdgeKey) -> bool {
        let a = &nodes[k.0 as usize];
        let b = &nodes[k.1 as usize];
        let uv = Point2::from((a.uv.coords + b.uv.coords) * 0.5);
        let chord_mid = Point3::from((a.xyz.coords + b.xyz.coords) * 0.5);
        if self.off_surface(&chord_mid, uv) > self.params.chord_tolerance {
            return true;
        }
        match (&self.normals[k.0 as usize], &self.normals[k.1 as usize]) {
            (Some(na), Some(nb)) => angle_between(na, nb) > self.params.angular_tolerance,
            _ => false,
        }
    }

    fn uv_centroid(nodes: &[Node], t: &[u32; 3]) -> Point2 {
        Point2::from(
            (nodes[t[0] as usize].uv.coords + nodes[t[1] as usize].uv.coords + nodes[t[2] as usize].uv.coords) / 3.0,
        )
    }

    fn centroid_fails(&self, nodes: &[Node], t: &[u32; 3]) -> bool {
        self.off_surface(&centroid(nodes, t), Self::uv_centroid(nodes, t)) > self.params.chord_tolerance
    }

    fn mark(&self, tri: &Triangulation) -> Marks {
        let mut checked: FxHashMap<EdgeKey, bool> = FxHashMap::default();
        let mut marks = Marks::default();
        for (ti, t) in tri.triangles.iter().enumerate() {
            let edges = [key(t[0], t[1]), key(t[1], t[2]), key(t[2], t[0])];
            let mut split_any = false;
            for &k in &edges {
                if !self.splittable(&tri.nodes, k) {
                    continue;
                }
                if *checked.entry(k).or_insert_with(|| self.edge_fails(&tri.nodes, k)) {
                    marks.edges.insert(k);
                    split_any = true;
                }
            }
            if split_any || !self.centroid_fails(&tri.nodes, t) {
                continue;
            }
            let longest = edges
                .iter()
                .copied()
                .filter(|&k| self.splittable(&tri.nodes, k))
                .max_by(|&x, &y| self.metric_len(&tri.nodes, x).total_cmp(&self.metric_len(&tri.nodes, y)));
            match longest {
                Some(k) => {
                    marks.edges.insert(k);
                }
                None => marks.centres.push(ti),
            }
        }
        marks
    }

    fn add_node(&mut self, tri: &mut Triangulation, uv: Point2) -> u32 {
        let index = tri.nodes.len() as u32;
        tri.nodes.push(self.node_at(uv));
        self.normals.push(self.normal_at(uv));
        index
    }

    /// Split triangles whose edges are all fixed at a new interior node.
    fn insert_centres(&mut self, tri: &mut Triangulation, centres: &[usize]) {
        for &ti in centres {
            let [a, b, c] = tri.triangles[ti];
            let uv = Self::uv_centroid(&tri.nodes, &[a, b, c]);
            let m = self.add_node(tri, uv);
            tri.triangles[ti] = [a, b, m];
            tri.triangles.push([b, c, m]);
            tri.triangles.push([c, a, m]);
        }
    }

    fn split(&mut self, tri: &mut Triangulation, marked: &FxHashSet<EdgeKey>) {
        let mut mids: FxHashMap<EdgeKey, u32> = FxHashMap::default();
        // sorted so node numbering does not depend on hash order
        let mut order: Vec<EdgeKey> = marked.iter().copied().collect();
        order.sort_unstable();
        for k in order {
            let uv = Point2::from((tri.nodes[k.0 as usize].uv.coords + tri.nodes[k.1 as usize].uv.coords) * 0.5);
            let m = self.add_node(tri, uv);
            mids.insert(k, m);
        }

        let old = std::mem::take(&mut tri.triangles);
        let mut out = Vec::with_capacity(old.len() + 2 * mids.len());
        for t in old {
            let m = [
                mids.get(&key(t[0], t[1])).copied(),
                mids.get(&key(t[1], t[2])).copied(),
                mids.get(&key(t[2], t[0])).copied(),
            ];
            match m.iter().filter(|x| x.is_some()).count() {
                0 => out.push(t),
                1 => {
                    let e = m.iter().position(Option::is_some).unwrap_or(0);
                    let (x, y, z) = (t[e], t[(e + 1) % 3], t[(e + 2) % 3]);
                    let mid = m[e].unwrap_or(x);
                    out.push([x, mid, z]);
                    out.push([mid, y, z]);
                }
                2 => {
                    // rotate so the unsplit edge is x→y
                    let e = m.iter().position(Option::is_none).unwrap_or(0);
                    let (x, y, z) = (t[e], t[(e + 1) % 3], t[(e + 2) % 3]);
                    let m1 = m[(e + 1) % 3].unwrap_or(y);
                    let m2 = m[(e + 2) % 3].unwrap_or(z);
                    out.push([m1, z, m2]);
                    if self.metric_len(&tri.nodes, key(x, m1)) <= self.metric_len(&tri.nodes, key(y, m2)) {
                        out.push([x, y, m1]);
                        out.push([x, m1, m2]);
                    } else {
                        out.push([x, y, m2]);
                        out.push([y, m1, m2]);
                    }
                }
                _ => {
                    let (a, b, c) = (t[0], t[1], t[2]);
                    let (m0, m1, m2) = (m[0].unwrap_or(a), m[1].unwrap_or(b), m[2].unwrap_or(c));
                    out.push([a, m0, m2]);
                    out.push([m0, b, m1]);
                    out.push([m2, m1, c]);
                    out.push([m0, m1, m2]);
                }
            }
        }
        tri.triangles = out;
    }
}

/// Refine `tri` until it approximates `surface` within the tolerances.
pub fn refine(tri: &mut Triangulation, surface: &Surface, params: &TessellationParams) -> Result<(), String> {
    let mut lo = Point2::new(f64::INFINITY, f64::INFINITY);
    let mut hi = Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
    for n in &tri.nodes {
        lo = lo.inf(&n.uv);
        hi = hi.sup(&n.uv);
    }
    let metric = Metric::estimate(surface, lo, hi, params);
    log::trace!("refinement metric su={:.4e} sv={:.4e}", metric.su, metric.sv);
    let mut refiner = Refiner {
        surface,
        params,
        metric,
        boundary: tri.boundary.iter().copied().collect(),
        normals: Vec::with_capacity(tri.nodes.len()),
        uv_eps: 1e-9 * (hi - lo).norm(),
    };
    refiner.normals = tri.nodes.iter().map(|n| refiner.normal_at(n.uv)).collect();
    flip_edges(tri, &refiner.metric, &refiner.boundary);

    for pass in 0..params.max_refinement_passes {
        let marks = refiner.mark(tri);
        if marks.is_empty() {
            log::trace!("refinement converged after {pass} passes, {} triangles", tri.triangles.len());
            return Ok(());
        }
        refiner.insert_centres(tri, &marks.centres);
        refiner.split(tri, &marks.edges);
        flip_edges(tri, &refiner.metric, &refiner.boundary);
        if tri.triangles.len() > params.max_triangles_per_face {
            return Err(format!(
                "refinement exceeded {} triangles",
                params.max_triangles_per_face
            ));
        }
    }
    if refiner.mark(tri).is_empty() {
        return Ok(());
    }
    Err(format!(
        "refinement did not converge in {} passes",
        params.max_refinement_passes
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Domain;
    use crate::triangulate::{orient_ccw, triangulate};
    use std::f64::consts::FRAC_PI_2;
    use steplook_math::Frame;

    fn cylinder() -> Surface {
        Surface::Cylinder {
            frame: Frame::world(),
            radius: 5.0,
        }
    }

    fn sphere() -> Surface {
        Surface::Sphere {
            frame: Frame::world(),
            radius: 5.0,
        }
    }

    fn node(s: &Surface, u: f64, v: f64) -> Node {
        Node {
            uv: Point2::new(u, v),
            xyz: s.point(u, v),
        }
    }

    fn triangulated(outer: Vec<Node>) -> Triangulation {
        let mut tri = triangulate(&Domain { outer, holes: vec![] }).unwrap();
        orient_ccw(&tri.nodes, &mut tri.triangles);
        tri
    }

    /// Cylinder patch u in [0, π/2], v in [0, 10], both circular sides
    /// sampled at the arc step for `t`.
    fn strip(s: &Surface, t: f64) -> (Triangulation, usize) {
        let params = TessellationParams::with_chord_tolerance(t);
        let n = (FRAC_PI_2 / params.arc_step(5.0)).ceil() as usize;
        let at = |i: usize| FRAC_PI_2 * i as f64 / n as f64;
        let mut ring: Vec<Node> = (0..=n).map(|i| node(s, at(i), 0.0)).collect();
        ring.extend((0..=n).map(|i| node(s, at(n - i), 10.0)));
        (triangulated(ring), n)
    }

    /// Sphere patch u in [0, π/2], v in [-0.6, 0.6] with every side sampled
    /// at the arc step for `t`; the interior needs new nodes.
    fn sphere_patch(s: &Surface, t: f64) -> Triangulation {
        let step = TessellationParams::with_chord_tolerance(t).arc_step(5.0);
        let nu = (FRAC_PI_2 / step).ceil() as usize;
        let nv = (1.2 / step).ceil() as usize;
        let u = |i: usize| FRAC_PI_2 * i as f64 / nu as f64;
        let v = |j: usize| -0.6 + 1.2 * j as f64 / nv as f64;
        let mut ring = Vec::new();
        ring.extend((0..nu).map(|i| node(s, u(i), v(0))));
        ring.extend((0..nv).map(|j| node(s, u(nu), v(j))));
        ring.extend((0..nu).map(|i| node(s, u(nu - i), v(nv))));
        ring.extend((0..nv).map(|j| node(s, u(0), v(nv - j))));
        triangulated(ring)
    }

    fn assert_ccw(tri: &Triangulation) {
        for tr in &tri.triangles {
            let a = tri.nodes[tr[0] as usize].uv;
            let b = tri.nodes[tr[1] as usize].uv;
            let c = tri.nodes[tr[2] as usize].uv;
            assert!(triangle_area_2d(&a, &b, &c) > 0.0);
        }
    }

    #[test]
    fn test_cylinder_strip_needs_no_new_nodes() {
        let s = cylinder();
        let (mut tri, n) = strip(&s, 0.01);
        let before = tri.nodes.len();
        refine(&mut tri, &s, &TessellationParams::with_chord_tolerance(0.01)).unwrap();
        assert_eq!(tri.nodes.len(), before);
        assert_eq!(tri.triangles.len(), 2 * n);
        assert_ccw(&tri);
    }

    #[test]
    fn test_flips_turn_fans_into_strips() {
        let s = cylinder();
        let (mut tri, _) = strip(&s, 0.01);
        let fixed: FxHashSet<EdgeKey> = tri.boundary.iter().copied().collect();
        let params = TessellationParams::with_chord_tolerance(0.01);
        let metric = Metric::estimate(&s, Point2::new(0.0, 0.0), Point2::new(FRAC_PI_2, 10.0), &params);
        assert!(metric.su > metric.sv);
        flip_edges(&mut tri, &metric, &fixed);
        let step = params.arc_step(5.0);
        for tr in &tri.triangles {
            for e in 0..3 {
                let a = tri.nodes[tr[e] as usize].uv;
                let b = tri.nodes[tr[(e + 1) % 3] as usize].uv;
                assert!((a.x - b.x).abs() <= step + 1e-9, "edge spans {} in u", (a.x - b.x).abs());
            }
        }
        assert_ccw(&tri);
    }

    #[test]
    fn test_refined_centroids_within_tolerance() {
        let s = sphere();
        let t = 0.01;
        let mut tri = sphere_patch(&s, t);
        let before = tri.nodes.len();
        refine(&mut tri, &s, &TessellationParams::with_chord_tolerance(t)).unwrap();
        assert!(tri.nodes.len() > before);
        for tr in &tri.triangles {
            let c = centroid(&tri.nodes, tr);
            assert!((5.0 - c.coords.norm()).abs() <= t + 1e-9);
        }
    }

    #[test]
    fn test_refinement_keeps_orientation_and_boundary() {
        let s = sphere();
        let mut tri = sphere_patch(&s, 0.01);
        let boundary = tri.boundary.clone();
        refine(&mut tri, &s, &TessellationParams::with_chord_tolerance(0.01)).unwrap();
        assert_ccw(&tri);
        for (a, b) in boundary {
            let present = tri.triangles.iter().any(|tr| {
                (0..3).any(|e| key(tr[e], tr[(e + 1) % 3]) == (a, b))
            });
            assert!(present, "boundary segment {a}-{b} was split");
        }
    }

    #[test]
    fn test_centroid_node_when_all_edges_fixed() {
        // edge midpoints sit 0.009 inside the sphere, the centroid 0.012
        let s = sphere();
        let t = 0.01;
        let mut tri = Triangulation {
            nodes: vec![node(&s, 0.0, 0.0), node(&s, 0.12, 0.0), node(&s, 0.06, 0.1039)],
            triangles: vec![[0, 1, 2]],
            boundary: vec![(0, 1), (1, 2), (0, 2)],
        };
        refine(&mut tri, &s, &TessellationParams::with_chord_tolerance(t)).unwrap();
        assert_eq!(tri.nodes.len(), 4);
        assert_eq!(tri.triangles.len(), 3);
        assert_ccw(&tri);
        for tr in &tri.triangles {
            let c = centroid(&tri.nodes, tr);
            assert!(5.0 - c.coords.norm() <= t);
        }
    }

    #[test]
    fn test_triangle_cap_is_enforced() {
        let s = sphere();
        let mut tri = sphere_patch(&s, 0.01);
        let params = TessellationParams {
            max_triangles_per_face: tri.triangles.len(),
            ..TessellationParams::with_chord_tolerance(0.01)
        };
        assert!(refine(&mut tri, &s, &params).is_err());
    }

    #[test]
    fn test_plane_needs_no_refinement() {
        let s = Surface::Plane { frame: Frame::world() };
        let mut tri = triangulated(
            [(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)]
                .iter()
                .map(|&(u, v)| node(&s, u, v))
                .collect(),
        );
        refine(&mut tri, &s, &TessellationParams::default()).unwrap();
        assert_eq!(tri.triangles.len(), 2);
    }
}
