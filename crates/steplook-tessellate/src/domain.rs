//! Face boundaries mapped into the surface's (u, v) domain.
//!
//! Planar faces are flattened with the plane's own frame. Curved faces go
//! through [`Surface::project`] followed by:
//!
//! * periodic unwrapping, so consecutive samples never jump by a period;
//! * seam handling: the second use of an edge inside one loop is placed
//!   one period away from the first;
//! * pole handling: a sample where the parameterization collapses gets one
//!   (u, v) per neighbouring sample, joined by a line along the pole;
//! * closing loops that wind around the period, either against a second
//!   winding loop (a band) or through a pole (a cap);
//! * falling back to the whole parameter rectangle when a sphere or torus
//!   face has no edge loop, or when its only loop bounds the complement.

use rustc_hash::FxHashMap;
use steplook_brep::{Brep, EdgeId, Face, WireId, WireKind};
use steplook_geom::Surface;
use steplook_math::{angle_between, signed_area_2d, Frame, Point2, Point3, Vec2};

use crate::edges::{oriented_polyline, EdgePolylines};
use crate::TessellationParams;

/// Bisection depth limit for synthetic boundary segments.
const MAX_SEGMENT_DEPTH: u32 = 16;

/// Candidate cut positions tried when a closed domain has holes.
const CUT_CANDIDATES: usize = 64;

/// A boundary sample: parameter-space position and the 3D point it stands for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    /// Position in the parameter domain.
    pub uv: Point2,
    /// Position in space.
    pub xyz: Point3,
}

/// The region to triangulate: one outer ring and any number of holes.
#[derive(Debug, Clone, Default)]
pub struct Domain {
    /// Outer boundary.
    pub outer: Vec<Node>,
    /// Holes.
    pub holes: Vec<Vec<Node>>,
}

/// One sample of a wire before it is mapped to (u, v).
#[derive(Debug, Clone, Copy)]
struct LoopSample {
    xyz: Point3,
    edge: EdgeId,
    /// Index in the edge's own polyline.
    index: usize,
    /// How many times the edge was already used earlier in this loop.
    use_no: u32,
}

/// Which parameter is free at a singular sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    U,
    V,
}

#[derive(Debug, Clone)]
struct UvRing {
    nodes: Vec<Node>,
    /// Net number of periods travelled in u and v.
    wind: (i32, i32),
    /// A seam image was chosen by tie-break.
    tied: bool,
}

#[derive(Debug, Clone, Copy)]
struct Periods {
    u: Option<f64>,
    v: Option<f64>,
}

impl Periods {
    fn of(surface: &Surface) -> Self {
        Self {
            u: surface.u_period(),
            v: surface.v_period(),
        }
    }

    fn get(&self, axis: usize) -> Option<f64> {
        if axis == 0 {
            self.u
        } else {
            self.v
        }
    }
}

/// Map the boundary of `face` into the domain of `surface`.
///
/// Returns a human-readable reason when the boundary cannot be resolved.
pub fn face_domain(
    brep: &Brep,
    polylines: &EdgePolylines,
    face: &Face,
    surface: &Surface,
    params: &TessellationParams,
) -> Result<Domain, String> {
    match surface {
        Surface::Plane { frame } => planar_domain(brep, polylines, face, frame),
        _ => curved_domain(brep, polylines, face, surface, params),
    }
}

fn wire_samples(brep: &Brep, polylines: &EdgePolylines, wire: WireId) -> Option<Vec<LoopSample>> {
    let WireKind::Edges(oes) = &brep.wires[wire].kind else {
        return None;
    };
    let mut counts: FxHashMap<EdgeId, u32> = FxHashMap::default();
    for oe in oes {
        *counts.entry(oe.edge).or_insert(0) += 1;
    }
    // start on an edge used once so seam images are anchored on the face
    // interior rather than on the seam itself
    let start = oes.iter().position(|oe| counts.get(&oe.edge) == Some(&1)).unwrap_or(0);

    let mut uses: FxHashMap<EdgeId, u32> = FxHashMap::default();
    let mut out = Vec::new();
    for &oe in oes[start..].iter().chain(&oes[..start]) {
        let use_no = {
            let c = uses.entry(oe.edge).or_insert(0);
            *c += 1;
            *c - 1
        };
        let n = polylines[oe.edge].len();
        for (index, p) in oriented_polyline(polylines, oe).take(n - 1) {
            out.push(LoopSample {
                xyz: *p,
                edge: oe.edge,
                index,
                use_no,
            });
        }
    }
    Some(out)
}

// =============================================================================
// Planar faces
// =============================================================================

fn planar_domain(brep: &Brep, polylines: &EdgePolylines, face: &Face, frame: &Frame) -> Result<Domain, String> {
    let flatten = |w: WireId| {
        wire_samples(brep, polylines, w).map(|samples| {
            samples
                .iter()
                .map(|s| {
                    let l = frame.to_local(&s.xyz);
                    Node {
                        uv: Point2::new(l.x, l.y),
                        xyz: s.xyz,
                    }
                })
                .collect::<Vec<_>>()
        })
    };
    let outer = face
        .outer
        .and_then(flatten)
        .ok_or_else(|| "planar face has no edge loop".to_string())?;
    let holes = face.inner.iter().filter_map(|&w| flatten(w)).collect();
    Ok(Domain { outer, holes })
}

// =============================================================================
// Curved faces
// =============================================================================

fn curved_domain(
    brep: &Brep,
    polylines: &EdgePolylines,
    face: &Face,
    surface: &Surface,
    params: &TessellationParams,
) -> Result<Domain, String> {
    let periods = Periods::of(surface);
    let mut outer: Option<UvRing> = None;
    let mut closed: Vec<Vec<Node>> = Vec::new();
    let mut winding: Vec<UvRing> = Vec::new();

    for (i, wire) in face.wires().enumerate() {
        let is_outer = i == 0 && face.outer.is_some();
        let Some(samples) = wire_samples(brep, polylines, wire) else {
            continue;
        };
        let expected = is_outer.then_some(face.same_sense);
        let Some(ring) = build_ring(surface, &samples, periods, expected, params) else {
            continue;
        };
        if ring.wind != (0, 0) {
            winding.push(ring);
        } else if is_outer {
            outer = Some(ring);
        } else {
            closed.push(ring.nodes);
        }
    }

    match winding.len() {
        0 => match outer {
            Some(ring) => {
                let positive = signed_area_2d(&uvs(&ring.nodes)) > 0.0;
                if positive != face.same_sense
                    && !ring.tied
                    && periods.u.is_some()
                    && surface.full_domain().is_some()
                {
                    // the loop encloses the part of the surface that is not the face
                    closed.push(ring.nodes);
                    full_domain(surface, closed, periods, params)
                } else {
                    let mut holes = closed;
                    align_holes(&ring.nodes, &mut holes, periods);
                    Ok(Domain {
                        outer: ring.nodes,
                        holes,
                    })
                }
            }
            None => full_domain(surface, closed, periods, params),
        },
        1 => {
            if let Some(ring) = outer {
                closed.push(ring.nodes);
            }
            let a = winding.remove(0);
            cap(surface, a, closed, face.same_sense, periods, params)
        }
        2 => {
            if let Some(ring) = outer {
                closed.push(ring.nodes);
            }
            let b = winding.remove(1);
            let a = winding.remove(0);
            band(surface, a, b, closed, periods, params)
        }
        n => Err(format!("{n} loops wind around the surface period")),
    }
}

fn uvs(nodes: &[Node]) -> Vec<Point2> {
    nodes.iter().map(|n| n.uv).collect()
}

#[inline]
fn coord(p: &Point2, axis: usize) -> f64 {
    if axis == 0 {
        p.x
    } else {
        p.y
    }
}

#[inline]
fn set_coord(p: &mut Point2, axis: usize, value: f64) {
    if axis == 0 {
        p.x = value;
    } else {
        p.y = value;
    }
}

/// Shift `value` by whole periods to the representative nearest `target`.
#[inline]
fn nearest_image(value: f64, target: f64, period: f64) -> f64 {
    value + period * ((target - value) / period).round()
}

fn unwrap_near(raw: Point2, prev: Option<Point2>, periods: Periods) -> Point2 {
    let Some(prev) = prev else {
        return raw;
    };
    let mut p = raw;
    if let Some(pu) = periods.u {
        p.x = nearest_image(raw.x, prev.x, pu);
    }
    if let Some(pv) = periods.v {
        p.y = nearest_image(raw.y, prev.y, pv);
    }
    p
}

/// Image of a seam sample on the other side of the period.
///
/// Returns the image closest to `prev` and whether another image was
/// equally close; ties go to `tie_sign`.
fn seam_image(first: Point2, prev: Option<Point2>, periods: Periods, tie_sign: f64) -> (Point2, bool) {
    const STEPS: [(f64, f64); 8] = [
        (1.0, 0.0),
        (-1.0, 0.0),
        (0.0, 1.0),
        (0.0, -1.0),
        (1.0, 1.0),
        (1.0, -1.0),
        (-1.0, 1.0),
        (-1.0, -1.0),
    ];
    let pu = periods.u.unwrap_or(0.0);
    let pv = periods.v.unwrap_or(0.0);
    let candidates: Vec<Point2> = STEPS
        .iter()
        .filter(|(ku, kv)| (*ku == 0.0 || pu > 0.0) && (*kv == 0.0 || pv > 0.0))
        .map(|(ku, kv)| first + Vec2::new(ku * tie_sign * pu, kv * tie_sign * pv))
        .collect();
    let (Some(prev), false) = (prev, candidates.is_empty()) else {
        return (candidates.first().copied().unwrap_or(first), false);
    };

    let mut best = 0;
    let mut best_d = f64::INFINITY;
    let mut second_d = f64::INFINITY;
    for (i, c) in candidates.iter().enumerate() {
        let d = (c - prev).norm();
        if d < best_d {
            second_d = best_d;
            best_d = d;
            best = i;
        } else if d < second_d {
            second_d = d;
        }
    }
    let tied = (second_d - best_d).abs() <= 1e-9 * (1.0 + best_d);
    (candidates[best], tied)
}

/// Whether the parameterization collapses at `uv`, and which parameter is
/// free there.
fn singular_axis(surface: &Surface, uv: Point2, xyz: &Point3, params: &TessellationParams) -> Option<(Axis, f64)> {
    let p = surface.partials(uv.x, uv.y);
    if p.normal().is_none() {
        return Some(if p.du.norm() <= p.dv.norm() {
            (Axis::U, uv.y)
        } else {
            (Axis::V, uv.x)
        });
    }
    let tol = params.weld_tolerance.max(1e-9);
    surface
        .singular_v()
        .into_iter()
        .find(|&v| (surface.point(0.0, v) - xyz).norm() <= tol)
        .map(|v| (Axis::U, v))
}

fn build_ring(
    surface: &Surface,
    samples: &[LoopSample],
    periods: Periods,
    expected_positive: Option<bool>,
    params: &TessellationParams,
) -> Option<UvRing> {
    let ring = map_ring(surface, samples, periods, 1.0, params)?;
    if let (true, (0, 0), Some(expected)) = (ring.tied, ring.wind, expected_positive) {
        if (signed_area_2d(&uvs(&ring.nodes)) > 0.0) != expected {
            return map_ring(surface, samples, periods, -1.0, params);
        }
    }
    Some(ring)
}

fn map_ring(
    surface: &Surface,
    samples: &[LoopSample],
    periods: Periods,
    tie_sign: f64,
    params: &TessellationParams,
) -> Option<UvRing> {
    let n = samples.len();
    let mut raw = Vec::with_capacity(n);
    let mut hint = None;
    for s in samples {
        let uv = surface.project(&s.xyz, hint);
        hint = Some(uv);
        raw.push(uv);
    }
    let singular: Vec<Option<(Axis, f64)>> = raw
        .iter()
        .zip(samples)
        .map(|(uv, s)| singular_axis(surface, *uv, &s.xyz, params))
        .collect();
    if singular.iter().all(Option::is_some) {
        return None;
    }

    let mut uv = raw.clone();
    let mut first_use: FxHashMap<(EdgeId, usize), Point2> = FxHashMap::default();
    let mut prev = None;
    let mut tied = false;
    for i in 0..n {
        if singular[i].is_some() {
            continue;
        }
        let s = &samples[i];
        let key = (s.edge, s.index);
        let mapped = match first_use.get(&key) {
            Some(&first) if s.use_no > 0 => {
                let (p, t) = seam_image(first, prev, periods, tie_sign);
                tied |= t;
                p
            }
            _ => unwrap_near(raw[i], prev, periods),
        };
        if s.use_no == 0 {
            first_use.entry(key).or_insert(mapped);
        }
        uv[i] = mapped;
        prev = Some(mapped);
    }

    let mut nodes = Vec::with_capacity(n + 8);
    for i in 0..n {
        let Some((axis, fixed)) = singular[i] else {
            nodes.push(Node {
                uv: uv[i],
                xyz: samples[i].xyz,
            });
            continue;
        };
        let prev = (1..n).map(|k| (i + n - k) % n).find(|&j| singular[j].is_none());
        let next = (1..n).map(|k| (i + k) % n).find(|&j| singular[j].is_none());
        let (Some(prev), Some(next)) = (prev, next) else {
            continue;
        };
        let (free, fixed_axis) = match axis {
            Axis::U => (0, 1),
            Axis::V => (1, 0),
        };
        let mut a = uv[prev];
        let mut b = uv[next];
        set_coord(&mut a, fixed_axis, fixed);
        set_coord(&mut b, fixed_axis, fixed);
        let xyz = samples[i].xyz;
        let span = coord(&b, free) - coord(&a, free);
        let steps = if span.abs() <= 1e-12 {
            0
        } else {
            ((span.abs() / params.angular_tolerance).ceil() as usize).clamp(1, 10_000)
        };
        nodes.push(Node { uv: a, xyz });
        for k in 1..=steps {
            let mut p = a;
            set_coord(&mut p, free, coord(&a, free) + span * k as f64 / steps as f64);
            nodes.push(Node { uv: p, xyz });
        }
    }

    let wind = (winding(&nodes, 0, periods.u), winding(&nodes, 1, periods.v));
    Some(UvRing { nodes, wind, tied })
}

fn winding(nodes: &[Node], axis: usize, period: Option<f64>) -> i32 {
    let (Some(p), Some(first), Some(last)) = (period, nodes.first(), nodes.last()) else {
        return 0;
    };
    ((coord(&last.uv, axis) - coord(&first.uv, axis)) / p).round() as i32
}

/// Rotate a winding ring to start at `start`, unwrap it continuously, and
/// append the start again shifted by the winding.
fn open_ring(nodes: &[Node], start: usize, shift: Vec2, periods: Periods) -> Vec<Node> {
    let n = nodes.len();
    let mut out: Vec<Node> = Vec::with_capacity(n + 1);
    out.push(nodes[start]);
    for k in 1..n {
        let nd = nodes[(start + k) % n];
        let prev = out[out.len() - 1].uv;
        out.push(Node {
            uv: unwrap_near(nd.uv, Some(prev), periods),
            xyz: nd.xyz,
        });
    }
    out.push(Node {
        uv: out[0].uv + shift,
        xyz: out[0].xyz,
    });
    out
}

fn period_shift(axis: usize, amount: f64) -> Vec2 {
    if axis == 0 {
        Vec2::new(amount, 0.0)
    } else {
        Vec2::new(0.0, amount)
    }
}

fn single_axis_winding(ring: &UvRing) -> Option<(usize, i32)> {
    match ring.wind {
        (w, 0) if w.abs() == 1 => Some((0, w)),
        (0, w) if w.abs() == 1 => Some((1, w)),
        _ => None,
    }
}

fn coord_range(nodes: &[Node], axis: usize) -> (f64, f64) {
    nodes.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), n| {
        let c = coord(&n.uv, axis);
        (lo.min(c), hi.max(c))
    })
}

/// Signed distance from `value` to the nearest hole along a periodic axis;
/// larger is further away.
fn clearance(value: f64, holes: &[Vec<Node>], axis: usize, period: f64) -> f64 {
    holes
        .iter()
        .map(|h| {
            let (lo, hi) = coord_range(h, axis);
            let mid = 0.5 * (lo + hi);
            let mut d = (value - mid).rem_euclid(period);
            if d > 0.5 * period {
                d = period - d;
            }
            d - 0.5 * (hi - lo)
        })
        .fold(f64::INFINITY, f64::min)
}

/// Index of the candidate furthest from every hole; the first one when there are none.
fn best_cut(candidates: &[f64], holes: &[Vec<Node>], axis: usize, period: f64) -> usize {
    if holes.is_empty() {
        return 0;
    }
    let mut best = 0;
    let mut best_score = f64::NEG_INFINITY;
    for (i, &c) in candidates.iter().enumerate() {
        let s = clearance(c, holes, axis, period);
        if s > best_score + 1e-12 {
            best_score = s;
            best = i;
        }
    }
    best
}

/// Move each hole by whole periods so it sits inside the outer ring's span.
fn align_holes(outer: &[Node], holes: &mut [Vec<Node>], periods: Periods) {
    for axis in 0..2 {
        let Some(p) = periods.get(axis) else {
            continue;
        };
        let (lo, hi) = coord_range(outer, axis);
        let center = 0.5 * (lo + hi);
        for hole in holes.iter_mut() {
            let (hlo, hhi) = coord_range(hole, axis);
            let hc = 0.5 * (hlo + hhi);
            let shift = nearest_image(hc, center, p) - hc;
            if shift != 0.0 {
                for n in hole.iter_mut() {
                    let c = coord(&n.uv, axis);
                    set_coord(&mut n.uv, axis, c + shift);
                }
            }
        }
    }
}

/// Which parameters of an analytic surface are angles.
fn angle_axes(surface: &Surface) -> (bool, bool) {
    match surface {
        Surface::Cylinder { .. } | Surface::Cone { .. } => (true, false),
        Surface::Sphere { .. } | Surface::Torus { .. } => (true, true),
        Surface::Plane { .. } | Surface::BSpline(_) => (false, false),
    }
}

/// Interior samples of the straight (u, v) segment `a`→`b`, spaced so its
/// image on the surface meets both tolerances.
pub(crate) fn segment_nodes(surface: &Surface, a: Point2, b: Point2, params: &TessellationParams) -> Vec<Node> {
    let mut ts = Vec::new();
    bisect_segment(surface, a, b, 0.0, 1.0, params, 0, &mut ts);
    ts.into_iter()
        .map(|t| {
            let uv = a + (b - a) * t;
            Node {
                uv,
                xyz: surface.point(uv.x, uv.y),
            }
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn bisect_segment(
    surface: &Surface,
    a: Point2,
    b: Point2,
    t0: f64,
    t1: f64,
    params: &TessellationParams,
    depth: u32,
    out: &mut Vec<f64>,
) {
    if depth >= MAX_SEGMENT_DEPTH {
        return;
    }
    let p0 = a + (b - a) * t0;
    let p1 = a + (b - a) * t1;
    let tm = 0.5 * (t0 + t1);
    let pm = a + (b - a) * tm;
    let s0 = surface.partials(p0.x, p0.y);
    let s1 = surface.partials(p1.x, p1.y);
    let sm = surface.point(pm.x, pm.y);
    let chord_mid = Point3::from((s0.point.coords + s1.point.coords) * 0.5);
    let (au, av) = angle_axes(surface);
    let d = p1 - p0;
    let split = (sm - chord_mid).norm() > params.chord_tolerance
        || (au && d.x.abs() > params.angular_tolerance)
        || (av && d.y.abs() > params.angular_tolerance)
        || matches!((s0.normal(), s1.normal()), (Some(n0), Some(n1))
            if angle_between(n0.as_ref(), n1.as_ref()) > params.angular_tolerance);
    if split {
        bisect_segment(surface, a, b, t0, tm, params, depth + 1, out);
        out.push(tm);
        bisect_segment(surface, a, b, tm, t1, params, depth + 1, out);
    }
}

/// Closing segments of an opened ring: samples from `from` to `to` and the
/// same samples mirrored one period back, in reverse.
fn connectors(
    surface: &Surface,
    from: Point2,
    to: Point2,
    back: Vec2,
    params: &TessellationParams,
) -> (Vec<Node>, Vec<Node>) {
    let there = segment_nodes(surface, from, to, params);
    let back_nodes = there
        .iter()
        .rev()
        .map(|n| Node {
            uv: n.uv + back,
            xyz: n.xyz,
        })
        .collect();
    (there, back_nodes)
}

fn band(
    surface: &Surface,
    a: UvRing,
    b: UvRing,
    mut holes: Vec<Vec<Node>>,
    periods: Periods,
    params: &TessellationParams,
) -> Result<Domain, String> {
    let (axis, wa) = single_axis_winding(&a).ok_or("loop winds more than once")?;
    let (axis_b, wb) = single_axis_winding(&b).ok_or("loop winds more than once")?;
    if axis != axis_b || wa != -wb {
        return Err("winding loops do not bound a band".into());
    }
    let p = periods.get(axis).ok_or("winding along a non-periodic parameter")?;

    let cands: Vec<f64> = a.nodes.iter().map(|n| coord(&n.uv, axis)).collect();
    let cut = best_cut(&cands, &holes, axis, p);
    let a_open = open_ring(&a.nodes, cut, period_shift(axis, wa as f64 * p), periods);
    let a_end = a_open[a_open.len() - 1].uv;

    // the point of B nearest the cut line
    let target = coord(&a_end, axis);
    let mut j = 0;
    let mut best = f64::INFINITY;
    for (i, n) in b.nodes.iter().enumerate() {
        let c = coord(&n.uv, axis);
        let d = (nearest_image(c, target, p) - target).abs();
        if d < best - 1e-12 {
            best = d;
            j = i;
        }
    }
    let mut b_open = open_ring(&b.nodes, j, period_shift(axis, wb as f64 * p), periods);
    let b0 = coord(&b_open[0].uv, axis);
    let shift = nearest_image(b0, target, p) - b0;
    for n in &mut b_open {
        let c = coord(&n.uv, axis);
        set_coord(&mut n.uv, axis, c + shift);
    }
    let b_start = b_open[0].uv;

    let (conn, conn_back) = connectors(surface, a_end, b_start, period_shift(axis, -(wa as f64) * p), params);

    let mut outer = a_open;
    outer.extend(conn);
    outer.extend(b_open);
    outer.extend(conn_back);

    align_holes(&outer, &mut holes, periods);
    Ok(Domain { outer, holes })
}

fn cap(
    surface: &Surface,
    a: UvRing,
    mut holes: Vec<Vec<Node>>,
    same_sense: bool,
    periods: Periods,
    params: &TessellationParams,
) -> Result<Domain, String> {
    let (axis, w) = single_axis_winding(&a).ok_or("loop winds more than once")?;
    let p = periods.u.filter(|_| axis == 0).ok_or("loop winds around v")?;
    let (vmin, vmax) = coord_range(&a.nodes, 1);
    let up = (w > 0) == same_sense;
    let pole = surface
        .singular_v()
        .into_iter()
        .filter(|&v| if up { v >= vmax - 1e-12 } else { v <= vmin + 1e-12 })
        .min_by(|x, y| {
            let dx = if up { x - vmax } else { vmin - x };
            let dy = if up { y - vmax } else { vmin - y };
            dx.total_cmp(&dy)
        })
        .ok_or("winding loop does not close through a pole")?;

    let cands: Vec<f64> = a.nodes.iter().map(|n| n.uv.x).collect();
    let cut = best_cut(&cands, &holes, 0, p);
    let a_open = open_ring(&a.nodes, cut, Vec2::new(w as f64 * p, 0.0), periods);
    let start = a_open[0].uv;
    let end = a_open[a_open.len() - 1].uv;

    let pole_end = Point2::new(end.x, pole);
    let pole_start = Point2::new(start.x, pole);
    let pole_xyz = surface.point(end.x, pole);
    let (conn, conn_back) = connectors(surface, end, pole_end, Vec2::new(-(w as f64) * p, 0.0), params);

    let mut outer = a_open;
    outer.extend(conn);
    let steps = ((p / params.angular_tolerance).ceil() as usize).max(1);
    for k in 0..=steps {
        let uv = pole_end + (pole_start - pole_end) * (k as f64 / steps as f64);
        outer.push(Node { uv, xyz: pole_xyz });
    }
    outer.extend(conn_back);

    align_holes(&outer, &mut holes, periods);
    Ok(Domain { outer, holes })
}

fn full_domain(
    surface: &Surface,
    mut holes: Vec<Vec<Node>>,
    periods: Periods,
    params: &TessellationParams,
) -> Result<Domain, String> {
    let ((u0, u1), (v0, v1)) = surface
        .full_domain()
        .ok_or("face has no edge loop and its surface is unbounded")?;
    let du = u1 - u0;
    let dv = v1 - v0;
    let cut = |axis: usize, lo: f64, span: f64| match periods.get(axis) {
        Some(p) if !holes.is_empty() => {
            let cands: Vec<f64> = (0..CUT_CANDIDATES)
                .map(|i| lo + span * i as f64 / CUT_CANDIDATES as f64)
                .collect();
            cands[best_cut(&cands, &holes, axis, p)]
        }
        _ => lo,
    };
    let cu = cut(0, u0, du);
    let cv = cut(1, v0, dv);

    let node = |uv: Point2| Node {
        uv,
        xyz: surface.point(uv.x, uv.y),
    };
    let side = |a: Point2, b: Point2| {
        let mut s = vec![node(a)];
        s.extend(segment_nodes(surface, a, b, params));
        s.push(node(b));
        s
    };
    let shifted_reverse = |s: &[Node], by: Vec2| -> Vec<Node> {
        s.iter()
            .rev()
            .map(|n| Node {
                uv: n.uv + by,
                xyz: n.xyz,
            })
            .collect()
    };

    let p00 = Point2::new(cu, cv);
    let p10 = Point2::new(cu + du, cv);
    let p11 = Point2::new(cu + du, cv + dv);
    let p01 = Point2::new(cu, cv + dv);

    let bottom = side(p00, p10);
    let right = side(p10, p11);
    let top = if periods.v.is_some() {
        shifted_reverse(&bottom, Vec2::new(0.0, dv))
    } else {
        side(p11, p01)
    };
    let left = if periods.u.is_some() {
        shifted_reverse(&right, Vec2::new(-du, 0.0))
    } else {
        side(p01, p00)
    };

    let mut outer = Vec::new();
    for s in [&bottom, &right, &top, &left] {
        outer.extend_from_slice(&s[..s.len() - 1]);
    }
    align_holes(&outer, &mut holes, periods);
    Ok(Domain { outer, holes })
}
