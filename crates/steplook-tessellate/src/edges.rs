//! Edge discretization.
//!
//! Every edge is sampled exactly once and both faces that share it read the
//! same polyline, so neighbouring faces meet at identical points.

use rayon::prelude::*;
use slotmap::SecondaryMap;
use steplook_brep::{Brep, EdgeId, OrientedEdge};
use steplook_geom::Curve;
use steplook_math::{angle_between, Point3};

use crate::TessellationParams;

/// Bisection depth limit for B-spline edges.
const MAX_DEPTH: u32 = 16;

/// Initial uniform segments for a B-spline edge before bisection.
const BSPLINE_SEED_SEGMENTS: usize = 4;

/// Hard cap on samples per edge.
const MAX_EDGE_SAMPLES: usize = 100_000;

/// Sampled edge polylines, from each edge's start vertex to its end vertex.
pub type EdgePolylines = SecondaryMap<EdgeId, Vec<Point3>>;

/// Discretize every edge of `brep`.
pub fn discretize_edges(brep: &Brep, params: &TessellationParams) -> EdgePolylines {
    let keys: Vec<EdgeId> = brep.edges.keys().collect();
    let lines: Vec<Vec<Point3>> = if params.parallel {
        keys.par_iter().map(|&e| discretize_edge(brep, e, params)).collect()
    } else {
        keys.iter().map(|&e| discretize_edge(brep, e, params)).collect()
    };
    let mut out = SecondaryMap::with_capacity(keys.len());
    for (k, line) in keys.into_iter().zip(lines) {
        out.insert(k, line);
    }
    out
}

/// Points of one edge from start to end vertex; the end points are the
/// vertex positions exactly.
pub fn discretize_edge(brep: &Brep, id: EdgeId, params: &TessellationParams) -> Vec<Point3> {
    let edge = &brep.edges[id];
    let curve = brep.curve(edge.curve);
    let params_t = sample_parameters(curve, edge.t_start, edge.t_end, edge.is_closed(), params);
    let mut pts: Vec<Point3> = params_t.iter().map(|&t| curve.point(t)).collect();
    let n = pts.len();
    pts[0] = brep.vertices[edge.start].point;
    pts[n - 1] = brep.vertices[edge.end].point;
    pts
}

/// Polyline of an oriented edge in traversal order.
pub fn oriented_polyline<'a>(
    polylines: &'a EdgePolylines,
    oe: OrientedEdge,
) -> impl Iterator<Item = (usize, &'a Point3)> + 'a {
    let pts = &polylines[oe.edge];
    let n = pts.len();
    let forward = oe.orientation;
    (0..n).map(move |i| {
        let j = if forward { i } else { n - 1 - i };
        (j, &pts[j])
    })
}

/// Curve parameters from `t0` to `t1` inclusive.
fn sample_parameters(curve: &Curve, t0: f64, t1: f64, closed: bool, params: &TessellationParams) -> Vec<f64> {
    let span = t1 - t0;
    match curve {
        Curve::Line(_) => vec![t0, t1],
        Curve::Circle(_) | Curve::Ellipse(_) => {
            let radius = curve.max_radius().unwrap_or(1.0);
            let step = params.arc_step(radius);
            let mut n = (span.abs() / step).ceil() as usize;
            n = n.clamp(1, MAX_EDGE_SAMPLES);
            if closed {
                n = n.max(3);
            }
            (0..=n).map(|i| t0 + span * i as f64 / n as f64).collect()
        }
        Curve::BSpline(_) => {
            let seeds = if closed {
                BSPLINE_SEED_SEGMENTS.max(3)
            } else {
                BSPLINE_SEED_SEGMENTS
            };
            let mut out = vec![t0];
            for i in 0..seeds {
                let a = t0 + span * i as f64 / seeds as f64;
                let b = t0 + span * (i + 1) as f64 / seeds as f64;
                bisect(curve, a, b, params, 0, &mut out);
            }
            out
        }
    }
}

/// Push the interior samples of `[a, b]` and then `b`.
fn bisect(curve: &Curve, a: f64, b: f64, params: &TessellationParams, depth: u32, out: &mut Vec<f64>) {
    if depth < MAX_DEPTH && out.len() < MAX_EDGE_SAMPLES && needs_split(curve, a, b, params) {
        let m = 0.5 * (a + b);
        bisect(curve, a, m, params, depth + 1, out);
        bisect(curve, m, b, params, depth + 1, out);
    } else {
        out.push(b);
    }
}

fn needs_split(curve: &Curve, a: f64, b: f64, params: &TessellationParams) -> bool {
    let pa = curve.point(a);
    let pb = curve.point(b);
    let chord = pb - pa;
    for f in [0.25, 0.5, 0.75] {
        let p = curve.point(a + (b - a) * f);
        if distance_to_segment(&p, &pa, &chord) > params.chord_tolerance {
            return true;
        }
    }
    angle_between(&curve.derivative(a), &curve.derivative(b)) > params.angular_tolerance
}

fn distance_to_segment(p: &Point3, a: &Point3, ab: &steplook_math::Vec3) -> f64 {
    let len2 = ab.norm_squared();
    if len2 < 1e-300 {
        return (p - a).norm();
    }
    let s = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    (p - (a + ab * s)).norm()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{PI, TAU};
    use steplook_geom::{BSplineCurve, Circle, Line};
    use steplook_math::{Frame, Vec3};

    fn params(t: f64) -> TessellationParams {
        TessellationParams::with_chord_tolerance(t)
    }

    #[test]
    fn test_line_is_one_segment() {
        let l = Curve::Line(Line {
            origin: Point3::origin(),
            direction: Vec3::x(),
        });
        assert_eq!(sample_parameters(&l, 0.0, 5.0, false, &params(0.01)), vec![0.0, 5.0]);
    }

    #[test]
    fn test_circle_chord_deviation_within_tolerance() {
        let c = Curve::Circle(Circle::new(Frame::world(), 5.0).unwrap());
        for tol in [0.1, 0.01, 0.001] {
            let ts = sample_parameters(&c, 0.0, TAU, true, &params(tol));
            for w in ts.windows(2) {
                let a = c.point(w[0]);
                let b = c.point(w[1]);
                let mid = c.point(0.5 * (w[0] + w[1]));
                let sagitta = (mid - Point3::from((a.coords + b.coords) * 0.5)).norm();
                assert!(sagitta <= tol + 1e-12, "sagitta {sagitta} > {tol}");
                assert!(w[1] - w[0] <= 0.5 + 1e-12);
            }
        }
    }

    #[test]
    fn test_finer_tolerance_more_samples() {
        let c = Curve::Circle(Circle::new(Frame::world(), 5.0).unwrap());
        let coarse = sample_parameters(&c, 0.0, PI, false, &params(0.1)).len();
        let fine = sample_parameters(&c, 0.0, PI, false, &params(0.001)).len();
        assert!(fine > coarse);
    }

    #[test]
    fn test_reversed_arc_runs_backwards() {
        let c = Curve::Circle(Circle::new(Frame::world(), 1.0).unwrap());
        let ts = sample_parameters(&c, PI, 0.0, false, &params(0.01));
        assert_eq!(ts[0], PI);
        assert_eq!(*ts.last().unwrap(), 0.0);
        assert!(ts.windows(2).all(|w| w[1] < w[0]));
    }

    #[test]
    fn test_bspline_bisection_meets_tolerance() {
        // quarter circle as a rational quadratic
        let w = std::f64::consts::FRAC_1_SQRT_2;
        let b = BSplineCurve::new(
            vec![
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            Some(vec![1.0, w, 1.0]),
            vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
            2,
        )
        .unwrap();
        let c = Curve::BSpline(b);
        let ts = sample_parameters(&c, 0.0, 1.0, false, &params(0.001));
        assert!(ts.len() > 5);
        for pair in ts.windows(2) {
            let a = c.point(pair[0]);
            let b = c.point(pair[1]);
            let mid = c.point(0.5 * (pair[0] + pair[1]));
            let chord = b - a;
            assert!(distance_to_segment(&mid, &a, &chord) <= 0.001 + 1e-9);
        }
    }
}
