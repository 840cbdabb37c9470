//! Ear-clipping triangulation of a face domain.
//!
//! earcutr drops boundary points that are exactly collinear with their
//! neighbours. Those points are shared with the adjacent face, so leaving
//! them out would open a T-junction; they are stitched back in by splitting
//! the triangle edge that passes over them.

use steplook_math::{signed_area_2d, triangle_area_2d, Point2, Point3};

use crate::domain::{Domain, Node};

/// A planar triangulation over a node list.
#[derive(Debug, Clone, Default)]
pub struct Triangulation {
    /// Vertices: boundary nodes first, refinement nodes appended later.
    pub nodes: Vec<Node>,
    /// Triangles as indices into `nodes`.
    pub triangles: Vec<[u32; 3]>,
    /// Boundary segments as `(min, max)` index pairs.
    pub boundary: Vec<(u32, u32)>,
}

/// Remove consecutive duplicates, including the closing pair.
fn clean_ring(ring: &[Node], eps: f64) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(ring.len());
    for n in ring {
        if out.last().is_some_and(|p| (p.uv - n.uv).norm() <= eps) {
            continue;
        }
        out.push(*n);
    }
    while out.len() > 1 && (out[0].uv - out[out.len() - 1].uv).norm() <= eps {
        out.pop();
    }
    out
}

fn domain_scale(ring: &[Node]) -> f64 {
    let mut lo = Point2::new(f64::INFINITY, f64::INFINITY);
    let mut hi = Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
    for n in ring {
        lo = lo.inf(&n.uv);
        hi = hi.sup(&n.uv);
    }
    (hi - lo).norm().max(1e-300)
}

/// Triangulate `domain`, or explain why it cannot be done.
pub fn triangulate(domain: &Domain) -> Result<Triangulation, String> {
    let scale = domain_scale(&domain.outer);
    let eps = 1e-12 * scale;
    let outer = clean_ring(&domain.outer, eps);
    if outer.len() < 3 {
        return Err("outer loop has fewer than three distinct points".into());
    }
    let holes: Vec<Vec<Node>> = domain
        .holes
        .iter()
        .map(|h| clean_ring(h, eps))
        .filter(|h| h.len() >= 3)
        .collect();

    let mut nodes = outer.clone();
    let mut rings = vec![(0usize, outer.len())];
    let mut hole_starts = Vec::with_capacity(holes.len());
    for h in &holes {
        hole_starts.push(nodes.len());
        rings.push((nodes.len(), h.len()));
        nodes.extend_from_slice(h);
    }

    let mut flat = Vec::with_capacity(nodes.len() * 2);
    for n in &nodes {
        flat.push(n.uv.x);
        flat.push(n.uv.y);
    }
    let indices = earcutr::earcut(&flat, &hole_starts, 2).map_err(|e| format!("earcut failed: {e:?}"))?;
    let mut triangles: Vec<[u32; 3]> = indices
        .chunks_exact(3)
        .map(|t| [t[0] as u32, t[1] as u32, t[2] as u32])
        .collect();

    let mut boundary = Vec::with_capacity(nodes.len());
    for &(start, len) in &rings {
        for k in 0..len {
            let a = (start + k) as u32;
            let b = (start + (k + 1) % len) as u32;
            boundary.push((a.min(b), a.max(b)));
        }
        restore_dropped(&mut triangles, start, len)?;
    }

    let expected = signed_area_2d(&uvs(&outer)).abs()
        - holes.iter().map(|h| signed_area_2d(&uvs(h)).abs()).sum::<f64>();
    let covered: f64 = triangles
        .iter()
        .map(|t| triangle_area_2d(&nodes[t[0] as usize].uv, &nodes[t[1] as usize].uv, &nodes[t[2] as usize].uv).abs())
        .sum();
    if expected <= 0.0 || (covered - expected).abs() > 1e-6 * expected.max(scale * scale * 1e-6) {
        return Err(format!(
            "triangulation covers {covered:.6e} of {expected:.6e} (self-intersecting or inverted loops)"
        ));
    }

    Ok(Triangulation {
        nodes,
        triangles,
        boundary,
    })
}

fn uvs(ring: &[Node]) -> Vec<Point2> {
    ring.iter().map(|n| n.uv).collect()
}

/// Re-insert ring vertices that the triangulator skipped.
fn restore_dropped(triangles: &mut Vec<[u32; 3]>, start: usize, len: usize) -> Result<(), String> {
    let mut used = vec![false; len];
    for t in triangles.iter() {
        for &i in t {
            let i = i as usize;
            if i >= start && i < start + len {
                used[i - start] = true;
            }
        }
    }
    if used.iter().all(|&u| u) {
        return Ok(());
    }
    let Some(first) = used.iter().position(|&u| u) else {
        return Err("loop was not triangulated".into());
    };

    let mut k = 0;
    while k < len {
        let a = (first + k) % len;
        // run of skipped vertices after `a`
        let mut run = Vec::new();
        let mut j = (a + 1) % len;
        while !used[j] {
            run.push(j);
            j = (j + 1) % len;
        }
        k += run.len() + 1;
        if run.is_empty() {
            continue;
        }
        let b = (start + j) as u32;
        let mut cur = (start + a) as u32;
        for v in run {
            let v = (start + v) as u32;
            split_edge(triangles, cur, b, v)?;
            cur = v;
        }
    }
    Ok(())
}

/// Split the triangle that owns edge `p`–`q` at `v`, keeping its winding.
fn split_edge(triangles: &mut Vec<[u32; 3]>, p: u32, q: u32, v: u32) -> Result<(), String> {
    for ti in 0..triangles.len() {
        let t = triangles[ti];
        for e in 0..3 {
            let (x, y, z) = (t[e], t[(e + 1) % 3], t[(e + 2) % 3]);
            if (x == p && y == q) || (x == q && y == p) {
                triangles[ti] = [x, v, z];
                triangles.push([v, y, z]);
                return Ok(());
            }
        }
    }
    Err("boundary segment missing from triangulation".into())
}

/// Make every triangle counter-clockwise in (u, v).
pub fn orient_ccw(nodes: &[Node], triangles: &mut [[u32; 3]]) {
    for t in triangles.iter_mut() {
        let a = &nodes[t[0] as usize].uv;
        let b = &nodes[t[1] as usize].uv;
        let c = &nodes[t[2] as usize].uv;
        if triangle_area_2d(a, b, c) < 0.0 {
            t.swap(1, 2);
        }
    }
}

/// 3D centroid of a triangle.
pub fn centroid(nodes: &[Node], t: &[u32; 3]) -> Point3 {
    let s = nodes[t[0] as usize].xyz.coords + nodes[t[1] as usize].xyz.coords + nodes[t[2] as usize].xyz.coords;
    Point3::from(s / 3.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ring(pts: &[(f64, f64)]) -> Vec<Node> {
        pts.iter()
            .map(|&(x, y)| Node {
                uv: Point2::new(x, y),
                xyz: Point3::new(x, y, 0.0),
            })
            .collect()
    }

    fn area(t: &Triangulation) -> f64 {
        t.triangles
            .iter()
            .map(|tri| {
                triangle_area_2d(
                    &t.nodes[tri[0] as usize].uv,
                    &t.nodes[tri[1] as usize].uv,
                    &t.nodes[tri[2] as usize].uv,
                )
                .abs()
            })
            .sum()
    }

    fn boundary_edges_present(t: &Triangulation) -> bool {
        t.boundary.iter().all(|&(a, b)| {
            t.triangles.iter().any(|tri| {
                (0..3).any(|e| {
                    let x = tri[e];
                    let y = tri[(e + 1) % 3];
                    (x.min(y), x.max(y)) == (a, b)
                })
            })
        })
    }

    #[test]
    fn test_square() {
        let d = Domain {
            outer: ring(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]),
            holes: vec![],
        };
        let t = triangulate(&d).unwrap();
        assert_eq!(t.triangles.len(), 2);
        assert_relative_eq!(area(&t), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_collinear_points_are_kept() {
        let d = Domain {
            outer: ring(&[
                (0.0, 0.0),
                (1.0, 0.0),
                (2.0, 0.0),
                (3.0, 0.0),
                (3.0, 1.0),
                (0.0, 1.0),
            ]),
            holes: vec![],
        };
        let t = triangulate(&d).unwrap();
        assert_eq!(t.triangles.len(), 4);
        assert!(boundary_edges_present(&t));
        assert_relative_eq!(area(&t), 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_square_with_hole() {
        let n = 16;
        let hole: Vec<(f64, f64)> = (0..n)
            .rev()
            .map(|i| {
                let a = std::f64::consts::TAU * i as f64 / n as f64;
                (5.0 + 2.0 * a.cos(), 5.0 + 2.0 * a.sin())
            })
            .collect();
        let d = Domain {
            outer: ring(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]),
            holes: vec![ring(&hole)],
        };
        let t = triangulate(&d).unwrap();
        let hole_area = signed_area_2d(&uvs(&d.holes[0])).abs();
        assert_relative_eq!(area(&t), 100.0 - hole_area, epsilon = 1e-9);
        assert!(boundary_edges_present(&t));
    }

    #[test]
    fn test_self_intersecting_loop_fails() {
        let d = Domain {
            outer: ring(&[(0.0, 0.0), (1.0, 1.0), (1.0, 0.0), (0.0, 1.0)]),
            holes: vec![],
        };
        assert!(triangulate(&d).is_err());
    }

    #[test]
    fn test_degenerate_loop_fails() {
        let d = Domain {
            outer: ring(&[(0.0, 0.0), (1.0, 0.0), (0.0, 0.0)]),
            holes: vec![],
        };
        assert!(triangulate(&d).is_err());
    }

    #[test]
    fn test_orient_ccw() {
        let nodes = ring(&[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)]);
        let mut tris = [[0, 2, 1]];
        orient_ccw(&nodes, &mut tris);
        assert!(triangle_area_2d(&nodes[tris[0][0] as usize].uv, &nodes[tris[0][1] as usize].uv, &nodes[tris[0][2] as usize].uv) > 0.0);
    }
}
