//! Tessellation of a single face.

use steplook_brep::{Brep, FaceUse};
use steplook_geom::Surface;
use steplook_math::{Point3, Vec3};

use crate::domain::{face_domain, Node};
use crate::edges::EdgePolylines;
use crate::refine::refine;
use crate::triangulate::{orient_ccw, triangulate};
use crate::{TessellationError, TessellationParams};

/// Triangles of one face, not yet welded to its neighbours.
#[derive(Debug, Clone, Default)]
pub struct FaceMesh {
    /// STEP id of the face.
    pub step_id: u64,
    /// Vertex positions.
    pub positions: Vec<Point3>,
    /// Unit sample normals, pointing out of the face.
    pub normals: Vec<Vec3>,
    /// Triangles, counter-clockwise seen from the normal side.
    pub triangles: Vec<[u32; 3]>,
}

impl FaceMesh {
    /// Number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }
}

/// Tessellate the face behind `face_use`.
pub fn tessellate_face(
    brep: &Brep,
    polylines: &EdgePolylines,
    face_use: FaceUse,
    params: &TessellationParams,
) -> Result<FaceMesh, TessellationError> {
    let face = &brep.faces[face_use.face];
    let surface = brep.surface(face.surface);
    let id = face_use.step_id;

    let domain =
        face_domain(brep, polylines, face, surface, params).map_err(|r| TessellationError::unresolved(id, r))?;
    let mut tri = triangulate(&domain).map_err(|r| TessellationError::unresolved(id, r))?;
    orient_ccw(&tri.nodes, &mut tri.triangles);
    if !surface.is_planar() {
        refine(&mut tri, surface, params).map_err(|r| TessellationError::unresolved(id, r))?;
    }
    if tri.triangles.len() > params.max_triangles_per_face {
        return Err(TessellationError::unresolved(
            id,
            format!("{} triangles exceed the per-face cap", tri.triangles.len()),
        ));
    }

    let mut normals = sample_normals(surface, &tri.nodes, &tri.triangles, id);
    let mut triangles = tri.triangles;
    if face_use.flipped {
        for t in &mut triangles {
            t.swap(1, 2);
        }
        for n in &mut normals {
            *n = -*n;
        }
    }

    log::trace!(
        "face #{id}: {:?}, {} vertices, {} triangles",
        surface.kind(),
        tri.nodes.len(),
        triangles.len()
    );
    Ok(FaceMesh {
        step_id: id,
        positions: tri.nodes.iter().map(|n| n.xyz).collect(),
        normals,
        triangles,
    })
}

/// Surface normal at every node, in the surface's own sense.
///
/// Singular samples take the normal of the closest neighbour that has one,
/// or failing that the normal of an incident triangle.
fn sample_normals(surface: &Surface, nodes: &[Node], triangles: &[[u32; 3]], face_id: u64) -> Vec<Vec3> {
    if let Surface::Plane { frame } = surface {
        return vec![frame.z.into_inner(); nodes.len()];
    }
    let raw: Vec<Option<Vec3>> = nodes
        .iter()
        .map(|n| surface.partials(n.uv.x, n.uv.y).normal().map(|d| d.into_inner()))
        .collect();
    if raw.iter().all(Option::is_some) {
        return raw.into_iter().flatten().collect();
    }

    let mut neighbours: Vec<Vec<u32>> = vec![Vec::new(); nodes.len()];
    let mut incident: Vec<Option<usize>> = vec![None; nodes.len()];
    for (ti, t) in triangles.iter().enumerate() {
        for e in 0..3 {
            let a = t[e] as usize;
            neighbours[a].push(t[(e + 1) % 3]);
            neighbours[a].push(t[(e + 2) % 3]);
            incident[a].get_or_insert(ti);
        }
    }

    let mut fallback = 0usize;
    let out = raw
        .iter()
        .enumerate()
        .map(|(i, n)| {
            if let Some(n) = n {
                return *n;
            }
            fallback += 1;
            let here = nodes[i].xyz;
            let nearest = neighbours[i]
                .iter()
                .filter_map(|&j| raw[j as usize].map(|n| ((nodes[j as usize].xyz - here).norm(), n)))
                .min_by(|a, b| a.0.total_cmp(&b.0));
            if let Some((_, n)) = nearest {
                return n;
            }
            incident[i]
                .and_then(|ti| triangle_normal(nodes, &triangles[ti]))
                .unwrap_or_else(Vec3::z)
        })
        .collect();
    log::debug!("face #{face_id}: {fallback} singular samples took a neighbour normal");
    out
}

/// Unit normal of a uv-counter-clockwise triangle in the surface's sense.
fn triangle_normal(nodes: &[Node], t: &[u32; 3]) -> Option<Vec3> {
    let a = nodes[t[0] as usize].xyz;
    let b = nodes[t[1] as usize].xyz;
    let c = nodes[t[2] as usize].xyz;
    (b - a).cross(&(c - a)).try_normalize(1e-300)
}
