#![warn(missing_docs)]

//! B-rep to triangle mesh tessellation for the steplook STEP mesher.
//!
//! Converts faces into triangles by:
//! 1. Discretizing every edge once, so adjacent faces share boundary points
//! 2. Mapping each face's boundary loops into the surface parameter domain,
//!    resolving seams, poles and loops that wrap a period
//! 3. Ear-clipping the resulting polygon with earcutr
//! 4. Refining curved faces until the chord and angular tolerances hold
//! 5. Welding all faces into one indexed [`Mesh`] with smooth normals
//!
//! Edges and faces are processed on the rayon pool when
//! [`TessellationParams::parallel`] is set; the merge order is always
//! ascending face id, so output is identical either way.

mod domain;
mod edges;
mod error;
mod face;
mod mesh;
mod params;
mod refine;
mod triangulate;

pub use edges::{discretize_edge, discretize_edges, EdgePolylines};
pub use error::TessellationError;
pub use face::{tessellate_face, FaceMesh};
pub use mesh::{Mesh, MeshAssembler};
pub use params::TessellationParams;

use log::debug;
use rayon::prelude::*;
use steplook_brep::Brep;

/// Tessellate every face of `brep` into one welded mesh.
///
/// Fails with the error of the first face, in face order, that cannot be
/// triangulated.
pub fn tessellate(brep: &Brep, params: &TessellationParams) -> Result<Mesh, TessellationError> {
    let polylines = discretize_edges(brep, params);
    let faces = brep.faces_to_mesh();
    debug!("tessellating {} faces, {} edges", faces.len(), polylines.len());

    let meshes: Vec<Result<FaceMesh, TessellationError>> = if params.parallel {
        faces
            .par_iter()
            .map(|&f| tessellate_face(brep, &polylines, f, params))
            .collect()
    } else {
        faces
            .iter()
            .map(|&f| tessellate_face(brep, &polylines, f, params))
            .collect()
    };

    let mut assembler = MeshAssembler::new(params.weld_tolerance);
    for face in meshes {
        assembler.add_face(&face?);
    }
    if assembler.num_collapsed() > 0 {
        debug!("dropped {} triangles collapsed by welding", assembler.num_collapsed());
    }
    Ok(assembler.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashMap;
    use steplook_brep::assemble;
    use std::f64::consts::PI;
    use steplook_math::{Tolerance, Vec3};
    use steplook_step::read_step_from_buffer;

    const CUBE: &str = include_str!("../../../testdata/cube.step");
    const CYLINDER: &str = include_str!("../../../testdata/cylinder.step");
    const SPHERE: &str = include_str!("../../../testdata/sphere.step");
    const CONE: &str = include_str!("../../../testdata/cone.step");
    const TORUS: &str = include_str!("../../../testdata/torus.step");
    const BUMP: &str = include_str!("../../../testdata/bump.step");

    fn brep(src: &str) -> Brep {
        assemble(read_step_from_buffer(src.as_bytes()).unwrap(), &Tolerance::DEFAULT).unwrap()
    }

    /// Every undirected edge used by exactly two triangles, once each way.
    fn assert_manifold(mesh: &Mesh) {
        let mut directed: FxHashMap<(u32, u32), u32> = FxHashMap::default();
        for t in mesh.indices.chunks_exact(3) {
            for e in 0..3 {
                *directed.entry((t[e], t[(e + 1) % 3])).or_default() += 1;
            }
        }
        for (&(a, b), &n) in &directed {
            assert_eq!(n, 1, "edge {a}->{b} used {n} times");
            assert_eq!(directed.get(&(b, a)), Some(&1), "edge {a}-{b} is open");
        }
    }

    fn position(mesh: &Mesh, i: u32) -> Vec3 {
        let i = i as usize * 3;
        Vec3::new(
            mesh.positions[i] as f64,
            mesh.positions[i + 1] as f64,
            mesh.positions[i + 2] as f64,
        )
    }

    fn volume(mesh: &Mesh) -> f64 {
        let p = |i: u32| position(mesh, i);
        mesh.indices
            .chunks_exact(3)
            .map(|t| p(t[0]).dot(&p(t[1]).cross(&p(t[2]))) / 6.0)
            .sum()
    }

    /// Largest distance from a triangle centroid to the solid's surface.
    fn max_centroid_error(mesh: &Mesh, distance: impl Fn(&Vec3) -> f64) -> f64 {
        mesh.indices
            .chunks_exact(3)
            .map(|t| distance(&((position(mesh, t[0]) + position(mesh, t[1]) + position(mesh, t[2])) / 3.0)))
            .fold(0.0, f64::max)
    }

    fn assert_volume(mesh: &Mesh, expected: f64, rel: f64) {
        let vol = volume(mesh);
        assert!((vol - expected).abs() < expected * rel, "expected ~{expected}, got {vol}");
    }

    #[test]
    fn test_tessellate_cube() {
        let mesh = tessellate(&brep(CUBE), &TessellationParams::default()).unwrap();
        assert_eq!(mesh.num_vertices(), 8);
        assert_eq!(mesh.num_triangles(), 12);
        assert_manifold(&mesh);
        let vol = volume(&mesh);
        assert!(vol > 0.0, "cube is inside out: {vol}");
    }

    #[test]
    fn test_tessellate_cylinder() {
        let mesh = tessellate(&brep(CYLINDER), &TessellationParams::default()).unwrap();
        assert_manifold(&mesh);
        assert_volume(&mesh, PI * 25.0 * 10.0, 0.01);
        // about 50 samples per circle; the side needs no interior nodes
        assert!(mesh.num_triangles() < 400, "{} triangles", mesh.num_triangles());
        let err = max_centroid_error(&mesh, |p| {
            let side = (5.0 - p.x.hypot(p.y)).abs();
            side.min(p.z.abs()).min((p.z - 10.0).abs())
        });
        assert!(err <= 0.01 + 1e-4, "centroid {err} off the surface");
    }

    /// Distance to the cone with base radius 5 at z=0 and apex at z=10, or its base.
    fn cone_distance(p: &Vec3) -> f64 {
        let side = (2.0 * p.x.hypot(p.y) + p.z - 10.0).abs() / 5f64.sqrt();
        side.min(p.z.abs())
    }

    #[test]
    fn test_tessellate_cone() {
        let mesh = tessellate(&brep(CONE), &TessellationParams::default()).unwrap();
        assert_manifold(&mesh);
        assert_volume(&mesh, PI * 25.0 * 10.0 / 3.0, 0.01);
        assert!(mesh.num_triangles() < 400, "{} triangles", mesh.num_triangles());
        let err = max_centroid_error(&mesh, cone_distance);
        assert!(err <= 0.01 + 1e-4, "centroid {err} off the surface");
    }

    #[test]
    fn test_cone_independent_of_loop_start() {
        let params = TessellationParams::default();
        let base = tessellate(&brep(CONE), &params).unwrap();
        for rotated in ["(#61, #62, #60)", "(#62, #60, #61)"] {
            let src = CONE.replace("(#60, #61, #62)", rotated);
            let mesh = tessellate(&brep(&src), &params).unwrap();
            assert_manifold(&mesh);
            assert_volume(&mesh, PI * 25.0 * 10.0 / 3.0, 0.01);
            assert_eq!(mesh.num_triangles(), base.num_triangles(), "loop {rotated}");
        }
    }

    #[test]
    fn test_tessellate_torus() {
        let mesh = tessellate(&brep(TORUS), &TessellationParams::default()).unwrap();
        assert_manifold(&mesh);
        assert_volume(&mesh, 2.0 * PI * PI * 10.0 * 4.0, 0.02);
        assert!(mesh.num_triangles() < 30_000, "{} triangles", mesh.num_triangles());
        let err = max_centroid_error(&mesh, |p| ((p.x.hypot(p.y) - 10.0).hypot(p.z) - 2.0).abs());
        assert!(err <= 0.01 + 1e-4, "centroid {err} off the surface");
    }

    #[test]
    fn test_tessellate_bspline_top() {
        let mesh = tessellate(&brep(BUMP), &TessellationParams::default()).unwrap();
        assert_manifold(&mesh);
        // top is z = 2 + 0.8x - 0.08x² over the 10x10 base
        assert_volume(&mesh, 1000.0 / 3.0, 0.01);
        assert!(mesh.num_triangles() < 400, "{} triangles", mesh.num_triangles());
        let err = max_centroid_error(&mesh, |p| {
            let slope = 0.8 - 0.16 * p.x;
            let top = (p.z - (2.0 + 0.8 * p.x - 0.08 * p.x * p.x)).abs() / slope.hypot(1.0);
            let sides = p.x.abs().min((p.x - 10.0).abs()).min(p.y.abs()).min((p.y - 10.0).abs());
            top.min(sides).min(p.z.abs())
        });
        assert!(err <= 0.01 + 1e-4, "centroid {err} off the surface");
    }

    #[test]
    fn test_tessellate_sphere() {
        let mesh = tessellate(&brep(SPHERE), &TessellationParams::default()).unwrap();
        assert_manifold(&mesh);
        assert_volume(&mesh, 4.0 / 3.0 * PI * 8.0, 0.02);
    }

    #[test]
    fn test_finer_tolerance_more_triangles() {
        let b = brep(CYLINDER);
        let mut last = 0;
        for t in [0.5, 0.1, 0.01, 0.001] {
            let n = tessellate(&b, &TessellationParams::with_chord_tolerance(t))
                .unwrap()
                .num_triangles();
            assert!(n > last, "tolerance {t}: {n} triangles, previous {last}");
            last = n;
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let b = brep(CYLINDER);
        let par = tessellate(&b, &TessellationParams::default()).unwrap();
        let seq = tessellate(
            &b,
            &TessellationParams {
                parallel: false,
                ..TessellationParams::default()
            },
        )
        .unwrap();
        assert_eq!(par, seq);
    }

    #[test]
    fn test_indices_in_bounds() {
        let mesh = tessellate(&brep(SPHERE), &TessellationParams::with_chord_tolerance(0.05)).unwrap();
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.num_vertices()));
        assert_eq!(mesh.normals.len(), mesh.positions.len());
    }

    #[test]
    fn test_triangle_cap_fails_face() {
        let err = tessellate(
            &brep(CYLINDER),
            &TessellationParams {
                max_triangles_per_face: 4,
                ..TessellationParams::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, TessellationError::UnresolvedFace { .. }));
    }
}
