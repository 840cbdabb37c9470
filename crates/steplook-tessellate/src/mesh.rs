//! Output mesh and the welding assembler that builds it.

use rustc_hash::FxHashMap;
use steplook_math::{angle_between, Point3, Vec3};

use crate::FaceMesh;

/// Output triangle mesh for rendering and export.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// Flat array of vertex positions: `[x0, y0, z0, x1, y1, z1, ...]`.
    pub positions: Vec<f32>,
    /// Flat array of unit vertex normals, parallel to `positions`.
    pub normals: Vec<f32>,
    /// Flat array of triangle indices: `[i0, i1, i2, ...]`.
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Create an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.positions.len() / 3
    }

    /// Number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.indices.len() / 3
    }

    /// Whether the mesh holds no triangles.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Axis-aligned bounds as `(min, max)`, `None` for an empty mesh.
    pub fn bounds(&self) -> Option<([f32; 3], [f32; 3])> {
        let mut it = self.positions.chunks_exact(3);
        let first = it.next()?;
        let mut lo = [first[0], first[1], first[2]];
        let mut hi = lo;
        for p in it {
            for k in 0..3 {
                lo[k] = lo[k].min(p[k]);
                hi[k] = hi[k].max(p[k]);
            }
        }
        Some((lo, hi))
    }
}

/// Grid cell of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CellKey {
    x: i64,
    y: i64,
    z: i64,
}

impl CellKey {
    fn from_point(p: &Point3, cell: f64) -> Self {
        Self {
            x: (p.x / cell).floor() as i64,
            y: (p.y / cell).floor() as i64,
            z: (p.z / cell).floor() as i64,
        }
    }

    fn offset(&self, dx: i64, dy: i64, dz: i64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            z: self.z + dz,
        }
    }
}

/// Concatenates face meshes into one welded [`Mesh`].
///
/// Vertices closer than the weld tolerance share one index. Faces must be
/// added in a fixed order for the output to be reproducible.
#[derive(Debug)]
pub struct MeshAssembler {
    tolerance: f64,
    cell: f64,
    grid: FxHashMap<CellKey, Vec<u32>>,
    positions: Vec<Point3>,
    sample_normals: Vec<Vec3>,
    triangles: Vec<[u32; 3]>,
    collapsed: usize,
}

impl MeshAssembler {
    /// Assembler merging vertices within `weld_tolerance`.
    pub fn new(weld_tolerance: f64) -> Self {
        let tolerance = weld_tolerance.max(0.0);
        Self {
            tolerance,
            cell: tolerance.max(1e-12),
            grid: FxHashMap::default(),
            positions: Vec::new(),
            sample_normals: Vec::new(),
            triangles: Vec::new(),
            collapsed: 0,
        }
    }

    /// Index of the existing vertex within tolerance of `p`, or a new one.
    fn weld(&mut self, p: Point3, normal: Vec3) -> u32 {
        let key = CellKey::from_point(&p, self.cell);
        let mut best: Option<u32> = None;
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(bucket) = self.grid.get(&key.offset(dx, dy, dz)) else {
                        continue;
                    };
                    for &i in bucket {
                        if (self.positions[i as usize] - p).norm() <= self.tolerance
                            && best.map_or(true, |b| i < b)
                        {
                            best = Some(i);
                        }
                    }
                }
            }
        }
        if let Some(i) = best {
            return i;
        }
        let i = self.positions.len() as u32;
        self.positions.push(p);
        self.sample_normals.push(normal);
        self.grid.entry(key).or_default().push(i);
        i
    }

    /// Append one face.
    pub fn add_face(&mut self, face: &FaceMesh) {
        let map: Vec<u32> = face
            .positions
            .iter()
            .zip(&face.normals)
            .map(|(p, n)| self.weld(*p, *n))
            .collect();
        for t in &face.triangles {
            let tri = [map[t[0] as usize], map[t[1] as usize], map[t[2] as usize]];
            if tri[0] == tri[1] || tri[1] == tri[2] || tri[0] == tri[2] {
                self.collapsed += 1;
                continue;
            }
            self.triangles.push(tri);
        }
    }

    /// Number of welded vertices so far.
    pub fn num_vertices(&self) -> usize {
        self.positions.len()
    }

    /// Triangles dropped because welding collapsed them.
    pub fn num_collapsed(&self) -> usize {
        self.collapsed
    }

    /// Compute vertex normals and emit the mesh.
    pub fn finish(self) -> Mesh {
        let normals = self.vertex_normals();
        let mut mesh = Mesh {
            positions: Vec::with_capacity(self.positions.len() * 3),
            normals: Vec::with_capacity(self.positions.len() * 3),
            indices: Vec::with_capacity(self.triangles.len() * 3),
        };
        for (p, n) in self.positions.iter().zip(&normals) {
            mesh.positions.extend([p.x as f32, p.y as f32, p.z as f32]);
            mesh.normals.extend([n.x as f32, n.y as f32, n.z as f32]);
        }
        for t in &self.triangles {
            mesh.indices.extend_from_slice(t);
        }
        mesh
    }

    /// Angle-weighted average of incident triangle normals.
    fn vertex_normals(&self) -> Vec<Vec3> {
        let mut acc = vec![Vec3::zeros(); self.positions.len()];
        for t in &self.triangles {
            let p = [
                self.positions[t[0] as usize],
                self.positions[t[1] as usize],
                self.positions[t[2] as usize],
            ];
            let Some(n) = (p[1] - p[0]).cross(&(p[2] - p[0])).try_normalize(1e-300) else {
                continue;
            };
            for k in 0..3 {
                let a = p[(k + 1) % 3] - p[k];
                let b = p[(k + 2) % 3] - p[k];
                acc[t[k] as usize] += n * angle_between(&a, &b);
            }
        }
        acc.into_iter()
            .zip(&self.sample_normals)
            .map(|(n, s)| n.try_normalize(1e-300).unwrap_or(*s))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn quad(z: f64, flip: bool) -> FaceMesh {
        let n = if flip { -Vec3::z() } else { Vec3::z() };
        FaceMesh {
            step_id: 1,
            positions: vec![
                Point3::new(0.0, 0.0, z),
                Point3::new(1.0, 0.0, z),
                Point3::new(1.0, 1.0, z),
                Point3::new(0.0, 1.0, z),
            ],
            normals: vec![n; 4],
            triangles: if flip {
                vec![[0, 2, 1], [0, 3, 2]]
            } else {
                vec![[0, 1, 2], [0, 2, 3]]
            },
        }
    }

    #[test]
    fn test_welds_shared_vertices() {
        let mut asm = MeshAssembler::new(1e-6);
        asm.add_face(&quad(0.0, false));
        let mut other = quad(0.0, false);
        for p in &mut other.positions {
            p.x += 1.0 + 1e-9;
        }
        asm.add_face(&other);
        let mesh = asm.finish();
        assert_eq!(mesh.num_vertices(), 6);
        assert_eq!(mesh.num_triangles(), 4);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.num_vertices()));
    }

    #[test]
    fn test_collapsed_triangles_dropped() {
        let face = FaceMesh {
            step_id: 2,
            positions: vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 1e-8),
                Point3::new(0.0, 1.0, 0.0),
            ],
            normals: vec![Vec3::z(); 4],
            triangles: vec![[0, 1, 2], [0, 1, 3]],
        };
        let mut asm = MeshAssembler::new(1e-6);
        asm.add_face(&face);
        assert_eq!(asm.num_collapsed(), 1);
        let mesh = asm.finish();
        assert_eq!(mesh.num_triangles(), 1);
        assert_eq!(mesh.num_vertices(), 3);
    }

    #[test]
    fn test_angle_weighted_normals() {
        let mut asm = MeshAssembler::new(1e-6);
        asm.add_face(&quad(0.0, false));
        let mesh = asm.finish();
        for n in mesh.normals.chunks_exact(3) {
            assert_relative_eq!(n[2], 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_isolated_vertex_keeps_sample_normal() {
        let mut face = quad(0.0, false);
        face.positions.push(Point3::new(5.0, 5.0, 5.0));
        face.normals.push(Vec3::x());
        let mut asm = MeshAssembler::new(1e-6);
        asm.add_face(&face);
        let mesh = asm.finish();
        assert_eq!(&mesh.normals[12..15], &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_bounds() {
        let mut asm = MeshAssembler::new(1e-6);
        asm.add_face(&quad(2.0, false));
        let (lo, hi) = asm.finish().bounds().unwrap();
        assert_eq!(lo, [0.0, 0.0, 2.0]);
        assert_eq!(hi, [1.0, 1.0, 2.0]);
        assert!(Mesh::new().bounds().is_none());
    }
}
