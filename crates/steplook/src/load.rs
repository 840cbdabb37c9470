//! The load pipeline: parse, resolve, assemble, tessellate.

use std::path::Path;
use std::time::Instant;

use log::{debug, error, info};
use steplook_brep::assemble;
use steplook_step::{resolve, Parser};
use steplook_tessellate::{tessellate, Mesh};

use crate::{LoadError, LoadOptions, LoadResult, MeshHandle};

/// Counts and timings from one load.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoadStats {
    /// Instances in the DATA section.
    pub entities: usize,
    /// Solids found.
    pub solids: usize,
    /// Shells found.
    pub shells: usize,
    /// Faces found.
    pub faces: usize,
    /// Welded vertices in the output.
    pub vertices: usize,
    /// Triangles in the output.
    pub triangles: usize,
    /// Lexing and parsing, milliseconds.
    pub parse_ms: f64,
    /// Entity resolution and B-rep assembly, milliseconds.
    pub assemble_ms: f64,
    /// Tessellation and welding, milliseconds.
    pub tessellate_ms: f64,
}

impl LoadStats {
    /// Total time, milliseconds.
    pub fn total_ms(&self) -> f64 {
        self.parse_ms + self.assemble_ms + self.tessellate_ms
    }
}

fn ms_since(t: Instant) -> f64 {
    t.elapsed().as_secs_f64() * 1000.0
}

fn mesh_bytes(data: &[u8], opts: &LoadOptions) -> Result<(Mesh, LoadStats), LoadError> {
    opts.validate()?;
    let mut stats = LoadStats::default();

    let t = Instant::now();
    let file = Parser::parse(data)?;
    stats.entities = file.len();
    stats.parse_ms = ms_since(t);
    debug!("parsed {} entities in {:.1} ms", stats.entities, stats.parse_ms);

    let t = Instant::now();
    let graph = resolve(&file)?;
    drop(file);
    let brep = assemble(graph, &opts.topology_tolerance())?;
    stats.solids = brep.num_solids();
    stats.shells = brep.num_shells();
    stats.faces = brep.num_faces();
    stats.assemble_ms = ms_since(t);
    debug!(
        "assembled {} solids, {} shells, {} faces in {:.1} ms",
        stats.solids, stats.shells, stats.faces, stats.assemble_ms
    );

    let t = Instant::now();
    let mesh = tessellate(&brep, &opts.tessellation_params())?;
    stats.vertices = mesh.num_vertices();
    stats.triangles = mesh.num_triangles();
    stats.tessellate_ms = ms_since(t);
    Ok((mesh, stats))
}

/// Mesh STEP file contents already in memory.
pub fn load_from_bytes(data: &[u8], opts: &LoadOptions) -> Result<(MeshHandle, LoadStats), LoadError> {
    let (mesh, stats) = mesh_bytes(data, opts)?;
    Ok((MeshHandle::new(mesh), stats))
}

/// Mesh a STEP file, returning the mesh and load statistics.
pub fn try_load_with_stats(
    path: impl AsRef<Path>,
    opts: &LoadOptions,
) -> Result<(MeshHandle, LoadStats), LoadError> {
    let path = path.as_ref();
    info!("loading {}", path.display());
    let result = std::fs::read(path)
        .map_err(LoadError::from)
        .and_then(|data| load_from_bytes(&data, opts));
    match &result {
        Ok((_, stats)) => info!(
            "loaded {}: {} entities, {} faces, {} vertices, {} triangles in {:.1} ms",
            path.display(),
            stats.entities,
            stats.faces,
            stats.vertices,
            stats.triangles,
            stats.total_ms()
        ),
        Err(e) => error!("{} failed during {}: {e}", path.display(), e.stage()),
    }
    result
}

/// Mesh a STEP file with explicit options, keeping the detailed error.
pub fn try_load(path: impl AsRef<Path>, opts: &LoadOptions) -> Result<MeshHandle, LoadError> {
    try_load_with_stats(path, opts).map(|(mesh, _)| mesh)
}

/// Mesh a STEP file with default options.
///
/// Any failure yields `success = false` and an empty mesh; the cause is
/// logged. Use [`try_load`] to inspect it.
pub fn load(path: impl AsRef<Path>) -> LoadResult {
    match try_load(path, &LoadOptions::default()) {
        Ok(mesh) => LoadResult { success: true, mesh },
        Err(_) => LoadResult::failed(),
    }
}

/// Give the mesh buffers back. Releasing an empty handle does nothing.
pub fn release(mesh: MeshHandle) {
    if !mesh.is_empty() {
        debug!(
            "releasing mesh with {} vertices, {} triangles",
            mesh.vertex_count(),
            mesh.triangle_count()
        );
    }
    drop(mesh);
}

#[cfg(test)]
mod tests {
    use super::*;

    const CUBE: &str = include_str!("../../../testdata/cube.step");

    #[test]
    fn test_load_from_bytes_cube() {
        let (mesh, stats) = load_from_bytes(CUBE.as_bytes(), &LoadOptions::default()).unwrap();
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.triangle_count(), 12);
        assert_eq!(stats.solids, 1);
        assert_eq!(stats.faces, 6);
        assert_eq!(stats.triangles, 12);
        assert!(stats.entities > 0);
        assert!(stats.total_ms() >= 0.0);
    }

    #[test]
    fn test_invalid_options_fail_before_parsing() {
        let opts = LoadOptions {
            chord_tolerance: 0.0,
            ..LoadOptions::default()
        };
        assert!(matches!(
            load_from_bytes(b"not a step file", &opts),
            Err(LoadError::Options(_))
        ));
    }

    #[test]
    fn test_error_stage() {
        let err = load_from_bytes(b"ISO-10303-21;\nHEADER;\n", &LoadOptions::default()).unwrap_err();
        assert_eq!(err.stage(), "parse");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = try_load("/nonexistent/part.step", &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }
}
