use std::collections::HashMap;
use std::ffi::CString;
use std::path::PathBuf;

use steplook::ffi::{steplook_free_mesh, steplook_load_step, MeshSlice};
use steplook::{
    load, load_from_bytes, release, try_load, try_load_with_stats, LoadError, LoadOptions, MeshHandle,
};
use tempfile::TempDir;

const CUBE: &str = include_str!("../../../testdata/cube.step");
const CYLINDER: &str = include_str!("../../../testdata/cylinder.step");
const SPHERE: &str = include_str!("../../../testdata/sphere.step");
const CONE: &str = include_str!("../../../testdata/cone.step");
const TORUS: &str = include_str!("../../../testdata/torus.step");
const BUMP: &str = include_str!("../../../testdata/bump.step");

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

/// Drop the DATA section terminator, keeping the trailer.
fn without_data_endsec(src: &str) -> String {
    let end = src.rfind("ENDSEC;").unwrap();
    format!("{}{}", &src[..end], &src[end + "ENDSEC;".len()..])
}

fn assert_closed_manifold(mesh: &MeshHandle) {
    let mut directed: HashMap<(u32, u32), u32> = HashMap::new();
    for t in mesh.triangles() {
        for e in 0..3 {
            *directed.entry((t[e], t[(e + 1) % 3])).or_default() += 1;
        }
    }
    for (&(a, b), &n) in &directed {
        assert_eq!(n, 1, "edge {a}->{b} used {n} times");
        assert_eq!(directed.get(&(b, a)), Some(&1), "edge {a}-{b} has one triangle");
    }
}

#[test]
fn test_load_cube() {
    let dir = TempDir::new().unwrap();
    let result = load(write(&dir, "cube.step", CUBE));
    assert!(result.success);
    assert_eq!(result.mesh.vertex_count(), 8);
    assert_eq!(result.mesh.triangle_count(), 12);
    assert_eq!(result.mesh.positions().len(), 24);
    assert_eq!(result.mesh.normals().len(), 24);
    assert_closed_manifold(&result.mesh);
    release(result.mesh);
}

#[test]
fn test_missing_endsec_fails_cleanly() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "broken.step", &without_data_endsec(CUBE));
    let result = load(&path);
    assert!(!result.success);
    assert_eq!(result.mesh.vertex_count(), 0);
    assert_eq!(result.mesh.triangle_count(), 0);
    assert!(result.mesh.is_empty());
    assert!(matches!(
        try_load(&path, &LoadOptions::default()),
        Err(LoadError::Parse(_))
    ));
    release(result.mesh);
}

/// Insert `entity` as the last instance of the DATA section.
fn with_entity(src: &str, entity: &str) -> String {
    let end = src.rfind("ENDSEC;").unwrap();
    format!("{}{entity}\n{}", &src[..end], &src[end..])
}

#[test]
fn test_huge_knot_multiplicity_fails_cleanly() {
    let src = BUMP.replace(
        "(#5, #9, #6), .UNSPECIFIED., .F., .F., (3, 3)",
        "(#5, #9, #6), .UNSPECIFIED., .F., .F., (200000000000000, 2)",
    );
    assert_ne!(src, BUMP);
    let err = load_from_bytes(src.as_bytes(), &LoadOptions::default()).unwrap_err();
    assert!(matches!(err, LoadError::Resolve(_)), "{err}");
}

#[test]
fn test_deep_nesting_fails_cleanly() {
    let depth = 100_000;
    let src = with_entity(CUBE, &format!("#9999 = FOO({}1{});", "(".repeat(depth), ")".repeat(depth)));
    let err = load_from_bytes(src.as_bytes(), &LoadOptions::default()).unwrap_err();
    assert!(matches!(err, LoadError::Parse(_)), "{err}");

    let dir = TempDir::new().unwrap();
    let path = write(&dir, "nested.step", &src);
    let c_path = CString::new(path.to_str().unwrap()).unwrap();
    let mut slice = MeshSlice::zeroed();
    let ok = unsafe { steplook_load_step(c_path.as_ptr(), &mut slice) };
    assert!(!ok);
    assert!(slice.verts.is_null());
    unsafe { steplook_free_mesh(slice) };
}

#[test]
fn test_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    let result = load(dir.path().join("absent.step"));
    assert!(!result.success);
    release(result.mesh);
}

#[test]
fn test_repeated_loads_are_identical() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "cylinder.step", CYLINDER);
    let a = load(&path);
    let b = load(&path);
    assert!(a.success && b.success);
    assert_eq!(a.mesh.positions(), b.mesh.positions());
    assert_eq!(a.mesh.normals(), b.mesh.normals());
    assert_eq!(a.mesh.indices(), b.mesh.indices());
}

#[test]
fn test_parallel_and_sequential_agree() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "sphere.step", SPHERE);
    let par = try_load(&path, &LoadOptions::default()).unwrap();
    let seq = try_load(
        &path,
        &LoadOptions {
            parallel: false,
            ..LoadOptions::default()
        },
    )
    .unwrap();
    assert_eq!(par, seq);
}

#[test]
fn test_solids_are_closed_and_indices_in_bounds() {
    let dir = TempDir::new().unwrap();
    for (name, src) in [
        ("cylinder.step", CYLINDER),
        ("sphere.step", SPHERE),
        ("cone.step", CONE),
        ("torus.step", TORUS),
        ("bump.step", BUMP),
    ] {
        let result = load(write(&dir, name, src));
        assert!(result.success, "{name}");
        let n = result.mesh.vertex_count() as u32;
        assert!(result.mesh.indices().iter().all(|&i| i < n), "{name}");
        assert_closed_manifold(&result.mesh);
    }
}

#[test]
fn test_cylinder_triangles_grow_with_finer_tolerance() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "cylinder.step", CYLINDER);
    let mut previous = 0;
    for chord_tolerance in [0.2, 0.05, 0.01, 0.002] {
        let opts = LoadOptions {
            chord_tolerance,
            ..LoadOptions::default()
        };
        let (mesh, stats) = try_load_with_stats(&path, &opts).unwrap();
        assert_eq!(stats.triangles, mesh.triangle_count());
        assert!(
            mesh.triangle_count() > previous,
            "{chord_tolerance}: {} <= {previous}",
            mesh.triangle_count()
        );
        previous = mesh.triangle_count();
    }
}

#[test]
fn test_cylinder_bounds() {
    let dir = TempDir::new().unwrap();
    let result = load(write(&dir, "cylinder.step", CYLINDER));
    let (lo, hi) = result.mesh.bounds().unwrap();
    approx::assert_relative_eq!(lo[2], 0.0);
    approx::assert_relative_eq!(hi[2], 10.0);
    approx::assert_relative_eq!(hi[0], 5.0, epsilon = 1e-5);
    approx::assert_relative_eq!(lo[0], -5.0, epsilon = 0.01);
}

#[test]
fn test_ffi_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "cube.step", CUBE);
    let c_path = CString::new(path.to_str().unwrap()).unwrap();
    let mut slice = MeshSlice::zeroed();
    let ok = unsafe { steplook_load_step(c_path.as_ptr(), &mut slice) };
    assert!(ok);
    assert_eq!(slice.vert_count, 8);
    assert_eq!(slice.tri_count, 12);
    let tris = unsafe { std::slice::from_raw_parts(slice.tris, slice.tri_count * 3) };
    assert!(tris.iter().all(|&i| (i as usize) < slice.vert_count));
    unsafe { steplook_free_mesh(slice) };
}

#[test]
fn test_ffi_failure_zeroes_slice() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "broken.step", &without_data_endsec(CUBE));
    let c_path = CString::new(path.to_str().unwrap()).unwrap();
    let mut slice = MeshSlice::zeroed();
    let ok = unsafe { steplook_load_step(c_path.as_ptr(), &mut slice) };
    assert!(!ok);
    assert!(slice.verts.is_null());
    assert_eq!(slice.tri_count, 0);
    unsafe { steplook_free_mesh(slice) };
}
