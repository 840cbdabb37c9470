//! C ABI for preview hosts.
//!
//! ```c
//! MeshSlice m = {0};
//! if (steplook_load_step("part.step", &m)) {
//!     upload(m.verts, m.normals, m.vert_count, m.tris, m.tri_count);
//! }
//! steplook_free_mesh(m);
//! ```

use std::ffi::{c_char, CStr};
use std::panic::{catch_unwind, AssertUnwindSafe};

use log::error;

use crate::{try_load, LoadOptions};

/// Raw mesh buffers handed across the C boundary.
///
/// `verts` and `normals` hold `3 * vert_count` floats, `tris` holds
/// `3 * tri_count` indices. All pointers are null in a zeroed slice.
#[repr(C)]
#[derive(Debug)]
pub struct MeshSlice {
    /// Vertex positions, xyz interleaved.
    pub verts: *mut f32,
    /// Vertex normals, xyz interleaved.
    pub normals: *mut f32,
    /// Triangle vertex indices.
    pub tris: *mut u32,
    /// Number of vertices.
    pub vert_count: usize,
    /// Number of triangles.
    pub tri_count: usize,
}

impl MeshSlice {
    /// A slice that owns nothing.
    pub const fn zeroed() -> Self {
        Self {
            verts: std::ptr::null_mut(),
            normals: std::ptr::null_mut(),
            tris: std::ptr::null_mut(),
            vert_count: 0,
            tri_count: 0,
        }
    }
}

impl Default for MeshSlice {
    fn default() -> Self {
        Self::zeroed()
    }
}

fn into_raw<T>(v: Vec<T>) -> *mut T {
    if v.is_empty() {
        return std::ptr::null_mut();
    }
    Box::into_raw(v.into_boxed_slice()).cast::<T>()
}

/// # Safety
/// `ptr` is null or came from [`into_raw`] with exactly `len` elements.
unsafe fn free_raw<T>(ptr: *mut T, len: usize) {
    if ptr.is_null() || len == 0 {
        return;
    }
    drop(Box::from_raw(std::ptr::slice_from_raw_parts_mut(ptr, len)));
}

/// Load a STEP file into `out`.
///
/// Returns `false` and leaves `out` zeroed on any failure, including a
/// panic inside the loader.
///
/// # Safety
/// - `path` must be null or a valid NUL-terminated string.
/// - `out` must be null or point to writable memory for one [`MeshSlice`].
#[no_mangle]
pub unsafe extern "C" fn steplook_load_step(path: *const c_char, out: *mut MeshSlice) -> bool {
    if out.is_null() {
        return false;
    }
    out.write(MeshSlice::zeroed());
    if path.is_null() {
        return false;
    }
    let Ok(path) = CStr::from_ptr(path).to_str() else {
        error!("steplook_load_step: path is not valid UTF-8");
        return false;
    };

    let loaded = catch_unwind(AssertUnwindSafe(|| try_load(path, &LoadOptions::default())));
    let mesh = match loaded {
        Ok(Ok(handle)) => handle.into_mesh(),
        Ok(Err(_)) => return false,
        Err(_) => {
            error!("steplook_load_step: loader panicked on {path}");
            return false;
        }
    };

    let vert_count = mesh.num_vertices();
    let tri_count = mesh.num_triangles();
    out.write(MeshSlice {
        verts: into_raw(mesh.positions),
        normals: into_raw(mesh.normals),
        tris: into_raw(mesh.indices),
        vert_count,
        tri_count,
    });
    true
}

/// Free buffers filled by [`steplook_load_step`]. A zeroed slice is a no-op.
///
/// # Safety
/// `mesh` must be zeroed or exactly as written by [`steplook_load_step`],
/// and must not be freed twice.
#[no_mangle]
pub unsafe extern "C" fn steplook_free_mesh(mesh: MeshSlice) {
    free_raw(mesh.verts, mesh.vert_count * 3);
    free_raw(mesh.normals, mesh.vert_count * 3);
    free_raw(mesh.tris, mesh.tri_count * 3);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    #[test]
    fn test_null_arguments() {
        unsafe {
            assert!(!steplook_load_step(std::ptr::null(), std::ptr::null_mut()));
            let mut m = MeshSlice::zeroed();
            assert!(!steplook_load_step(std::ptr::null(), &mut m));
            assert!(m.verts.is_null());
        }
    }

    #[test]
    fn test_missing_file_leaves_slice_zeroed() {
        let path = CString::new("/nonexistent/part.step").unwrap();
        let mut m = MeshSlice {
            vert_count: 7,
            ..MeshSlice::zeroed()
        };
        unsafe {
            assert!(!steplook_load_step(path.as_ptr(), &mut m));
        }
        assert_eq!(m.vert_count, 0);
        assert_eq!(m.tri_count, 0);
        assert!(m.verts.is_null() && m.normals.is_null() && m.tris.is_null());
        unsafe { steplook_free_mesh(m) };
    }

    #[test]
    fn test_free_zeroed_is_noop() {
        unsafe { steplook_free_mesh(MeshSlice::default()) };
    }
}
