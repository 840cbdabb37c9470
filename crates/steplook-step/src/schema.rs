//! The subset of the AP203/AP214/AP242 schemas the resolver maps.
//!
//! Anything outside this table is carried through parsing with an
//! [`EntityKind::Unrecognized`](crate::parser::EntityKind) marker.

/// Entity type tags with a typed mapping, sorted for binary search.
const KNOWN_TYPES: &[&str] = &[
    "ADVANCED_FACE",
    "AXIS1_PLACEMENT",
    "AXIS2_PLACEMENT_3D",
    "BREP_WITH_VOIDS",
    "B_SPLINE_CURVE_WITH_KNOTS",
    "B_SPLINE_SURFACE_WITH_KNOTS",
    "CARTESIAN_POINT",
    "CIRCLE",
    "CLOSED_SHELL",
    "CONICAL_SURFACE",
    "CYLINDRICAL_SURFACE",
    "DIRECTION",
    "EDGE_CURVE",
    "EDGE_LOOP",
    "ELLIPSE",
    "FACE_BOUND",
    "FACE_OUTER_BOUND",
    "FACE_SURFACE",
    "INTERSECTION_CURVE",
    "LINE",
    "MANIFOLD_SOLID_BREP",
    "OPEN_SHELL",
    "ORIENTED_CLOSED_SHELL",
    "ORIENTED_EDGE",
    "ORIENTED_OPEN_SHELL",
    "PLANE",
    "SEAM_CURVE",
    "SHELL_BASED_SURFACE_MODEL",
    "SPHERICAL_SURFACE",
    "SURFACE_CURVE",
    "TOROIDAL_SURFACE",
    "TRIMMED_CURVE",
    "VECTOR",
    "VERTEX_LOOP",
    "VERTEX_POINT",
];

/// Whether the resolver knows how to type an entity with this tag.
pub fn is_known(type_name: &str) -> bool {
    KNOWN_TYPES.binary_search(&type_name).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_sorted() {
        for pair in KNOWN_TYPES.windows(2) {
            assert!(pair[0] < pair[1], "{} >= {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_lookup() {
        assert!(is_known("ADVANCED_FACE"));
        assert!(is_known("VERTEX_POINT"));
        assert!(is_known("B_SPLINE_SURFACE_WITH_KNOTS"));
        assert!(!is_known("PRODUCT_DEFINITION"));
        assert!(!is_known("OFFSET_SURFACE"));
    }
}
