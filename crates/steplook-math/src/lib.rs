#![warn(missing_docs)]

//! Math types for the steplook mesher.
//!
//! Thin wrappers around nalgebra providing the point, vector and direction
//! types used across the pipeline, an orthonormal placement frame,
//! tolerance constants, and a few planar polygon helpers used when faces
//! are flattened into their parameter domain.

use nalgebra::{Unit, Vector2, Vector3};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// Direction of length one.
pub type Dir3 = Unit<Vector3<f64>>;

/// Surface parameter pair `(u, v)`.
pub type Point2 = nalgebra::Point2<f64>;

/// A vector in 2D space.
pub type Vec2 = Vector2<f64>;

/// A right-handed orthonormal frame: origin plus `x`, `y`, `z` axes.
///
/// Every analytic STEP primitive is positioned by one of these
/// (`AXIS2_PLACEMENT_3D`), with `z` the axis and `x` the reference
/// direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    /// Frame origin.
    pub origin: Point3,
    /// Local X axis (reference direction).
    pub x: Dir3,
    /// Local Y axis (`z × x`).
    pub y: Dir3,
    /// Local Z axis.
    pub z: Dir3,
}

impl Frame {
    /// Build a frame from an axis and an optional reference direction.
    ///
    /// The reference direction is projected onto the plane normal to `z`.
    /// When it is absent or parallel to `z` an arbitrary perpendicular is
    /// chosen.
    pub fn new(origin: Point3, z: Dir3, ref_direction: Option<Vec3>) -> Self {
        let x_raw = ref_direction
            .map(|r| r - z.as_ref() * r.dot(z.as_ref()))
            .filter(|r| r.norm() > 1e-12)
            .unwrap_or_else(|| any_perpendicular(z.as_ref()));
        let x = Dir3::new_normalize(x_raw);
        let y = Dir3::new_normalize(z.as_ref().cross(x.as_ref()));
        Self { origin, x, y, z }
    }

    /// The world frame.
    pub fn world() -> Self {
        Self {
            origin: Point3::origin(),
            x: Vec3::x_axis(),
            y: Vec3::y_axis(),
            z: Vec3::z_axis(),
        }
    }

    /// Map local coordinates to a world point.
    #[inline]
    pub fn to_world(&self, lx: f64, ly: f64, lz: f64) -> Point3 {
        self.origin + self.x.as_ref() * lx + self.y.as_ref() * ly + self.z.as_ref() * lz
    }

    /// Express a world point in local coordinates.
    #[inline]
    pub fn to_local(&self, p: &Point3) -> Vec3 {
        let d = p - self.origin;
        Vec3::new(d.dot(self.x.as_ref()), d.dot(self.y.as_ref()), d.dot(self.z.as_ref()))
    }
}

/// A unit vector perpendicular to `v`.
pub fn any_perpendicular(v: &Vec3) -> Vec3 {
    let helper = if v.x.abs() < 0.9 { Vec3::x() } else { Vec3::y() };
    v.cross(&helper).normalize()
}

/// Linear and angular thresholds used when matching geometry.
#[derive(Debug, Clone, Copy)]
pub struct Tolerance {
    /// Linear distance tolerance in model units.
    pub linear: f64,
    /// Largest angle, radians, treated as zero.
    pub angular: f64,
}

impl Tolerance {
    /// Default tolerances (1e-6 linear, 1e-9 rad angular).
    pub const DEFAULT: Self = Self {
        linear: 1e-6,
        angular: 1e-9,
    };

    /// Whether `a` and `b` are closer than the linear tolerance.
    pub fn points_equal(&self, a: &Point3, b: &Point3) -> bool {
        (a - b).norm() < self.linear
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Signed area of a closed 2D polygon (positive when counter-clockwise).
pub fn signed_area_2d(points: &[Point2]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut area = 0.0;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        area += a.x * b.y - b.x * a.y;
    }
    area * 0.5
}

/// Signed area of a 2D triangle (positive when counter-clockwise).
#[inline]
pub fn triangle_area_2d(a: &Point2, b: &Point2, c: &Point2) -> f64 {
    0.5 * ((b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y))
}

/// Newell normal of a closed 3D polygon, unnormalized.
///
/// Its length is twice the projected area, so a near-zero result means the
/// polygon has no well-defined traversal direction.
pub fn newell_normal(points: &[Point3]) -> Vec3 {
    let n = points.len();
    let mut normal = Vec3::zeros();
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        normal.x += (a.y - b.y) * (a.z + b.z);
        normal.y += (a.z - b.z) * (a.x + b.x);
        normal.z += (a.x - b.x) * (a.y + b.y);
    }
    normal
}

/// Angle between two vectors in radians, 0 when either is zero.
pub fn angle_between(a: &Vec3, b: &Vec3) -> f64 {
    let denom = a.norm() * b.norm();
    if denom < 1e-300 {
        return 0.0;
    }
    (a.dot(b) / denom).clamp(-1.0, 1.0).acos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_frame_from_axis_and_ref() {
        let z = Dir3::new_normalize(Vec3::new(0.0, 0.0, 2.0));
        let f = Frame::new(Point3::new(1.0, 2.0, 3.0), z, Some(Vec3::new(1.0, 0.0, 0.5)));
        assert_relative_eq!(f.x.as_ref().dot(f.z.as_ref()), 0.0, epsilon = 1e-12);
        assert_relative_eq!(f.y.as_ref().dot(&Vec3::y()), 1.0, epsilon = 1e-12);
        let p = f.to_world(1.0, 1.0, 1.0);
        assert_relative_eq!(p, Point3::new(2.0, 3.0, 4.0), epsilon = 1e-12);
        assert_relative_eq!(f.to_local(&p), Vec3::new(1.0, 1.0, 1.0), epsilon = 1e-12);
    }

    #[test]
    fn test_frame_parallel_ref_falls_back() {
        let z = Vec3::z_axis();
        let f = Frame::new(Point3::origin(), z, Some(Vec3::new(0.0, 0.0, 5.0)));
        assert_relative_eq!(f.x.as_ref().dot(z.as_ref()), 0.0, epsilon = 1e-12);
        assert_relative_eq!(f.x.norm(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_coincident_points() {
        let tol = Tolerance::DEFAULT;
        let a = Point3::new(-4.0, 0.5, 12.0);
        let b = Point3::new(-4.0, 0.5 + 5e-8, 12.0);
        assert!(tol.points_equal(&a, &b));
        let c = Point3::new(-4.0, 0.5, 12.01);
        assert!(!tol.points_equal(&a, &c));
    }

    #[test]
    fn test_signed_area() {
        let ccw = [
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(2.0, 3.0),
            Point2::new(0.0, 3.0),
        ];
        assert_relative_eq!(signed_area_2d(&ccw), 6.0);
        let cw: Vec<_> = ccw.iter().rev().copied().collect();
        assert_relative_eq!(signed_area_2d(&cw), -6.0);
    }

    #[test]
    fn test_newell_normal_square() {
        let pts = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let n = newell_normal(&pts);
        assert_relative_eq!(n, Vec3::new(0.0, 0.0, 2.0), epsilon = 1e-12);
    }

    #[test]
    fn test_angle_between() {
        assert_relative_eq!(angle_between(&Vec3::x(), &Vec3::y()), PI / 2.0);
        assert_relative_eq!(angle_between(&Vec3::x(), &Vec3::zeros()), 0.0);
    }
}
