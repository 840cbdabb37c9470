//! Face surfaces: analytic primitives and B-spline patches.

use std::f64::consts::{FRAC_PI_2, TAU};

use steplook_math::{Dir3, Frame, Point2, Point3, Vec3};
use steplook_nurbs::BSplineSurface;

use crate::curve::wrap_angle;
use crate::GeometryError;

/// Relative threshold under which `|dS/du × dS/dv|` counts as zero.
const NORMAL_EPS: f64 = 1e-10;

/// The kind of a surface, for logging and statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    /// Infinite plane.
    Plane,
    /// Circular cylinder.
    Cylinder,
    /// Circular cone.
    Cone,
    /// Sphere.
    Sphere,
    /// Torus.
    Torus,
    /// B-spline or NURBS patch.
    BSpline,
}

/// A parametric surface used as face geometry.
///
/// Analytic variants are positioned by a [`Frame`] (`z` = axis,
/// `x` = reference direction) and parameterized as in ISO 10303-42:
///
/// | Variant | `S(u, v)` |
/// |---|---|
/// | Plane | `o + u·x + v·y` |
/// | Cylinder | `o + r(cos u·x + sin u·y) + v·z` |
/// | Cone | `o + (r + v·tan α)(cos u·x + sin u·y) + v·z` |
/// | Sphere | `o + r cos v(cos u·x + sin u·y) + r sin v·z` |
/// | Torus | `o + (R + r cos v)(cos u·x + sin u·y) + r sin v·z` |
#[derive(Debug, Clone, PartialEq)]
pub enum Surface {
    /// Plane through the frame origin spanned by `x` and `y`.
    Plane {
        /// Placement.
        frame: Frame,
    },
    /// Cylinder around the frame `z` axis.
    Cylinder {
        /// Placement.
        frame: Frame,
        /// Radius.
        radius: f64,
    },
    /// Cone around the frame `z` axis with radius `radius` at `v = 0`.
    Cone {
        /// Placement.
        frame: Frame,
        /// Radius in the placement plane.
        radius: f64,
        /// Half-angle in radians.
        semi_angle: f64,
    },
    /// Sphere centred on the frame origin.
    Sphere {
        /// Placement.
        frame: Frame,
        /// Radius.
        radius: f64,
    },
    /// Torus around the frame `z` axis.
    Torus {
        /// Placement.
        frame: Frame,
        /// Distance from the axis to the tube centre.
        major_radius: f64,
        /// Tube radius.
        minor_radius: f64,
    },
    /// Tensor-product B-spline or NURBS patch.
    BSpline(Box<BSplineSurface>),
}

/// A surface point together with its first partial derivatives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Partials {
    /// Surface point.
    pub point: Point3,
    /// `dS/du`.
    pub du: Vec3,
    /// `dS/dv`.
    pub dv: Vec3,
}

impl Partials {
    /// Unit normal `normalize(du × dv)`, `None` where the parameterization is singular.
    pub fn normal(&self) -> Option<Dir3> {
        let cross = self.du.cross(&self.dv);
        let scale = self.du.norm().max(self.dv.norm());
        let len = cross.norm();
        if !len.is_finite() || len <= NORMAL_EPS * scale * scale {
            return None;
        }
        Some(Dir3::new_unchecked(cross / len))
    }
}

#[inline]
fn radial(frame: &Frame, u: f64) -> (Vec3, Vec3) {
    let (s, c) = u.sin_cos();
    let d = c * frame.x.as_ref() + s * frame.y.as_ref();
    let dd = -s * frame.x.as_ref() + c * frame.y.as_ref();
    (d, dd)
}

impl Surface {
    /// Build a cone, rejecting half-angles outside `(0, π/2)`.
    pub fn cone(frame: Frame, radius: f64, semi_angle: f64) -> Result<Self, GeometryError> {
        if !(semi_angle > 0.0 && semi_angle < FRAC_PI_2) || radius < 0.0 {
            return Err(GeometryError::Invalid(format!(
                "cone radius {radius}, semi-angle {semi_angle}"
            )));
        }
        Ok(Surface::Cone {
            frame,
            radius,
            semi_angle,
        })
    }

    /// Validate a radius read for a cylinder, sphere or torus.
    pub fn checked_radius(radius: f64, what: &str) -> Result<f64, GeometryError> {
        if radius > 0.0 && radius.is_finite() {
            Ok(radius)
        } else {
            Err(GeometryError::Invalid(format!("{what} radius {radius}")))
        }
    }

    /// Surface kind.
    pub fn kind(&self) -> SurfaceKind {
        match self {
            Surface::Plane { .. } => SurfaceKind::Plane,
            Surface::Cylinder { .. } => SurfaceKind::Cylinder,
            Surface::Cone { .. } => SurfaceKind::Cone,
            Surface::Sphere { .. } => SurfaceKind::Sphere,
            Surface::Torus { .. } => SurfaceKind::Torus,
            Surface::BSpline(_) => SurfaceKind::BSpline,
        }
    }

    /// Whether the surface is a plane.
    pub fn is_planar(&self) -> bool {
        matches!(self, Surface::Plane { .. })
    }

    /// Point and first partial derivatives at `(u, v)`.
    pub fn partials(&self, u: f64, v: f64) -> Partials {
        match self {
            Surface::Plane { frame } => Partials {
                point: frame.to_world(u, v, 0.0),
                du: frame.x.into_inner(),
                dv: frame.y.into_inner(),
            },
            Surface::Cylinder { frame, radius } => {
                let (d, dd) = radial(frame, u);
                Partials {
                    point: frame.origin + d * *radius + frame.z.as_ref() * v,
                    du: dd * *radius,
                    dv: frame.z.into_inner(),
                }
            }
            Surface::Cone {
                frame,
                radius,
                semi_angle,
            } => {
                let (d, dd) = radial(frame, u);
                let tan = semi_angle.tan();
                let r = radius + v * tan;
                Partials {
                    point: frame.origin + d * r + frame.z.as_ref() * v,
                    du: dd * r,
                    dv: d * tan + frame.z.as_ref(),
                }
            }
            Surface::Sphere { frame, radius } => {
                let (d, dd) = radial(frame, u);
                let (sv, cv) = v.sin_cos();
                let z = frame.z.as_ref();
                Partials {
                    point: frame.origin + (d * cv + z * sv) * *radius,
                    du: dd * (radius * cv),
                    dv: (-d * sv + z * cv) * *radius,
                }
            }
            Surface::Torus {
                frame,
                major_radius,
                minor_radius,
            } => {
                let (d, dd) = radial(frame, u);
                let (sv, cv) = v.sin_cos();
                let z = frame.z.as_ref();
                let ring = major_radius + minor_radius * cv;
                Partials {
                    point: frame.origin + d * ring + z * (minor_radius * sv),
                    du: dd * ring,
                    dv: (-d * sv + z * cv) * *minor_radius,
                }
            }
            Surface::BSpline(b) => {
                let p = b.partials(u, v);
                Partials {
                    point: p.point,
                    du: p.du,
                    dv: p.dv,
                }
            }
        }
    }

    /// Point at `(u, v)`.
    pub fn point(&self, u: f64, v: f64) -> Point3 {
        self.partials(u, v).point
    }

    /// Unit normal at `(u, v)`.
    pub fn normal(&self, u: f64, v: f64) -> Result<Dir3, GeometryError> {
        self.partials(u, v)
            .normal()
            .ok_or(GeometryError::DegenerateNormal { u, v })
    }

    /// Period of the `u` parameter, if closed.
    pub fn u_period(&self) -> Option<f64> {
        match self {
            Surface::Cylinder { .. }
            | Surface::Cone { .. }
            | Surface::Sphere { .. }
            | Surface::Torus { .. } => Some(TAU),
            Surface::Plane { .. } | Surface::BSpline(_) => None,
        }
    }

    /// Period of the `v` parameter, if closed.
    pub fn v_period(&self) -> Option<f64> {
        match self {
            Surface::Torus { .. } => Some(TAU),
            _ => None,
        }
    }

    /// Values of `v` at which a whole `u` line collapses to one point.
    ///
    /// Sphere poles and the cone apex.
    pub fn singular_v(&self) -> Vec<f64> {
        match self {
            Surface::Sphere { .. } => vec![-FRAC_PI_2, FRAC_PI_2],
            Surface::Cone {
                radius, semi_angle, ..
            } => vec![-radius / semi_angle.tan()],
            _ => Vec::new(),
        }
    }

    /// The complete parameter rectangle of a bounded surface.
    ///
    /// `None` for planes, cylinders and cones, which extend indefinitely.
    pub fn full_domain(&self) -> Option<((f64, f64), (f64, f64))> {
        match self {
            Surface::Sphere { .. } => Some(((0.0, TAU), (-FRAC_PI_2, FRAC_PI_2))),
            Surface::Torus { .. } => Some(((0.0, TAU), (0.0, TAU))),
            Surface::BSpline(b) => Some(b.parameter_domain()),
            _ => None,
        }
    }

    /// Parameters of the surface point closest to `p`.
    ///
    /// Periodic parameters are returned in `[0, 2π)`. Analytic surfaces
    /// invert in closed form; B-splines run Newton iteration seeded either
    /// from `hint` or from a coarse scan of the patch.
    pub fn project(&self, p: &Point3, hint: Option<Point2>) -> Point2 {
        match self {
            Surface::Plane { frame } => {
                let l = frame.to_local(p);
                Point2::new(l.x, l.y)
            }
            Surface::Cylinder { frame, .. } | Surface::Cone { frame, .. } => {
                let l = frame.to_local(p);
                Point2::new(wrap_angle(l.y.atan2(l.x)), l.z)
            }
            Surface::Sphere { frame, .. } => {
                let l = frame.to_local(p);
                let rho = l.x.hypot(l.y);
                Point2::new(wrap_angle(l.y.atan2(l.x)), l.z.atan2(rho))
            }
            Surface::Torus {
                frame,
                major_radius,
                ..
            } => {
                let l = frame.to_local(p);
                let rho = l.x.hypot(l.y) - major_radius;
                Point2::new(wrap_angle(l.y.atan2(l.x)), wrap_angle(l.z.atan2(rho)))
            }
            Surface::BSpline(b) => project_bspline(b, p, hint),
        }
    }
}

fn project_bspline(surface: &BSplineSurface, p: &Point3, hint: Option<Point2>) -> Point2 {
    const SCAN: usize = 16;
    let ((u0, u1), (v0, v1)) = surface.parameter_domain();
    let mut uv = match hint {
        Some(h) => Point2::new(h.x.clamp(u0, u1), h.y.clamp(v0, v1)),
        None => {
            let mut best = (f64::INFINITY, Point2::new(u0, v0));
            for j in 0..=SCAN {
                let v = v0 + (v1 - v0) * j as f64 / SCAN as f64;
                for i in 0..=SCAN {
                    let u = u0 + (u1 - u0) * i as f64 / SCAN as f64;
                    let d = (surface.eval(u, v) - p).norm_squared();
                    if d < best.0 {
                        best = (d, Point2::new(u, v));
                    }
                }
            }
            best.1
        }
    };

    // Gauss-Newton on |S(u, v) - p|²
    for _ in 0..30 {
        let s = surface.partials(uv.x, uv.y);
        let r = s.point - p;
        let a11 = s.du.dot(&s.du);
        let a12 = s.du.dot(&s.dv);
        let a22 = s.dv.dot(&s.dv);
        let b1 = -s.du.dot(&r);
        let b2 = -s.dv.dot(&r);
        let det = a11 * a22 - a12 * a12;
        if det.abs() < 1e-300 {
            break;
        }
        let du = (b1 * a22 - b2 * a12) / det;
        let dv = (a11 * b2 - a12 * b1) / det;
        let next = Point2::new((uv.x + du).clamp(u0, u1), (uv.y + dv).clamp(v0, v1));
        let moved = (next - uv).norm();
        uv = next;
        if moved < 1e-13 * (1.0 + (u1 - u0).abs() + (v1 - v0).abs()) {
            break;
        }
    }
    uv
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluate_surface;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn world() -> Frame {
        Frame::world()
    }

    fn finite_difference(s: &Surface, u: f64, v: f64) -> (Vec3, Vec3) {
        let h = 1e-6;
        let du = (s.point(u + h, v) - s.point(u - h, v)) / (2.0 * h);
        let dv = (s.point(u, v + h) - s.point(u, v - h)) / (2.0 * h);
        (du, dv)
    }

    fn all_analytic() -> Vec<Surface> {
        vec![
            Surface::Plane { frame: world() },
            Surface::Cylinder {
                frame: world(),
                radius: 2.0,
            },
            Surface::cone(world(), 1.0, 0.4).unwrap(),
            Surface::Sphere {
                frame: world(),
                radius: 3.0,
            },
            Surface::Torus {
                frame: world(),
                major_radius: 5.0,
                minor_radius: 1.5,
            },
        ]
    }

    #[test]
    fn test_partials_match_finite_differences() {
        for s in all_analytic() {
            for &(u, v) in &[(0.3, 0.2), (2.0, -0.7), (4.5, 1.1)] {
                let p = s.partials(u, v);
                let (fu, fv) = finite_difference(&s, u, v);
                assert_relative_eq!(p.du, fu, epsilon = 1e-5);
                assert_relative_eq!(p.dv, fv, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn test_normals_point_outward() {
        let cyl = Surface::Cylinder {
            frame: world(),
            radius: 2.0,
        };
        let (p, n) = evaluate_surface(&cyl, 0.0, 1.0).unwrap();
        assert_relative_eq!(p, Point3::new(2.0, 0.0, 1.0), epsilon = 1e-12);
        assert_relative_eq!(n.into_inner(), Vec3::x(), epsilon = 1e-12);

        let sphere = Surface::Sphere {
            frame: world(),
            radius: 3.0,
        };
        let (p, n) = evaluate_surface(&sphere, 1.0, 0.5).unwrap();
        assert_relative_eq!(n.into_inner(), p.coords / 3.0, epsilon = 1e-12);

        let torus = Surface::Torus {
            frame: world(),
            major_radius: 5.0,
            minor_radius: 1.0,
        };
        let (p, n) = evaluate_surface(&torus, 0.0, 0.0).unwrap();
        assert_relative_eq!(p, Point3::new(6.0, 0.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(n.into_inner(), Vec3::x(), epsilon = 1e-12);
    }

    #[test]
    fn test_sphere_pole_is_degenerate() {
        let sphere = Surface::Sphere {
            frame: world(),
            radius: 1.0,
        };
        assert!(matches!(
            evaluate_surface(&sphere, 0.3, FRAC_PI_2),
            Err(GeometryError::DegenerateNormal { .. })
        ));
        assert!(evaluate_surface(&sphere, 0.3, FRAC_PI_2 - 1e-3).is_ok());
    }

    #[test]
    fn test_cone_apex_is_degenerate() {
        let cone = Surface::cone(world(), 2.0, PI / 4.0).unwrap();
        let apex_v = cone.singular_v()[0];
        assert_relative_eq!(apex_v, -2.0, epsilon = 1e-12);
        assert_relative_eq!(cone.point(1.0, apex_v), Point3::new(0.0, 0.0, -2.0), epsilon = 1e-12);
        assert!(cone.normal(1.0, apex_v).is_err());
        assert!(cone.normal(1.0, 0.0).is_ok());
    }

    #[test]
    fn test_invalid_cone() {
        assert!(Surface::cone(world(), 1.0, 0.0).is_err());
        assert!(Surface::cone(world(), 1.0, PI).is_err());
    }

    #[test]
    fn test_project_round_trips() {
        for s in all_analytic() {
            for &(u, v) in &[(0.3, 0.2), (2.0, -0.7), (4.5, 1.1)] {
                let p = s.point(u, v);
                let uv = s.project(&p, None);
                assert_relative_eq!(s.point(uv.x, uv.y), p, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_project_periodic_range() {
        let cyl = Surface::Cylinder {
            frame: world(),
            radius: 1.0,
        };
        let uv = cyl.project(&Point3::new(0.0, -1.0, 4.0), None);
        assert_relative_eq!(uv.x, 1.5 * PI, epsilon = 1e-12);
        assert_relative_eq!(uv.y, 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_bspline_surface_project() {
        let mut pts = Vec::new();
        for j in 0..3 {
            for i in 0..3 {
                let z = if i == 1 && j == 1 { 2.0 } else { 0.0 };
                pts.push(Point3::new(i as f64, j as f64, z));
            }
        }
        let k = vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let b = BSplineSurface::new(pts, None, 3, 3, k.clone(), k, 2, 2).unwrap();
        let s = Surface::BSpline(Box::new(b));
        let target = s.point(0.3, 0.8);
        let uv = s.project(&target, None);
        assert_relative_eq!(uv, Point2::new(0.3, 0.8), epsilon = 1e-7);
        let uv = s.project(&target, Some(Point2::new(0.25, 0.75)));
        assert_relative_eq!(uv, Point2::new(0.3, 0.8), epsilon = 1e-7);
        assert_eq!(s.kind(), SurfaceKind::BSpline);
        assert!(s.u_period().is_none());
    }
}
