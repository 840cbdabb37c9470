#![warn(missing_docs)]

//! Curve and surface evaluation for the steplook mesher.
//!
//! Geometry is a closed set of variants: [`Curve`] and [`Surface`] are
//! enums dispatched with `match` on the per-sample hot path. Each variant
//! exposes point evaluation, first derivatives and an inverse mapping from
//! 3D points back to parameters, which the tessellator uses to flatten
//! face boundaries into the parameter domain.
//!
//! The two free functions [`evaluate_curve`] and [`evaluate_surface`] are
//! the evaluator entry points; surface evaluation fails with
//! [`GeometryError::DegenerateNormal`] where the parameterization is
//! singular (cone apex, sphere poles).

mod curve;
mod error;
mod surface;

pub use curve::{sweep_end, wrap_angle, Circle, Curve, Ellipse, Line};
pub use error::GeometryError;
pub use steplook_nurbs::{BSplineCurve, BSplineSurface};
pub use surface::{Partials, Surface, SurfaceKind};

use steplook_math::{Dir3, Point3};

/// Evaluate a curve at parameter `u`.
pub fn evaluate_curve(curve: &Curve, u: f64) -> Point3 {
    curve.point(u)
}

/// Evaluate a surface at `(u, v)`, returning the point and unit normal.
///
/// The normal is `normalize(dS/du × dS/dv)`; a vanishing cross product is
/// reported as [`GeometryError::DegenerateNormal`].
pub fn evaluate_surface(surface: &Surface, u: f64, v: f64) -> Result<(Point3, Dir3), GeometryError> {
    let p = surface.partials(u, v);
    let n = p.normal().ok_or(GeometryError::DegenerateNormal { u, v })?;
    Ok((p.point, n))
}
