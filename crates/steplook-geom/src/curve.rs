//! Edge curves: lines, circles, ellipses and B-splines.

use std::f64::consts::TAU;

use steplook_math::{Frame, Point3, Vec3};
use steplook_nurbs::BSplineCurve;

use crate::GeometryError;

// =============================================================================
// Analytic curves
// =============================================================================

/// An infinite line.
///
/// Parameterization: `P(t) = origin + t * direction`. STEP lines carry a
/// `VECTOR` with a magnitude, so `direction` is not necessarily unit length.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    /// Point at `t = 0`.
    pub origin: Point3,
    /// Direction scaled by the vector magnitude.
    pub direction: Vec3,
}

/// A circle in the XY plane of its frame.
///
/// Parameterization: `P(t) = origin + r * (cos(t) * x + sin(t) * y)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Circle {
    /// Placement; `z` is the circle normal.
    pub frame: Frame,
    /// Radius.
    pub radius: f64,
}

/// An ellipse in the XY plane of its frame.
///
/// Parameterization: `P(t) = origin + a * cos(t) * x + b * sin(t) * y`.
#[derive(Debug, Clone, PartialEq)]
pub struct Ellipse {
    /// Placement; `x` is the direction of the first semi-axis.
    pub frame: Frame,
    /// Semi-axis along `x`.
    pub semi_axis_1: f64,
    /// Semi-axis along `y`.
    pub semi_axis_2: f64,
}

/// A 3D curve used as edge geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum Curve {
    /// Straight line.
    Line(Line),
    /// Circle.
    Circle(Circle),
    /// Ellipse.
    Ellipse(Ellipse),
    /// Polynomial or rational B-spline.
    BSpline(BSplineCurve),
}

impl Circle {
    /// Create a circle, rejecting non-positive radii.
    pub fn new(frame: Frame, radius: f64) -> Result<Self, GeometryError> {
        if !(radius > 0.0 && radius.is_finite()) {
            return Err(GeometryError::Invalid(format!("circle radius {radius}")));
        }
        Ok(Self { frame, radius })
    }
}

impl Ellipse {
    /// Create an ellipse, rejecting non-positive semi-axes.
    pub fn new(frame: Frame, semi_axis_1: f64, semi_axis_2: f64) -> Result<Self, GeometryError> {
        if !(semi_axis_1 > 0.0 && semi_axis_2 > 0.0) {
            return Err(GeometryError::Invalid(format!(
                "ellipse semi-axes {semi_axis_1}, {semi_axis_2}"
            )));
        }
        Ok(Self {
            frame,
            semi_axis_1,
            semi_axis_2,
        })
    }
}

/// Normalize an angle into `[0, 2π)`.
#[inline]
pub fn wrap_angle(a: f64) -> f64 {
    let r = a.rem_euclid(TAU);
    if r >= TAU {
        0.0
    } else {
        r
    }
}

impl Curve {
    /// Point at parameter `t`.
    pub fn point(&self, t: f64) -> Point3 {
        match self {
            Curve::Line(l) => l.origin + l.direction * t,
            Curve::Circle(c) => {
                let (s, co) = t.sin_cos();
                c.frame.to_world(c.radius * co, c.radius * s, 0.0)
            }
            Curve::Ellipse(e) => {
                let (s, co) = t.sin_cos();
                e.frame.to_world(e.semi_axis_1 * co, e.semi_axis_2 * s, 0.0)
            }
            Curve::BSpline(b) => b.eval(t),
        }
    }

    /// First derivative at parameter `t`.
    pub fn derivative(&self, t: f64) -> Vec3 {
        match self {
            Curve::Line(l) => l.direction,
            Curve::Circle(c) => {
                let (s, co) = t.sin_cos();
                c.radius * (-s * c.frame.x.as_ref() + co * c.frame.y.as_ref())
            }
            Curve::Ellipse(e) => {
                let (s, co) = t.sin_cos();
                -e.semi_axis_1 * s * e.frame.x.as_ref() + e.semi_axis_2 * co * e.frame.y.as_ref()
            }
            Curve::BSpline(b) => b.derivative(t),
        }
    }

    /// Period of a closed parameterization, `None` for open curves.
    pub fn period(&self) -> Option<f64> {
        match self {
            Curve::Circle(_) | Curve::Ellipse(_) => Some(TAU),
            Curve::Line(_) | Curve::BSpline(_) => None,
        }
    }

    /// Bounded parameter domain, `None` for unbounded or periodic curves.
    pub fn domain(&self) -> Option<(f64, f64)> {
        match self {
            Curve::BSpline(b) => Some(b.parameter_domain()),
            _ => None,
        }
    }

    /// Whether the curve is a straight line.
    pub fn is_linear(&self) -> bool {
        matches!(self, Curve::Line(_))
    }

    /// Largest radius of curvature bound useful for chord estimates.
    ///
    /// `None` for lines and B-splines, whose sampling is driven adaptively.
    pub fn max_radius(&self) -> Option<f64> {
        match self {
            Curve::Circle(c) => Some(c.radius),
            Curve::Ellipse(e) => Some(e.semi_axis_1.max(e.semi_axis_2)),
            _ => None,
        }
    }

    /// Parameter of the point on the curve closest to `p`.
    ///
    /// Periodic curves return a value in `[0, 2π)`. B-splines are inverted
    /// by a coarse scan followed by Newton refinement.
    pub fn parameter_of(&self, p: &Point3) -> f64 {
        match self {
            Curve::Line(l) => {
                let len2 = l.direction.norm_squared();
                if len2 < 1e-300 {
                    0.0
                } else {
                    (p - l.origin).dot(&l.direction) / len2
                }
            }
            Curve::Circle(c) => {
                let local = c.frame.to_local(p);
                wrap_angle(local.y.atan2(local.x))
            }
            Curve::Ellipse(e) => {
                let local = e.frame.to_local(p);
                wrap_angle((local.y / e.semi_axis_2).atan2(local.x / e.semi_axis_1))
            }
            Curve::BSpline(b) => invert_bspline(b, p),
        }
    }
}

fn invert_bspline(curve: &BSplineCurve, p: &Point3) -> f64 {
    const SCAN: usize = 64;
    let (t0, t1) = curve.parameter_domain();
    let mut best_t = t0;
    let mut best_d = f64::INFINITY;
    for i in 0..=SCAN {
        let t = t0 + (t1 - t0) * i as f64 / SCAN as f64;
        let d = (curve.eval(t) - p).norm_squared();
        if d < best_d {
            best_d = d;
            best_t = t;
        }
    }
    let mut t = best_t;
    for _ in 0..20 {
        let (c, d) = curve.eval_with_derivative(t);
        let denom = d.norm_squared();
        if denom < 1e-300 {
            break;
        }
        let step = (c - p).dot(&d) / denom;
        let next = (t - step).clamp(t0, t1);
        if (next - t).abs() < 1e-14 * (1.0 + t.abs()) {
            t = next;
            break;
        }
        t = next;
    }
    t
}

/// End parameter of a directed sweep from `from` to the wrapped angle `to`.
///
/// The result differs from `to` by a multiple of `period` and lies within
/// one period after `from` (or before it when `forward` is false). Equal
/// angles give a full turn.
pub fn sweep_end(from: f64, to: f64, period: f64, forward: bool) -> f64 {
    let mut end = to;
    if forward {
        while end <= from + 1e-12 {
            end += period;
        }
        while end - from > period + 1e-12 {
            end -= period;
        }
    } else {
        while end >= from - 1e-12 {
            end -= period;
        }
        while from - end > period + 1e-12 {
            end += period;
        }
    }
    end
}
