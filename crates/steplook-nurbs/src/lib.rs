#![warn(missing_docs)]

//! B-spline and NURBS evaluation for the steplook mesher.
//!
//! Curves and surfaces carry an optional weight vector: without weights they
//! are plain polynomial B-splines, with weights they are rational (NURBS)
//! and are evaluated in homogeneous coordinates. Construction validates the
//! knot vectors and reports problems as [`NurbsError`] instead of panicking,
//! since the data comes straight from untrusted files.
//!
//! # Algorithms
//!
//! - binary span search over a clamped, non-decreasing knot vector
//! - Cox–de Boor recurrence for the non-zero basis functions
//! - first derivatives from the degree `p - 1` basis

use nalgebra::Vector4;
use steplook_math::{Point3, Vec3};
use thiserror::Error;

/// Errors raised while building a spline from file data.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NurbsError {
    /// Knot count, ordering, degree or weights are inconsistent.
    #[error("degenerate knot vector: {0}")]
    DegenerateKnotVector(String),
}

impl NurbsError {
    fn knots(msg: impl Into<String>) -> Self {
        Self::DegenerateKnotVector(msg.into())
    }
}

// =============================================================================
// Knot vector utilities
// =============================================================================

/// Validate a knot vector against its control point count and degree.
///
/// Requires `len == n_points + degree + 1`, non-decreasing values, a degree
/// of at least one, and a non-empty parameter domain.
pub fn validate_knots(knots: &[f64], n_points: usize, degree: usize) -> Result<(), NurbsError> {
    if degree == 0 {
        return Err(NurbsError::knots("degree must be at least 1"));
    }
    if n_points <= degree {
        return Err(NurbsError::knots(format!(
            "{n_points} control points cannot support degree {degree}"
        )));
    }
    if knots.len() != n_points + degree + 1 {
        return Err(NurbsError::knots(format!(
            "expected {} knots for {} control points of degree {}, got {}",
            n_points + degree + 1,
            n_points,
            degree,
            knots.len()
        )));
    }
    if knots.iter().any(|k| !k.is_finite()) {
        return Err(NurbsError::knots("non-finite knot value"));
    }
    if knots.windows(2).any(|w| w[1] < w[0]) {
        return Err(NurbsError::knots("knot values decrease"));
    }
    if knots[n_points] <= knots[degree] {
        return Err(NurbsError::knots("empty parameter domain"));
    }
    Ok(())
}

/// Expand distinct knot values by their multiplicities.
///
/// STEP stores `B_SPLINE_*_WITH_KNOTS` knots in this compressed form. The
/// multiplicities must add up to `expected_len` (control points plus
/// degree plus one); nothing is allocated before that is checked.
pub fn expand_knots(knots: &[f64], multiplicities: &[usize], expected_len: usize) -> Result<Vec<f64>, NurbsError> {
    if knots.len() != multiplicities.len() {
        return Err(NurbsError::knots(format!(
            "{} knot values but {} multiplicities",
            knots.len(),
            multiplicities.len()
        )));
    }
    let total = multiplicities.iter().try_fold(0usize, |acc, &m| acc.checked_add(m));
    if total != Some(expected_len) {
        return Err(NurbsError::knots(match total {
            Some(t) => format!("multiplicities expand to {t} knots, expected {expected_len}"),
            None => "knot multiplicities overflow".to_string(),
        }));
    }
    let mut expanded = Vec::with_capacity(expected_len);
    for (&k, &m) in knots.iter().zip(multiplicities) {
        expanded.extend(std::iter::repeat(k).take(m));
    }
    Ok(expanded)
}

/// Returns `i` such that `knots[i] <= t < knots[i+1]`, clamped to the valid
/// range. For `t` at the end of the domain, returns the last non-empty span.
pub fn find_span(knots: &[f64], n: usize, degree: usize, t: f64) -> usize {
    // n is the index of the last control point
    if t >= knots[n + 1] {
        let mut span = n;
        while span > degree && knots[span] >= knots[n + 1] {
            span -= 1;
        }
        return span;
    }
    if t <= knots[degree] {
        let mut span = degree;
        while span < n && knots[span + 1] <= knots[degree] {
            span += 1;
        }
        return span;
    }
    let mut low = degree;
    let mut high = n + 1;
    let mut mid = (low + high) / 2;
    while t < knots[mid] || t >= knots[mid + 1] {
        if t < knots[mid] {
            high = mid;
        } else {
            low = mid;
        }
        mid = (low + high) / 2;
    }
    mid
}

/// Compute the `degree + 1` non-zero basis functions `N[span-degree..=span]` at `t`.
pub fn basis_functions(knots: &[f64], span: usize, degree: usize, t: f64) -> Vec<f64> {
    let mut n = vec![0.0; degree + 1];
    let mut left = vec![0.0; degree + 1];
    let mut right = vec![0.0; degree + 1];
    n[0] = 1.0;

    for j in 1..=degree {
        left[j] = t - knots[span + 1 - j];
        right[j] = knots[span + j] - t;
        let mut saved = 0.0;
        for r in 0..j {
            let denom = right[r + 1] + left[j - r];
            if denom.abs() < 1e-30 {
                continue;
            }
            let temp = n[r] / denom;
            n[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        n[j] = saved;
    }

    n
}

/// Basis functions and their first derivatives at `t`.
///
/// The derivative of `N(i,p)` is expressed through the degree `p - 1` basis:
/// `p / (u[i+p] - u[i]) * N(i,p-1) - p / (u[i+p+1] - u[i+1]) * N(i+1,p-1)`.
pub fn basis_with_derivatives(
    knots: &[f64],
    span: usize,
    degree: usize,
    t: f64,
) -> (Vec<f64>, Vec<f64>) {
    let values = basis_functions(knots, span, degree, t);
    let lower = basis_functions(knots, span, degree - 1, t);
    let p = degree as f64;
    let mut ders = vec![0.0; degree + 1];
    for (k, d) in ders.iter_mut().enumerate() {
        let i = span - degree + k;
        let mut acc = 0.0;
        if k >= 1 {
            let denom = knots[i + degree] - knots[i];
            if denom > 0.0 {
                acc += lower[k - 1] / denom;
            }
        }
        if k < degree {
            let denom = knots[i + degree + 1] - knots[i + 1];
            if denom > 0.0 {
                acc -= lower[k] / denom;
            }
        }
        *d = p * acc;
    }
    (values, ders)
}

fn validate_weights(weights: &Option<Vec<f64>>, n_points: usize) -> Result<(), NurbsError> {
    if let Some(w) = weights {
        if w.len() != n_points {
            return Err(NurbsError::knots(format!(
                "{} weights for {} control points",
                w.len(),
                n_points
            )));
        }
        if w.iter().any(|w| !w.is_finite() || *w <= 0.0) {
            return Err(NurbsError::knots("weights must be positive"));
        }
    }
    Ok(())
}

#[inline]
fn homogeneous(p: &Point3, w: f64) -> Vector4<f64> {
    Vector4::new(p.x * w, p.y * w, p.z * w, w)
}

/// Project a homogeneous point and its derivative back to 3D.
#[inline]
fn dehomogenize(h: &Vector4<f64>, dh: &Vector4<f64>) -> (Point3, Vec3) {
    let w = h.w;
    let p = Point3::new(h.x / w, h.y / w, h.z / w);
    let d = (dh.xyz() - p.coords * dh.w) / w;
    (p, d)
}

// =============================================================================
// B-spline curve
// =============================================================================

/// A B-spline curve in 3D, rational when weights are present.
#[derive(Debug, Clone, PartialEq)]
pub struct BSplineCurve {
    /// Control points in 3D.
    pub control_points: Vec<Point3>,
    /// Optional per-point weights.
    pub weights: Option<Vec<f64>>,
    /// Full knot sequence, `control_points.len() + degree + 1` values.
    pub knots: Vec<f64>,
    /// Degree; the order is one higher.
    pub degree: usize,
}

impl BSplineCurve {
    /// Create a B-spline curve, validating knots and weights.
    pub fn new(
        control_points: Vec<Point3>,
        weights: Option<Vec<f64>>,
        knots: Vec<f64>,
        degree: usize,
    ) -> Result<Self, NurbsError> {
        validate_knots(&knots, control_points.len(), degree)?;
        validate_weights(&weights, control_points.len())?;
        Ok(Self {
            control_points,
            weights,
            knots,
            degree,
        })
    }

    /// Create a clamped uniform non-rational B-spline on `[0, 1]`.
    pub fn clamped_uniform(control_points: Vec<Point3>, degree: usize) -> Result<Self, NurbsError> {
        let n = control_points.len();
        if n <= degree {
            return Err(NurbsError::knots("too few control points for degree"));
        }
        let m = n + degree + 1;
        let mut knots = vec![0.0; m];
        let n_internal = m - 2 * (degree + 1);
        for i in 0..=degree {
            knots[m - 1 - i] = 1.0;
        }
        for i in 1..=n_internal {
            knots[degree + i] = i as f64 / (n_internal + 1) as f64;
        }
        Self::new(control_points, None, knots, degree)
    }

    /// Whether the curve carries weights.
    pub fn is_rational(&self) -> bool {
        self.weights.is_some()
    }

    #[inline]
    fn weight(&self, i: usize) -> f64 {
        self.weights.as_ref().map_or(1.0, |w| w[i])
    }

    /// `(knots[degree], knots[n_points])`, where the basis functions sum to one.
    pub fn parameter_domain(&self) -> (f64, f64) {
        (
            self.knots[self.degree],
            self.knots[self.control_points.len()],
        )
    }

    /// Point at `t`, clamped into the domain.
    pub fn eval(&self, t: f64) -> Point3 {
        self.eval_with_derivative(t).0
    }

    /// First derivative at parameter `t`.
    pub fn derivative(&self, t: f64) -> Vec3 {
        self.eval_with_derivative(t).1
    }

    /// Point and first derivative at `t`, clamped to the domain.
    pub fn eval_with_derivative(&self, t: f64) -> (Point3, Vec3) {
        let n = self.control_points.len() - 1;
        let (t_min, t_max) = self.parameter_domain();
        let t = t.clamp(t_min, t_max);
        let span = find_span(&self.knots, n, self.degree, t);
        let (basis, ders) = basis_with_derivatives(&self.knots, span, self.degree, t);

        let mut h = Vector4::<f64>::zeros();
        let mut dh = Vector4::<f64>::zeros();
        for k in 0..=self.degree {
            let idx = span - self.degree + k;
            let cp = homogeneous(&self.control_points[idx], self.weight(idx));
            h += cp * basis[k];
            dh += cp * ders[k];
        }
        dehomogenize(&h, &dh)
    }
}

// =============================================================================
// B-spline surface
// =============================================================================

/// A tensor-product B-spline surface, rational when weights are present.
///
/// The control net is flattened with u varying fastest: point `(i, j)` lives at
/// `control_points[j * n_u + i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct BSplineSurface {
    /// Flattened control net, u fastest.
    pub control_points: Vec<Point3>,
    /// Optional weights, same layout as the control points.
    pub weights: Option<Vec<f64>>,
    /// Control net columns (u).
    pub n_u: usize,
    /// Control net rows (v).
    pub n_v: usize,
    /// u knots, `n_u + degree_u + 1` values.
    pub knots_u: Vec<f64>,
    /// v knots, `n_v + degree_v + 1` values.
    pub knots_v: Vec<f64>,
    /// Degree in u.
    pub degree_u: usize,
    /// Degree in v.
    pub degree_v: usize,
}

/// Point and first partial derivatives of a surface.
#[derive(Debug, Clone, Copy)]
pub struct SurfacePartials {
    /// Surface point.
    pub point: Point3,
    /// Derivative with respect to u.
    pub du: Vec3,
    /// Derivative with respect to v.
    pub dv: Vec3,
}

impl BSplineSurface {
    /// Create a B-spline surface, validating both knot vectors and weights.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        control_points: Vec<Point3>,
        weights: Option<Vec<f64>>,
        n_u: usize,
        n_v: usize,
        knots_u: Vec<f64>,
        knots_v: Vec<f64>,
        degree_u: usize,
        degree_v: usize,
    ) -> Result<Self, NurbsError> {
        if control_points.len() != n_u * n_v {
            return Err(NurbsError::knots(format!(
                "control grid has {} points, expected {} x {}",
                control_points.len(),
                n_u,
                n_v
            )));
        }
        validate_knots(&knots_u, n_u, degree_u)?;
        validate_knots(&knots_v, n_v, degree_v)?;
        validate_weights(&weights, control_points.len())?;
        Ok(Self {
            control_points,
            weights,
            n_u,
            n_v,
            knots_u,
            knots_v,
            degree_u,
            degree_v,
        })
    }

    /// Whether the surface carries weights.
    pub fn is_rational(&self) -> bool {
        self.weights.is_some()
    }

    #[inline]
    fn weighted_cp(&self, u_idx: usize, v_idx: usize) -> Vector4<f64> {
        let i = v_idx * self.n_u + u_idx;
        let w = self.weights.as_ref().map_or(1.0, |w| w[i]);
        homogeneous(&self.control_points[i], w)
    }

    /// `((u_min, u_max), (v_min, v_max))` over which the surface is defined.
    pub fn parameter_domain(&self) -> ((f64, f64), (f64, f64)) {
        (
            (self.knots_u[self.degree_u], self.knots_u[self.n_u]),
            (self.knots_v[self.degree_v], self.knots_v[self.n_v]),
        )
    }

    /// Evaluate the surface at `(u, v)`.
    pub fn eval(&self, u: f64, v: f64) -> Point3 {
        self.partials(u, v).point
    }

    /// Point and both first partial derivatives at `(u, v)`.
    pub fn partials(&self, u: f64, v: f64) -> SurfacePartials {
        let ((u_min, u_max), (v_min, v_max)) = self.parameter_domain();
        let u = u.clamp(u_min, u_max);
        let v = v.clamp(v_min, v_max);
        let span_u = find_span(&self.knots_u, self.n_u - 1, self.degree_u, u);
        let span_v = find_span(&self.knots_v, self.n_v - 1, self.degree_v, v);
        let (bu, dbu) = basis_with_derivatives(&self.knots_u, span_u, self.degree_u, u);
        let (bv, dbv) = basis_with_derivatives(&self.knots_v, span_v, self.degree_v, v);

        let mut h = Vector4::<f64>::zeros();
        let mut hu = Vector4::<f64>::zeros();
        let mut hv = Vector4::<f64>::zeros();
        for j in 0..=self.degree_v {
            let v_idx = span_v - self.degree_v + j;
            for i in 0..=self.degree_u {
                let u_idx = span_u - self.degree_u + i;
                let cp = self.weighted_cp(u_idx, v_idx);
                h += cp * (bu[i] * bv[j]);
                hu += cp * (dbu[i] * bv[j]);
                hv += cp * (bu[i] * dbv[j]);
            }
        }
        let (point, du) = dehomogenize(&h, &hu);
        let (_, dv) = dehomogenize(&h, &hv);
        SurfacePartials { point, du, dv }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn nurbs_circle(radius: f64) -> BSplineCurve {
        let w = std::f64::consts::FRAC_1_SQRT_2;
        let r = radius;
        let pts = vec![
            Point3::new(r, 0.0, 0.0),
            Point3::new(r, r, 0.0),
            Point3::new(0.0, r, 0.0),
            Point3::new(-r, r, 0.0),
            Point3::new(-r, 0.0, 0.0),
            Point3::new(-r, -r, 0.0),
            Point3::new(0.0, -r, 0.0),
            Point3::new(r, -r, 0.0),
            Point3::new(r, 0.0, 0.0),
        ];
        let weights = vec![1.0, w, 1.0, w, 1.0, w, 1.0, w, 1.0];
        let knots = vec![
            0.0, 0.0, 0.0, 0.25, 0.25, 0.5, 0.5, 0.75, 0.75, 1.0, 1.0, 1.0,
        ];
        BSplineCurve::new(pts, Some(weights), knots, 2).unwrap()
    }

    // ---- Knot utilities ----

    #[test]
    fn test_validate_knots_rejects_bad_vectors() {
        assert!(validate_knots(&[0.0, 0.0, 1.0, 1.0], 2, 1).is_ok());
        assert!(matches!(
            validate_knots(&[0.0, 0.0, 1.0], 2, 1),
            Err(NurbsError::DegenerateKnotVector(_))
        ));
        assert!(validate_knots(&[0.0, 1.0, 0.5, 1.0], 2, 1).is_err());
        assert!(validate_knots(&[0.0, 0.0, 0.0, 0.0], 2, 1).is_err());
        assert!(validate_knots(&[0.0, 1.0], 1, 0).is_err());
    }

    #[test]
    fn test_expand_knots() {
        let k = expand_knots(&[0.0, 0.5, 1.0], &[3, 1, 3], 7).unwrap();
        assert_eq!(k, vec![0.0, 0.0, 0.0, 0.5, 1.0, 1.0, 1.0]);
        assert!(expand_knots(&[0.0, 1.0], &[2], 2).is_err());
        assert!(expand_knots(&[0.0, 1.0], &[2, 2], 5).is_err());
        assert!(matches!(
            expand_knots(&[0.0, 1.0], &[usize::MAX, 2], 4),
            Err(NurbsError::DegenerateKnotVector(_))
        ));
        // a huge multiplicity is rejected before anything is allocated
        assert!(expand_knots(&[0.0, 1.0], &[200_000_000_000_000, 2], 4).is_err());
    }

    #[test]
    fn test_find_span() {
        let knots = [0.0, 0.0, 0.0, 0.0, 2.0, 3.0, 3.0, 3.0, 3.0];
        assert_eq!(find_span(&knots, 4, 3, 0.0), 3);
        assert_eq!(find_span(&knots, 4, 3, 1.999), 3);
        assert_eq!(find_span(&knots, 4, 3, 2.0), 4);
        assert_eq!(find_span(&knots, 4, 3, 3.0), 4);
    }

    #[test]
    fn test_basis_sums_to_one() {
        let knots = [0.0, 0.0, 0.0, 0.0, 0.3, 0.3, 0.8, 1.0, 1.0, 1.0, 1.0];
        let degree = 3;
        let n = 6;
        for i in 0..=20 {
            let t = i as f64 / 20.0;
            let span = find_span(&knots, n, degree, t);
            let (basis, ders) = basis_with_derivatives(&knots, span, degree, t);
            assert_relative_eq!(basis.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
            // derivatives of a partition of unity sum to zero
            assert_relative_eq!(ders.iter().sum::<f64>(), 0.0, epsilon = 1e-9);
        }
    }

    // ---- Curves ----

    #[test]
    fn test_bspline_line() {
        let pts = vec![Point3::new(1.0, 2.0, 3.0), Point3::new(1.0, 8.0, 3.0)];
        let curve = BSplineCurve::new(pts, None, vec![0.0, 0.0, 2.0, 2.0], 1).unwrap();
        assert_relative_eq!(curve.eval(1.0).y, 5.0, epsilon = 1e-12);
        assert_relative_eq!(curve.derivative(1.0), Vec3::new(0.0, 3.0, 0.0), epsilon = 1e-9);
        // derivative at the domain end uses the last span, not a one-sided difference
        assert_relative_eq!(curve.derivative(2.0), Vec3::new(0.0, 3.0, 0.0), epsilon = 1e-9);
    }

    #[test]
    fn test_bspline_quadratic_interpolates_ends() {
        let pts = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 2.0, 0.0),
            Point3::new(3.0, 2.0, 0.0),
            Point3::new(4.0, 0.0, 0.0),
        ];
        let knots = vec![0.0, 0.0, 0.0, 0.5, 1.0, 1.0, 1.0];
        let curve = BSplineCurve::new(pts, None, knots, 2).unwrap();
        assert_relative_eq!(curve.eval(0.0), Point3::origin(), epsilon = 1e-12);
        assert_relative_eq!(curve.eval(1.0), Point3::new(4.0, 0.0, 0.0), epsilon = 1e-12);
        assert!(curve.eval(0.5).y > 0.0);
    }

    #[test]
    fn test_curve_derivative_matches_finite_difference() {
        let pts = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 2.0, 1.0),
            Point3::new(3.0, 2.0, -1.0),
            Point3::new(4.0, 0.0, 0.0),
            Point3::new(5.0, 1.0, 2.0),
        ];
        let curve = BSplineCurve::clamped_uniform(pts, 3).unwrap();
        let h = 1e-6;
        for &t in &[0.1, 0.37, 0.5, 0.81] {
            let fd = (curve.eval(t + h) - curve.eval(t - h)) / (2.0 * h);
            assert_relative_eq!(curve.derivative(t), fd, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_rational_circle() {
        let circle = nurbs_circle(5.0);
        assert!(circle.is_rational());
        for i in 0..=20 {
            let t = i as f64 / 20.0;
            let (p, d) = circle.eval_with_derivative(t);
            assert_relative_eq!(p.coords.norm(), 5.0, epsilon = 1e-9);
            // tangent is perpendicular to the radius
            assert_relative_eq!(p.coords.dot(&d), 0.0, epsilon = 1e-6);
        }
        let quarter = circle.eval(0.25);
        assert_relative_eq!(quarter, Point3::new(0.0, 5.0, 0.0), epsilon = 1e-9);
    }

    #[test]
    fn test_weight_count_mismatch() {
        let pts = vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)];
        let err = BSplineCurve::new(pts, Some(vec![1.0]), vec![0.0, 0.0, 1.0, 1.0], 1);
        assert!(matches!(err, Err(NurbsError::DegenerateKnotVector(_))));
    }

    // ---- Surfaces ----

    fn bilinear() -> BSplineSurface {
        let pts = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
            Point3::new(0.0, 10.0, 0.0),
            Point3::new(10.0, 10.0, 0.0),
        ];
        let k = vec![0.0, 0.0, 1.0, 1.0];
        BSplineSurface::new(pts, None, 2, 2, k.clone(), k, 1, 1).unwrap()
    }

    #[test]
    fn test_bspline_surface_bilinear() {
        let surf = bilinear();
        assert_relative_eq!(surf.eval(0.5, 0.5), Point3::new(5.0, 5.0, 0.0), epsilon = 1e-12);
        let p = surf.partials(0.25, 0.75);
        assert_relative_eq!(p.du, Vec3::new(10.0, 0.0, 0.0), epsilon = 1e-9);
        assert_relative_eq!(p.dv, Vec3::new(0.0, 10.0, 0.0), epsilon = 1e-9);
    }

    #[test]
    fn test_bspline_surface_quadratic_partials() {
        // 3x3 grid bulging in z at the centre
        let mut pts = Vec::new();
        for j in 0..3 {
            for i in 0..3 {
                let z = if i == 1 && j == 1 { 4.0 } else { 0.0 };
                pts.push(Point3::new(i as f64 * 5.0, j as f64 * 5.0, z));
            }
        }
        let k = vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let surf = BSplineSurface::new(pts, None, 3, 3, k.clone(), k, 2, 2).unwrap();
        let h = 1e-6;
        for &(u, v) in &[(0.3, 0.4), (0.5, 0.5), (0.9, 0.1)] {
            let p = surf.partials(u, v);
            let fu = (surf.eval(u + h, v) - surf.eval(u - h, v)) / (2.0 * h);
            let fv = (surf.eval(u, v + h) - surf.eval(u, v - h)) / (2.0 * h);
            assert_relative_eq!(p.du, fu, epsilon = 1e-5);
            assert_relative_eq!(p.dv, fv, epsilon = 1e-5);
        }
        assert!(surf.eval(0.5, 0.5).z > 0.0);
    }

    #[test]
    fn test_unit_weights_match_polynomial() {
        let plain = bilinear();
        let mut rational = plain.clone();
        rational.weights = Some(vec![1.0; 4]);
        for &(u, v) in &[(0.1, 0.2), (0.7, 0.3)] {
            let a = plain.partials(u, v);
            let b = rational.partials(u, v);
            assert_relative_eq!(a.point, b.point, epsilon = 1e-12);
            assert_relative_eq!(a.du, b.du, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_surface_grid_mismatch() {
        let k = vec![0.0, 0.0, 1.0, 1.0];
        let err = BSplineSurface::new(vec![Point3::origin(); 3], None, 2, 2, k.clone(), k, 1, 1);
        assert!(err.is_err());
    }
}
