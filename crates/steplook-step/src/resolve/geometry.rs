//! Points, placements, curves and surfaces.

use super::{EntityArgs, RecordArgs, Resolver};
use crate::error::ResolveError;
use crate::graph::{CurveId, CurveNode, SurfaceId, SurfaceNode};
use crate::parser::StepEntity;
use steplook_geom::{BSplineCurve, BSplineSurface, Circle, Curve, Ellipse, GeometryError, Line, Surface};
use steplook_math::{Dir3, Frame, Point3, Vec3};
use steplook_nurbs::expand_knots;

impl Resolver<'_> {
    /// CARTESIAN_POINT. Two-dimensional points get `z = 0`.
    pub(crate) fn resolve_point(&mut self, id: u64) -> Result<Point3, ResolveError> {
        if let Some(p) = self.points.get(&id) {
            return Ok(*p);
        }
        let entity = self.require(id)?;
        if entity.type_name() != "CARTESIAN_POINT" {
            return Err(Self::wrong_kind(entity, "CARTESIAN_POINT"));
        }
        let coords = entity.real_list(1)?;
        let p = match coords.as_slice() {
            [x, y, z, ..] => Point3::new(*x, *y, *z),
            [x, y] => Point3::new(*x, *y, 0.0),
            _ => {
                return Err(ResolveError::type_mismatch(
                    id,
                    "2 or 3 coordinates",
                    format!("{} coordinates", coords.len()),
                ))
            }
        };
        self.points.insert(id, p);
        Ok(p)
    }

    /// DIRECTION, normalized.
    pub(crate) fn resolve_direction(&mut self, id: u64) -> Result<Dir3, ResolveError> {
        let entity = self.require(id)?;
        if entity.type_name() != "DIRECTION" {
            return Err(Self::wrong_kind(entity, "DIRECTION"));
        }
        let c = entity.real_list(1)?;
        let v = match c.as_slice() {
            [x, y, z, ..] => Vec3::new(*x, *y, *z),
            [x, y] => Vec3::new(*x, *y, 0.0),
            _ => {
                return Err(ResolveError::type_mismatch(
                    id,
                    "2 or 3 direction ratios",
                    format!("{} ratios", c.len()),
                ))
            }
        };
        if !(v.norm() > 1e-15) {
            return Err(ResolveError::geometry(
                id,
                GeometryError::Invalid("zero-length direction".into()),
            ));
        }
        Ok(Dir3::new_normalize(v))
    }

    /// VECTOR: direction scaled by magnitude.
    fn resolve_vector(&mut self, id: u64) -> Result<Vec3, ResolveError> {
        let entity = self.require(id)?;
        if entity.type_name() != "VECTOR" {
            return Err(Self::wrong_kind(entity, "VECTOR"));
        }
        let dir = self.enter(id, |r| r.resolve_direction(entity.entity_ref(1)?))?;
        let magnitude = entity.real(2)?;
        Ok(dir.as_ref() * magnitude)
    }

    /// AXIS2_PLACEMENT_3D or AXIS1_PLACEMENT as an orthonormal frame.
    pub(crate) fn resolve_placement(&mut self, id: u64) -> Result<Frame, ResolveError> {
        let entity = self.require(id)?;
        let has_ref = match entity.type_name() {
            "AXIS2_PLACEMENT_3D" => true,
            "AXIS1_PLACEMENT" => false,
            _ => return Err(Self::wrong_kind(entity, "AXIS2_PLACEMENT_3D")),
        };
        self.enter(id, |r| {
            let location = r.resolve_point(entity.entity_ref(1)?)?;
            let axis = match entity.optional_ref(2)? {
                Some(a) => r.resolve_direction(a)?,
                None => Vec3::z_axis(),
            };
            let ref_direction = match entity.optional_ref(3)? {
                Some(d) if has_ref => Some(r.resolve_direction(d)?.into_inner()),
                _ => None,
            };
            Ok(Frame::new(location, axis, ref_direction))
        })
    }

    /// Any mapped curve. Surface-bound wrappers reduce to their 3D curve.
    pub(crate) fn resolve_curve(&mut self, id: u64) -> Result<CurveId, ResolveError> {
        if let Some(c) = self.curves.get(&id) {
            return Ok(*c);
        }
        let entity = self.require(id)?;
        let curve_id = self.enter(id, |r| match entity.type_name() {
            "SURFACE_CURVE" | "SEAM_CURVE" | "INTERSECTION_CURVE" | "TRIMMED_CURVE" => {
                r.resolve_curve(entity.entity_ref(1)?)
            }
            _ => {
                let curve = r.build_curve(entity)?;
                let curve_id = CurveId(r.graph.curves.len() as u32);
                r.graph.curves.push(CurveNode {
                    step_id: id,
                    curve,
                });
                Ok(curve_id)
            }
        })?;
        self.curves.insert(id, curve_id);
        Ok(curve_id)
    }

    fn build_curve(&mut self, entity: &StepEntity) -> Result<Curve, ResolveError> {
        let id = entity.id;
        match entity.type_name() {
            "LINE" => {
                let origin = self.resolve_point(entity.entity_ref(1)?)?;
                let direction = self.resolve_vector(entity.entity_ref(2)?)?;
                Ok(Curve::Line(Line { origin, direction }))
            }
            "CIRCLE" => {
                let frame = self.resolve_placement(entity.entity_ref(1)?)?;
                let circle = Circle::new(frame, entity.real(2)?)
                    .map_err(|e| ResolveError::geometry(id, e))?;
                Ok(Curve::Circle(circle))
            }
            "ELLIPSE" => {
                let frame = self.resolve_placement(entity.entity_ref(1)?)?;
                let ellipse = Ellipse::new(frame, entity.real(2)?, entity.real(3)?)
                    .map_err(|e| ResolveError::geometry(id, e))?;
                Ok(Curve::Ellipse(ellipse))
            }
            "B_SPLINE_CURVE_WITH_KNOTS" => self.build_bspline_curve(entity).map(Curve::BSpline),
            _ => Err(Self::wrong_kind(entity, "curve")),
        }
    }

    /// Simple `B_SPLINE_CURVE_WITH_KNOTS` or a complex rational instance.
    fn build_bspline_curve(&mut self, entity: &StepEntity) -> Result<BSplineCurve, ResolveError> {
        let id = entity.id;
        let (base, knots, weights) = if entity.complex {
            let base = entity
                .record("B_SPLINE_CURVE")
                .ok_or_else(|| ResolveError::type_mismatch(id, "B_SPLINE_CURVE record", "none"))?;
            let knots = entity
                .record("B_SPLINE_CURVE_WITH_KNOTS")
                .ok_or_else(|| {
                    ResolveError::type_mismatch(id, "B_SPLINE_CURVE_WITH_KNOTS record", "none")
                })?;
            let weights = match entity.record("RATIONAL_B_SPLINE_CURVE") {
                Some(rec) => Some(RecordArgs::new(id, rec).real_list(0)?),
                None => None,
            };
            (RecordArgs::new(id, base), RecordArgs::new(id, knots), weights)
        } else {
            // name, degree, points, form, closed, self_intersect | mults, knots, spec
            (RecordArgs::slice(entity, 1, 6), RecordArgs::slice(entity, 6, 9), None)
        };

        let degree = base.count(0)?;
        let mut points = Vec::new();
        for p in base.entity_ref_list(1)? {
            points.push(self.enter(id, |r| r.resolve_point(p))?);
        }
        let mults = knots.count_list(0)?;
        let values = knots.real_list(1)?;
        let expected = knot_count(id, points.len(), degree)?;
        let knot_vector = expand_knots(&values, &mults, expected)
            .map_err(|e| ResolveError::geometry(id, e.into()))?;
        BSplineCurve::new(points, weights, knot_vector, degree)
            .map_err(|e| ResolveError::geometry(id, e.into()))
    }

    /// Any mapped surface.
    pub(crate) fn resolve_surface(&mut self, id: u64) -> Result<SurfaceId, ResolveError> {
        if let Some(s) = self.surfaces.get(&id) {
            return Ok(*s);
        }
        let entity = self.require(id)?;
        let surface = self.enter(id, |r| r.build_surface(entity))?;
        let surface_id = SurfaceId(self.graph.surfaces.len() as u32);
        self.graph.surfaces.push(SurfaceNode {
            step_id: id,
            surface,
        });
        self.surfaces.insert(id, surface_id);
        Ok(surface_id)
    }

    fn build_surface(&mut self, entity: &StepEntity) -> Result<Surface, ResolveError> {
        let id = entity.id;
        let geom = |e: GeometryError| ResolveError::geometry(id, e);
        match entity.type_name() {
            "PLANE" => {
                let frame = self.resolve_placement(entity.entity_ref(1)?)?;
                Ok(Surface::Plane { frame })
            }
            "CYLINDRICAL_SURFACE" => {
                let frame = self.resolve_placement(entity.entity_ref(1)?)?;
                let radius = Surface::checked_radius(entity.real(2)?, "cylinder").map_err(geom)?;
                Ok(Surface::Cylinder { frame, radius })
            }
            "CONICAL_SURFACE" => {
                let frame = self.resolve_placement(entity.entity_ref(1)?)?;
                let radius = entity.real(2)?;
                let semi_angle = entity.real(3)? * self.angle_factor;
                Surface::cone(frame, radius, semi_angle).map_err(geom)
            }
            "SPHERICAL_SURFACE" => {
                let frame = self.resolve_placement(entity.entity_ref(1)?)?;
                let radius = Surface::checked_radius(entity.real(2)?, "sphere").map_err(geom)?;
                Ok(Surface::Sphere { frame, radius })
            }
            "TOROIDAL_SURFACE" => {
                let frame = self.resolve_placement(entity.entity_ref(1)?)?;
                let major_radius =
                    Surface::checked_radius(entity.real(2)?, "torus major").map_err(geom)?;
                let minor_radius =
                    Surface::checked_radius(entity.real(3)?, "torus minor").map_err(geom)?;
                Ok(Surface::Torus {
                    frame,
                    major_radius,
                    minor_radius,
                })
            }
            "B_SPLINE_SURFACE_WITH_KNOTS" => self
                .build_bspline_surface(entity)
                .map(|s| Surface::BSpline(Box::new(s))),
            _ => Err(Self::wrong_kind(entity, "surface")),
        }
    }

    /// Simple `B_SPLINE_SURFACE_WITH_KNOTS` or a complex rational instance.
    ///
    /// STEP lists control points as rows of constant `u` index; the patch
    /// stores them `v`-major (`v_idx * n_u + u_idx`).
    fn build_bspline_surface(
        &mut self,
        entity: &StepEntity,
    ) -> Result<BSplineSurface, ResolveError> {
        let id = entity.id;
        let (base, knots, weight_rows) = if entity.complex {
            let base = entity.record("B_SPLINE_SURFACE").ok_or_else(|| {
                ResolveError::type_mismatch(id, "B_SPLINE_SURFACE record", "none")
            })?;
            let knots = entity
                .record("B_SPLINE_SURFACE_WITH_KNOTS")
                .ok_or_else(|| {
                    ResolveError::type_mismatch(id, "B_SPLINE_SURFACE_WITH_KNOTS record", "none")
                })?;
            let weights = match entity.record("RATIONAL_B_SPLINE_SURFACE") {
                Some(rec) => {
                    let rec = RecordArgs::new(id, rec);
                    let mut rows = Vec::new();
                    for row in rec.list(0)? {
                        let row = row.as_list().ok_or_else(|| rec.mismatch(0, "list of weight rows"))?;
                        let values: Option<Vec<f64>> = row.iter().map(|w| w.as_real()).collect();
                        rows.push(values.ok_or_else(|| rec.mismatch(0, "real weights"))?);
                    }
                    Some(rows)
                }
                None => None,
            };
            (RecordArgs::new(id, base), RecordArgs::new(id, knots), weights)
        } else {
            // name, u_deg, v_deg, points, form, u_closed, v_closed, self_intersect
            // | u_mults, v_mults, u_knots, v_knots, spec
            (RecordArgs::slice(entity, 1, 8), RecordArgs::slice(entity, 8, 13), None)
        };

        let degree_u = base.count(0)?;
        let degree_v = base.count(1)?;
        let rows = base.list(2)?;
        let n_u = rows.len();
        let n_v = rows.first().and_then(|r| r.as_list()).map_or(0, |r| r.len());

        if rows.iter().any(|r| r.as_list().map_or(true, |r| r.len() != n_v)) {
            return Err(base.mismatch(2, "rectangular grid of points"));
        }
        let mut grid = vec![Point3::origin(); n_u * n_v];
        for (i, row) in rows.iter().enumerate() {
            let row = row.as_list().unwrap_or_default();
            for (j, p) in row.iter().enumerate() {
                let pid = p
                    .as_entity_ref()
                    .ok_or_else(|| base.mismatch(2, "grid of point references"))?;
                grid[j * n_u + i] = self.enter(id, |r| r.resolve_point(pid))?;
            }
        }

        let weights = match weight_rows {
            Some(w) => {
                if w.len() != n_u || w.iter().any(|r| r.len() != n_v) {
                    return Err(ResolveError::geometry(
                        id,
                        GeometryError::DegenerateKnotVector(format!(
                            "weight grid does not match {n_u} x {n_v} control points"
                        )),
                    ));
                }
                let mut flat = vec![0.0; n_u * n_v];
                for (i, row) in w.iter().enumerate() {
                    for (j, wt) in row.iter().enumerate() {
                        flat[j * n_u + i] = *wt;
                    }
                }
                Some(flat)
            }
            None => None,
        };

        let geom = |e: steplook_nurbs::NurbsError| ResolveError::geometry(id, e.into());
        let expected_u = knot_count(id, n_u, degree_u)?;
        let expected_v = knot_count(id, n_v, degree_v)?;
        let knots_u = expand_knots(&knots.real_list(2)?, &knots.count_list(0)?, expected_u).map_err(geom)?;
        let knots_v = expand_knots(&knots.real_list(3)?, &knots.count_list(1)?, expected_v).map_err(geom)?;
        BSplineSurface::new(grid, weights, n_u, n_v, knots_u, knots_v, degree_u, degree_v)
            .map_err(geom)
    }
}

/// Knot vector length for `n_points` control points of `degree`.
fn knot_count(id: u64, n_points: usize, degree: usize) -> Result<usize, ResolveError> {
    n_points
        .checked_add(degree)
        .and_then(|n| n.checked_add(1))
        .ok_or_else(|| {
            ResolveError::geometry(id, GeometryError::DegenerateKnotVector(format!("degree {degree} is out of range")))
        })
}
