//! Entity resolution: raw Part 21 instances to a typed [`EntityGraph`].
//!
//! Resolution starts from the file's roots (solids, then surface models,
//! then loose shells) and follows references on demand. Each resolved
//! instance is memoized by STEP id, so shared vertices and edges become
//! shared arena nodes and are never expanded twice. Descriptive entities
//! (products, contexts, styles) are never reached and never inspected.

mod geometry;
mod topology;

use crate::error::ResolveError;
use crate::graph::{
    CurveId, EdgeId, EntityGraph, FaceId, LoopId, ShellId, SurfaceId, VertexId,
};
use crate::parser::{Record, StepEntity, StepFile, StepValue};
use log::{debug, warn};
use rustc_hash::{FxHashMap, FxHashSet};
use steplook_math::Point3;

/// Maximum nesting of references followed before giving up.
///
/// Well-formed B-reps bottom out in literals after about ten hops
/// (solid, shell, face, bound, loop, oriented edge, edge, vertex, point).
pub const MAX_DEPTH: usize = 64;

/// Resolve every root of a parsed file into a typed graph.
pub fn resolve(file: &StepFile) -> Result<EntityGraph, ResolveError> {
    let mut resolver = Resolver::new(file);
    resolver.resolve_roots()?;
    Ok(resolver.finish())
}

/// Typed view over the arguments of one record.
///
/// Accessors fail with [`ResolveError::TypeMismatch`] naming the entity,
/// the argument position and the kind that was found instead.
pub trait EntityArgs {
    /// Owning entity id.
    fn id(&self) -> u64;

    /// Record type name.
    fn type_tag(&self) -> &str;

    /// Argument values.
    fn values(&self) -> &[StepValue];

    /// Argument at `idx`, or a mismatch error when absent.
    fn arg(&self, idx: usize, expected: &str) -> Result<&StepValue, ResolveError> {
        self.values().get(idx).ok_or_else(|| {
            ResolveError::type_mismatch(
                self.id(),
                format!("{expected} at argument {idx} of {}", self.type_tag()),
                "missing argument",
            )
        })
    }

    /// Mismatch error for the argument at `idx`.
    fn mismatch(&self, idx: usize, expected: &str) -> ResolveError {
        let actual = self
            .values()
            .get(idx)
            .map(StepValue::kind_name)
            .unwrap_or("missing argument");
        ResolveError::type_mismatch(
            self.id(),
            format!("{expected} at argument {idx} of {}", self.type_tag()),
            actual,
        )
    }

    /// Get a required real argument at index.
    fn real(&self, idx: usize) -> Result<f64, ResolveError> {
        self.arg(idx, "real")?
            .as_real()
            .ok_or_else(|| self.mismatch(idx, "real"))
    }

    /// Get a required non-negative integer argument at index.
    fn count(&self, idx: usize) -> Result<usize, ResolveError> {
        self.arg(idx, "integer")?
            .as_integer()
            .and_then(|v| usize::try_from(v).ok())
            .ok_or_else(|| self.mismatch(idx, "non-negative integer"))
    }

    /// Get a required boolean (`.T.`/`.F.`) argument at index.
    fn boolean(&self, idx: usize) -> Result<bool, ResolveError> {
        self.arg(idx, "boolean")?
            .as_bool()
            .ok_or_else(|| self.mismatch(idx, "boolean"))
    }

    /// Get a required entity reference at index.
    fn entity_ref(&self, idx: usize) -> Result<u64, ResolveError> {
        self.arg(idx, "reference")?
            .as_entity_ref()
            .ok_or_else(|| self.mismatch(idx, "reference"))
    }

    /// Get an optional entity reference (`$` gives `None`).
    fn optional_ref(&self, idx: usize) -> Result<Option<u64>, ResolveError> {
        match self.values().get(idx) {
            None | Some(StepValue::Null) => Ok(None),
            Some(v) => v
                .as_entity_ref()
                .map(Some)
                .ok_or_else(|| self.mismatch(idx, "reference or $")),
        }
    }

    /// Get a required list argument at index.
    fn list(&self, idx: usize) -> Result<&[StepValue], ResolveError> {
        self.arg(idx, "list")?
            .as_list()
            .ok_or_else(|| self.mismatch(idx, "list"))
    }

    /// Get a list of reals at index.
    fn real_list(&self, idx: usize) -> Result<Vec<f64>, ResolveError> {
        self.list(idx)?
            .iter()
            .map(|v| v.as_real().ok_or_else(|| self.mismatch(idx, "list of reals")))
            .collect()
    }

    /// Get a list of non-negative integers at index.
    fn count_list(&self, idx: usize) -> Result<Vec<usize>, ResolveError> {
        self.list(idx)?
            .iter()
            .map(|v| {
                v.as_integer()
                    .and_then(|i| usize::try_from(i).ok())
                    .ok_or_else(|| self.mismatch(idx, "list of non-negative integers"))
            })
            .collect()
    }

    /// Get a list of entity references at index.
    fn entity_ref_list(&self, idx: usize) -> Result<Vec<u64>, ResolveError> {
        self.list(idx)?
            .iter()
            .map(|v| {
                v.as_entity_ref()
                    .ok_or_else(|| self.mismatch(idx, "list of references"))
            })
            .collect()
    }
}

impl EntityArgs for StepEntity {
    fn id(&self) -> u64 {
        self.id
    }

    fn type_tag(&self) -> &str {
        self.type_name()
    }

    fn values(&self) -> &[StepValue] {
        self.args()
    }
}

/// One record of a complex instance, viewed with its owner's id.
///
/// Also used for the tail of a simple instance's arguments, so simple and
/// complex B-splines share one reader.
#[derive(Debug, Clone, Copy)]
pub struct RecordArgs<'a> {
    id: u64,
    type_tag: &'a str,
    values: &'a [StepValue],
}

impl<'a> RecordArgs<'a> {
    /// View a record of entity `id`.
    pub fn new(id: u64, record: &'a Record) -> Self {
        Self {
            id,
            type_tag: &record.type_name,
            values: &record.args,
        }
    }

    /// View a slice of an entity's primary arguments.
    pub fn slice(entity: &'a StepEntity, from: usize, to: usize) -> Self {
        let args = entity.args();
        let to = to.min(args.len());
        let from = from.min(to);
        Self {
            id: entity.id,
            type_tag: entity.type_name(),
            values: &args[from..to],
        }
    }
}

impl EntityArgs for RecordArgs<'_> {
    fn id(&self) -> u64 {
        self.id
    }

    fn type_tag(&self) -> &str {
        self.type_tag
    }

    fn values(&self) -> &[StepValue] {
        self.values
    }
}

/// Memoizing resolver over one parsed file.
pub struct Resolver<'a> {
    file: &'a StepFile,
    graph: EntityGraph,
    depth: usize,
    angle_factor: f64,
    points: FxHashMap<u64, Point3>,
    curves: FxHashMap<u64, CurveId>,
    surfaces: FxHashMap<u64, SurfaceId>,
    vertices: FxHashMap<u64, VertexId>,
    edges: FxHashMap<u64, EdgeId>,
    loops: FxHashMap<u64, LoopId>,
    faces: FxHashMap<u64, FaceId>,
    shells: FxHashMap<u64, ShellId>,
}

impl<'a> Resolver<'a> {
    /// Create a resolver for `file`.
    pub fn new(file: &'a StepFile) -> Self {
        let angle_factor = plane_angle_factor(file);
        if angle_factor != 1.0 {
            debug!("plane angles converted by factor {angle_factor}");
        }
        Self {
            file,
            graph: EntityGraph::default(),
            depth: 0,
            angle_factor,
            points: FxHashMap::default(),
            curves: FxHashMap::default(),
            surfaces: FxHashMap::default(),
            vertices: FxHashMap::default(),
            edges: FxHashMap::default(),
            loops: FxHashMap::default(),
            faces: FxHashMap::default(),
            shells: FxHashMap::default(),
        }
    }

    /// Take the finished graph.
    pub fn finish(self) -> EntityGraph {
        self.graph
    }

    /// Radians per unit of the file's plane angles.
    pub fn angle_factor(&self) -> f64 {
        self.angle_factor
    }

    /// Look up an entity, failing on dangling references.
    fn require(&self, id: u64) -> Result<&'a StepEntity, ResolveError> {
        self.file
            .get(id)
            .ok_or(ResolveError::MissingEntity { id })
    }

    /// Run `f` one reference level deeper, failing past [`MAX_DEPTH`].
    fn enter<T>(
        &mut self,
        id: u64,
        f: impl FnOnce(&mut Self) -> Result<T, ResolveError>,
    ) -> Result<T, ResolveError> {
        if self.depth >= MAX_DEPTH {
            return Err(ResolveError::CyclicDependency { id });
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Error for an entity found where another kind was required.
    ///
    /// Tags outside the mapped schema are unsupported; mapped tags in the
    /// wrong slot are a type mismatch.
    fn wrong_kind(entity: &StepEntity, expected: &str) -> ResolveError {
        if entity.is_recognized() {
            ResolveError::type_mismatch(entity.id, expected, entity.type_name())
        } else {
            ResolveError::unsupported(entity.id, entity.type_name())
        }
    }

    /// Resolve solids, falling back to surface models and then loose shells.
    pub fn resolve_roots(&mut self) -> Result<(), ResolveError> {
        let file = self.file;
        let mut solid_ids: Vec<u64> = file
            .entities_of_type("MANIFOLD_SOLID_BREP")
            .into_iter()
            .chain(file.entities_of_type("BREP_WITH_VOIDS"))
            .map(|e| e.id)
            .collect();
        solid_ids.sort_unstable();
        for id in solid_ids {
            self.resolve_solid(id)?;
        }

        if self.graph.solids.is_empty() {
            let mut seen = FxHashSet::default();
            for model in file.entities_of_type("SHELL_BASED_SURFACE_MODEL") {
                for shell_id in model.entity_ref_list(1)? {
                    let shell = self.resolve_shell(shell_id)?;
                    if seen.insert(shell) {
                        self.graph.free_shells.push(shell);
                    }
                }
            }
        }

        if self.graph.solids.is_empty() && self.graph.free_shells.is_empty() {
            let mut shell_ids: Vec<u64> = file
                .entities_of_type("CLOSED_SHELL")
                .into_iter()
                .chain(file.entities_of_type("OPEN_SHELL"))
                .map(|e| e.id)
                .collect();
            shell_ids.sort_unstable();
            if !shell_ids.is_empty() {
                warn!("no solids or surface models; using {} loose shells", shell_ids.len());
            }
            for id in shell_ids {
                let shell = self.resolve_shell(id)?;
                self.graph.free_shells.push(shell);
            }
        }

        let skipped = file
            .entities
            .values()
            .filter(|e| !e.is_recognized())
            .count();
        debug!(
            "resolved {} solids, {} shells, {} faces, {} edges ({} unrecognized entities not visited)",
            self.graph.solids.len(),
            self.graph.shells.len(),
            self.graph.faces.len(),
            self.graph.edges.len(),
            skipped
        );
        Ok(())
    }
}

/// Plane-angle conversion factor declared by the file's unit context.
///
/// Files authored in degrees carry a complex `CONVERSION_BASED_UNIT` /
/// `PLANE_ANGLE_UNIT` instance whose factor is a measure in radians.
fn plane_angle_factor(file: &StepFile) -> f64 {
    for unit in file.entities_with_record("PLANE_ANGLE_UNIT") {
        let Some(conv) = unit.record("CONVERSION_BASED_UNIT") else {
            continue;
        };
        let factor = conv
            .args
            .get(1)
            .and_then(StepValue::as_entity_ref)
            .and_then(|id| file.get(id))
            .and_then(|measure| measure.args().first())
            .and_then(StepValue::as_real);
        if let Some(f) = factor.filter(|f| f.is_finite() && *f > 0.0) {
            return f;
        }
        let named_degree = conv
            .args
            .first()
            .and_then(StepValue::as_string)
            .map(|n| n.eq_ignore_ascii_case("DEGREE") || n.eq_ignore_ascii_case("DEGREES"))
            .unwrap_or(false);
        if named_degree {
            return std::f64::consts::PI / 180.0;
        }
    }
    1.0
}
