//! Load configuration.

use serde::{Deserialize, Serialize};
use steplook_math::Tolerance;
use steplook_tessellate::TessellationParams;

use crate::LoadError;

/// Knobs for one load.
///
/// Every field has a default, so a TOML fragment only needs the values it
/// changes:
///
/// ```
/// use steplook::LoadOptions;
///
/// let opts = LoadOptions::from_toml_str("chord_tolerance = 0.05").unwrap();
/// assert_eq!(opts.chord_tolerance, 0.05);
/// assert!(opts.parallel);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Maximum distance between the mesh and the true surface, model units.
    pub chord_tolerance: f64,
    /// Maximum normal turn across one triangle edge, radians.
    pub angular_tolerance: f64,
    /// Vertices closer than this are merged.
    pub weld_tolerance: f64,
    /// Refinement passes allowed per curved face.
    pub max_refinement_passes: u32,
    /// Triangle budget per face.
    pub max_triangles_per_face: usize,
    /// Use the rayon pool for edge and face tessellation.
    pub parallel: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        let p = TessellationParams::default();
        Self {
            chord_tolerance: p.chord_tolerance,
            angular_tolerance: p.angular_tolerance,
            weld_tolerance: p.weld_tolerance,
            max_refinement_passes: p.max_refinement_passes,
            max_triangles_per_face: p.max_triangles_per_face,
            parallel: p.parallel,
        }
    }
}

impl LoadOptions {
    /// Parse and validate a TOML fragment.
    pub fn from_toml_str(s: &str) -> Result<Self, LoadError> {
        let opts: Self = toml::from_str(s).map_err(|e| LoadError::Options(e.to_string()))?;
        opts.validate()?;
        Ok(opts)
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<(), LoadError> {
        let positive = |name: &str, v: f64| {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(LoadError::Options(format!("{name} must be positive, got {v}")))
            }
        };
        positive("chord_tolerance", self.chord_tolerance)?;
        positive("angular_tolerance", self.angular_tolerance)?;
        if self.angular_tolerance > std::f64::consts::PI {
            return Err(LoadError::Options(format!(
                "angular_tolerance must not exceed π, got {}",
                self.angular_tolerance
            )));
        }
        if !(self.weld_tolerance.is_finite() && self.weld_tolerance >= 0.0) {
            return Err(LoadError::Options(format!(
                "weld_tolerance must be non-negative, got {}",
                self.weld_tolerance
            )));
        }
        if self.max_triangles_per_face == 0 {
            return Err(LoadError::Options("max_triangles_per_face must be at least 1".into()));
        }
        Ok(())
    }

    /// Tessellator parameters.
    pub fn tessellation_params(&self) -> TessellationParams {
        TessellationParams {
            chord_tolerance: self.chord_tolerance,
            angular_tolerance: self.angular_tolerance,
            weld_tolerance: self.weld_tolerance,
            max_refinement_passes: self.max_refinement_passes,
            max_triangles_per_face: self.max_triangles_per_face,
            parallel: self.parallel,
        }
    }

    /// Tolerance used when checking that wires close.
    pub fn topology_tolerance(&self) -> Tolerance {
        Tolerance {
            linear: self.weld_tolerance.max(Tolerance::DEFAULT.linear),
            ..Tolerance::DEFAULT
        }
    }
}

impl From<LoadOptions> for TessellationParams {
    fn from(opts: LoadOptions) -> Self {
        opts.tessellation_params()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let o = LoadOptions::default();
        assert_eq!(o.chord_tolerance, 0.01);
        assert_eq!(o.angular_tolerance, 0.5);
        assert_eq!(o.weld_tolerance, 1e-6);
        assert_eq!(o.max_refinement_passes, 24);
        assert_eq!(o.max_triangles_per_face, 2_000_000);
        assert!(o.parallel);
        assert_eq!(o.tessellation_params(), TessellationParams::default());
    }

    #[test]
    fn test_partial_toml() {
        let o = LoadOptions::from_toml_str(
            r#"
            angular_tolerance = 0.25
            parallel = false
            "#,
        )
        .unwrap();
        assert_eq!(o.angular_tolerance, 0.25);
        assert!(!o.parallel);
        assert_eq!(o.chord_tolerance, 0.01);
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(LoadOptions::from_toml_str("").unwrap(), LoadOptions::default());
    }

    #[test]
    fn test_rejects_bad_values() {
        for src in [
            "chord_tolerance = 0.0",
            "chord_tolerance = -1.0",
            "angular_tolerance = 4.0",
            "weld_tolerance = -0.1",
            "max_triangles_per_face = 0",
        ] {
            let err = LoadOptions::from_toml_str(src).unwrap_err();
            assert!(matches!(err, LoadError::Options(_)), "{src}");
        }
    }

    #[test]
    fn test_rejects_malformed_toml() {
        assert!(matches!(
            LoadOptions::from_toml_str("chord_tolerance = \"fine\""),
            Err(LoadError::Options(_))
        ));
    }

    #[test]
    fn test_round_trip_through_toml() {
        let o = LoadOptions {
            chord_tolerance: 0.002,
            ..LoadOptions::default()
        };
        let s = toml::to_string(&o).unwrap();
        assert_eq!(LoadOptions::from_toml_str(&s).unwrap(), o);
    }
}
