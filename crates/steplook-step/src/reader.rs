//! Convenience entry points: path or bytes to a resolved entity graph.

use std::path::Path;

use log::debug;

use crate::error::StepError;
use crate::graph::EntityGraph;
use crate::parser::Parser;
use crate::resolve::resolve;

/// Read a STEP file from a path and resolve it.
pub fn read_step(path: impl AsRef<Path>) -> Result<EntityGraph, StepError> {
    let data = std::fs::read(path)?;
    read_step_from_buffer(&data)
}

/// Parse and resolve STEP file contents.
pub fn read_step_from_buffer(data: &[u8]) -> Result<EntityGraph, StepError> {
    let file = Parser::parse(data)?;
    debug!(
        "parsed {} entities (schema {})",
        file.len(),
        file.schema_name().unwrap_or("unknown")
    );
    Ok(resolve(&file)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResolveError;
    use crate::graph::{LoopKind, Roots};

    const CUBE: &str = include_str!("../../../testdata/cube.step");
    const CYLINDER: &str = include_str!("../../../testdata/cylinder.step");

    #[test]
    fn test_read_cube() {
        let graph = read_step_from_buffer(CUBE.as_bytes()).unwrap();
        assert_eq!(graph.roots(), Roots::Solids(vec![0]));
        assert_eq!(graph.solids.len(), 1);
        assert_eq!(graph.shells.len(), 1);
        assert_eq!(graph.faces.len(), 6);
        assert_eq!(graph.edges.len(), 12);
        assert_eq!(graph.vertices.len(), 8);
        assert_eq!(graph.surfaces.len(), 6);
        let face_ids: Vec<u64> = graph.faces.iter().map(|f| f.step_id).collect();
        assert_eq!(face_ids, vec![170, 171, 172, 173, 174, 175]);
    }

    #[test]
    fn test_read_cylinder_seam() {
        let graph = read_step_from_buffer(CYLINDER.as_bytes()).unwrap();
        assert_eq!(graph.faces.len(), 3);
        let lateral = &graph.faces[0];
        let LoopKind::Edges(edges) = &graph.edge_loop(lateral.bounds[0].loop_id).kind else {
            panic!("expected an edge loop");
        };
        assert_eq!(edges.len(), 4);
        // seam edge used in both directions
        assert_eq!(edges[1].edge, edges[3].edge);
        assert_ne!(edges[1].orientation, edges[3].orientation);
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_step("/nonexistent/dir/part.step").unwrap_err();
        assert!(matches!(err, StepError::Io(_)));
    }

    #[test]
    fn test_parse_error_propagates() {
        let truncated = &CUBE[..CUBE.find("ENDSEC;\nEND-ISO").unwrap()];
        let err = read_step_from_buffer(truncated.as_bytes()).unwrap_err();
        match err {
            StepError::Parse(e) => assert!(e.reason.contains("ENDSEC")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_resolve_error_propagates() {
        let broken = CUBE.replace("#40 = PLANE('', #30);", "#40 = PLANE('', #999);");
        let err = read_step_from_buffer(broken.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            StepError::Resolve(ResolveError::MissingEntity { id: 999 })
        ));
    }
}
