//! JSONL writers for build artifacts.
//!
//! One compact JSON object per line, grep-friendly and streamable. The
//! record shapes are the wire schemas from the model layer; avoid breaking
//! changes unless versioned explicitly.

use crate::errors::BuildResult;
use crate::model::node::NodeExport;
use crate::model::relationship::RelationshipExport;
use std::io::Write;
use tracing::info;

/// Write node records as JSON Lines.
pub fn write_nodes_jsonl<W: Write>(writer: &mut W, nodes: &[NodeExport]) -> BuildResult<()> {
    for node in nodes {
        serde_json::to_writer(&mut *writer, node)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    info!(count = nodes.len(), "jsonl: wrote node records");
    Ok(())
}

/// Write relationship records as JSON Lines.
pub fn write_relationships_jsonl<W: Write>(
    writer: &mut W,
    relationships: &[RelationshipExport],
) -> BuildResult<()> {
    for rel in relationships {
        serde_json::to_writer(&mut *writer, rel)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    info!(count = relationships.len(), "jsonl: wrote relationship records");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_hierarchy;
    use crate::config::BuildConfig;
    use crate::model::environment::{EnvironmentLayer, GraphEnvironment};
    use std::fs;

    #[test]
    fn one_record_per_line_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.py"), "def f():\n    pass\n").unwrap();
        let cfg = BuildConfig::new(
            dir.path(),
            GraphEnvironment::new("e", None, EnvironmentLayer::Base),
        );
        let build = build_hierarchy(&cfg).unwrap().finish();

        let mut nodes_buf = Vec::new();
        write_nodes_jsonl(&mut nodes_buf, &build.nodes).unwrap();
        let lines: Vec<&str> = std::str::from_utf8(&nodes_buf)
            .unwrap()
            .lines()
            .collect();
        assert_eq!(lines.len(), build.nodes.len());
        let parsed: NodeExport = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(&parsed, &build.nodes[0]);

        let mut rel_buf = Vec::new();
        write_relationships_jsonl(&mut rel_buf, &build.relationships).unwrap();
        assert_eq!(
            std::str::from_utf8(&rel_buf).unwrap().lines().count(),
            build.relationships.len()
        );
    }
}
