//! High-level orchestration for the hierarchy phase of a build.
//!
//! `build_hierarchy` runs the walk → parse → extract pipeline and returns
//! everything the reference pass needs: the assembled graph, the definition
//! sites in DFS emission order, the shared parse cache, and accumulated
//! warnings. Callers that set `only_hierarchy` stop here and export.

use crate::config::BuildConfig;
use crate::errors::BuildResult;
use crate::graph::assembler::GraphAssembler;
use crate::hierarchy::{build_file_subtree, emit_file_and_parents, emit_root, DefinitionSite};
use crate::model::node::NodeExport;
use crate::model::path::NodePath;
use crate::model::relationship::RelationshipExport;
use crate::model::warning::{Warning, WarningKind};
use crate::parse::{ParseCache, ParserPool};
use crate::walk::iter_files;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

/// Everything the hierarchy phase produced.
pub struct HierarchyBuild {
    pub root: PathBuf,
    pub assembler: GraphAssembler,
    /// Captured definitions in DFS, lexicographic-sibling emission order.
    pub definitions: Vec<DefinitionSite>,
    pub cache: ParseCache,
    pub warnings: Vec<Warning>,
}

impl HierarchyBuild {
    /// Close the build and produce the exported graph.
    pub fn finish(self) -> GraphBuild {
        let (nodes, relationships) = self.assembler.exports();
        GraphBuild {
            nodes,
            relationships,
            warnings: self.warnings,
        }
    }
}

/// Final build artifact handed to callers and the persistence layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphBuild {
    pub nodes: Vec<NodeExport>,
    pub relationships: Vec<RelationshipExport>,
    pub warnings: Vec<Warning>,
}

/// Walk the root and assemble the containment graph.
#[tracing::instrument(level = "info", skip_all, fields(root = %config.root_path.display()))]
pub fn build_hierarchy(config: &BuildConfig) -> BuildResult<HierarchyBuild> {
    config.validate()?;
    let root = config.canonical_root()?;
    let env = &config.environment;

    let walk = iter_files(config, false)?;
    let mut warnings = walk.warnings;

    let mut assembler = GraphAssembler::new();
    let mut pool = ParserPool::new();
    let mut cache = ParseCache::new();
    let mut definitions: Vec<DefinitionSite> = Vec::new();

    emit_root(&root, env, &mut assembler)?;

    for file in &walk.files {
        let Some(language) = file.language else {
            continue;
        };
        match cache.get_or_parse(&mut pool, &file.path, language)? {
            Some(parsed) => {
                let (file_id, file_level) =
                    emit_file_and_parents(&root, &file.path, Some(&parsed), env, &mut assembler)?;
                build_file_subtree(
                    &parsed,
                    &NodePath::for_fs(file.path.clone()),
                    file_id,
                    file_level,
                    language.rules(),
                    env,
                    &mut assembler,
                    &mut definitions,
                )?;
            }
            None => {
                // Unreadable or unparsable: the file node still exists.
                warn!("hierarchy: parse failed for {}", file.path.display());
                warnings.push(
                    Warning::new(WarningKind::ParseFailed)
                        .with("path", file.path.display().to_string()),
                );
                emit_file_and_parents(&root, &file.path, None, env, &mut assembler)?;
            }
        }
    }

    info!(
        nodes = assembler.node_count(),
        edges = assembler.edge_count(),
        definitions = definitions.len(),
        "hierarchy: assembled"
    );

    Ok(HierarchyBuild {
        root,
        assembler,
        definitions,
        cache,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::environment::{EnvironmentLayer, GraphEnvironment};
    use crate::model::node::NodeLabel;
    use crate::model::relationship::RelationshipKind;
    use std::fs;

    fn config(root: &std::path::Path) -> BuildConfig {
        BuildConfig::new(
            root,
            GraphEnvironment::new("e", Some("r".into()), EnvironmentLayer::Base),
        )
    }

    #[test]
    fn empty_root_yields_single_folder_node() {
        let dir = tempfile::tempdir().unwrap();
        let build = build_hierarchy(&config(dir.path())).unwrap();
        assert_eq!(build.assembler.node_count(), 1);
        assert_eq!(build.assembler.edge_count(), 0);
        let root = build.assembler.nodes().next().unwrap();
        assert_eq!(root.label, NodeLabel::Folder);
        assert_eq!(root.level, 0);
    }

    #[test]
    fn two_builds_produce_identical_graphs() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("pkg")).unwrap();
        fs::write(dir.path().join("pkg/a.py"), "def f():\n    pass\n").unwrap();
        fs::write(dir.path().join("b.py"), "class B:\n    pass\n").unwrap();

        let one = build_hierarchy(&config(dir.path())).unwrap().finish();
        let two = build_hierarchy(&config(dir.path())).unwrap().finish();
        assert_eq!(one.nodes, two.nodes);
        assert_eq!(one.relationships, two.relationships);
    }

    #[test]
    fn unicode_paths_survive_with_literal_names() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("módulo")).unwrap();
        fs::write(dir.path().join("módulo/ファイル.py"), "def f():\n    pass\n").unwrap();

        let build = build_hierarchy(&config(dir.path())).unwrap();
        let folder = build
            .assembler
            .nodes()
            .find(|n| n.name == "módulo")
            .expect("folder node");
        assert_eq!(folder.label, NodeLabel::Folder);
        let file = build
            .assembler
            .nodes()
            .find(|n| n.name == "ファイル.py")
            .expect("file node");
        assert_eq!(file.label, NodeLabel::File);

        let contains = build
            .assembler
            .relationships()
            .filter(|r| {
                r.kind == RelationshipKind::Contains
                    && r.source_id == folder.node_id
                    && r.target_id == file.node_id
            })
            .count();
        assert_eq!(contains, 1);
    }

    #[test]
    fn syntax_error_file_still_gets_a_file_node() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad.py"), ")))(((\n").unwrap();
        let build = build_hierarchy(&config(dir.path())).unwrap();
        assert!(build
            .assembler
            .nodes()
            .any(|n| n.label == NodeLabel::File && n.name == "bad.py"));
    }
}
