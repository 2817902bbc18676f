//! Hierarchy extraction: parse tree → typed code nodes with CONTAINS edges.
//!
//! The walk descends the whole tree. Capturable nodes (per the language
//! rules) become CodeNodes and open a new containment scope; everything
//! else is transparent and its children stay attached to the enclosing
//! scope. Sibling captures with identical names get a stable `[n]` suffix
//! in source order. ERROR nodes are walked like any other, so capturable
//! descendants of broken syntax still surface.

use crate::errors::BuildResult;
use crate::languages::{LanguageId, LanguageRules};
use crate::model::environment::{GraphEnvironment, NodeId};
use crate::model::node::{CodeNode, NodeLabel};
use crate::model::path::NodePath;
use crate::model::relationship::{Relationship, RelationshipKind};
use crate::model::span::Span;
use crate::graph::assembler::GraphAssembler;
use crate::parse::ParsedFile;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;
use tree_sitter::Node;

/// Identifier position of a captured node, used to query references.
#[derive(Debug, Clone)]
pub struct DefinitionSite {
    pub node_id: NodeId,
    pub fs_path: PathBuf,
    pub language: LanguageId,
    /// 0-based row of the identifier token.
    pub row: usize,
    /// 0-based byte column of the identifier token.
    pub byte_col: usize,
}

struct Scope {
    path: NodePath,
    level: usize,
    id: NodeId,
}

/// Extract the capturable subtree of one parsed file.
///
/// `file_id` must already be inserted into the assembler; captured nodes
/// and their CONTAINS edges are appended, and each captured node records a
/// definition site for the reference pass.
pub fn build_file_subtree(
    parsed: &ParsedFile,
    file_path: &NodePath,
    file_id: NodeId,
    file_level: usize,
    rules: &dyn LanguageRules,
    env: &GraphEnvironment,
    assembler: &mut GraphAssembler,
    definitions: &mut Vec<DefinitionSite>,
) -> BuildResult<()> {
    let scope = Scope {
        path: file_path.clone(),
        level: file_level,
        id: file_id,
    };
    let mut names_in_scope = HashMap::new();
    walk_children(
        parsed.root(),
        parsed,
        rules,
        env,
        assembler,
        definitions,
        &scope,
        &mut names_in_scope,
    )?;
    debug!(
        file = %file_path,
        definitions = definitions.len(),
        "hierarchy: file subtree complete"
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn walk_children(
    node: Node,
    parsed: &ParsedFile,
    rules: &dyn LanguageRules,
    env: &GraphEnvironment,
    assembler: &mut GraphAssembler,
    definitions: &mut Vec<DefinitionSite>,
    scope: &Scope,
    names_in_scope: &mut HashMap<String, usize>,
) -> BuildResult<()> {
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();

    for child in children {
        let captured = rules.is_node_worth_capturing(&child);
        let ident = if captured { rules.identifier_of(child) } else { None };

        let Some(ident) = ident else {
            // Transparent node (or an anonymous capture): children stay in
            // the current scope.
            walk_children(
                child,
                parsed,
                rules,
                env,
                assembler,
                definitions,
                scope,
                names_in_scope,
            )?;
            continue;
        };

        let name = ident.utf8_text(parsed.bytes()).unwrap_or("").to_owned();
        if name.is_empty() {
            continue;
        }

        let occurrence = names_in_scope
            .entry(name.clone())
            .and_modify(|n| *n += 1)
            .or_insert(1);
        let segment = if *occurrence == 1 {
            name.clone()
        } else {
            format!("{name}[{occurrence}]")
        };

        let body = rules.body_of(child);
        let span = Span::from_ts_node(&body);
        let text = span.slice_text(&parsed.source).to_owned();
        let label = rules.node_label_for_type(child.kind());
        let path = scope.path.child(segment);

        let code_node = CodeNode::new(label, path.clone(), name, scope.level + 1, env.clone())
            .with_span(span, text);
        let id = assembler.insert_node(code_node)?;
        assembler.insert_relationship(Relationship::new(
            scope.id,
            id,
            RelationshipKind::Contains,
        ))?;

        definitions.push(DefinitionSite {
            node_id: id,
            fs_path: path.fs_path().to_path_buf(),
            language: parsed.language,
            row: ident.start_position().row,
            byte_col: ident.start_position().column,
        });

        let inner = Scope {
            path,
            level: scope.level + 1,
            id,
        };
        let mut inner_names = HashMap::new();
        walk_children(
            child,
            parsed,
            rules,
            env,
            assembler,
            definitions,
            &inner,
            &mut inner_names,
        )?;
    }
    Ok(())
}

/// Emit the FOLDER chain and FILE node for a walked file, idempotently.
///
/// Returns the file node's id and level so the subtree walk can attach.
pub fn emit_file_and_parents(
    root: &std::path::Path,
    file: &std::path::Path,
    parsed: Option<&ParsedFile>,
    env: &GraphEnvironment,
    assembler: &mut GraphAssembler,
) -> BuildResult<(NodeId, usize)> {
    let chain = crate::walk::folder_chain(root, file);
    let mut parent: Option<NodeId> = None;
    let mut level = 0usize;

    for folder in &chain {
        let path = NodePath::for_fs(folder.clone());
        let name = path.name();
        let node = CodeNode::new(NodeLabel::Folder, path, name, level, env.clone());
        let id = assembler.insert_node(node)?;
        if let Some(parent_id) = parent {
            assembler.insert_relationship(Relationship::new(
                parent_id,
                id,
                RelationshipKind::Contains,
            ))?;
        }
        parent = Some(id);
        level += 1;
    }

    let file_path = NodePath::for_fs(file.to_path_buf());
    let name = file_path.name();
    let mut node = CodeNode::new(NodeLabel::File, file_path, name, level, env.clone());
    if let Some(parsed) = parsed {
        let lines = parsed.line_count().max(1);
        node = node.with_span(
            Span::new(1, lines, 0, parsed.source.len()),
            parsed.source.clone(),
        );
    }
    let file_id = assembler.insert_node(node)?;
    if let Some(parent_id) = parent {
        assembler.insert_relationship(Relationship::new(
            parent_id,
            file_id,
            RelationshipKind::Contains,
        ))?;
    }
    Ok((file_id, level))
}

/// Emit only the root FOLDER node (empty roots still produce a graph).
pub fn emit_root(
    root: &std::path::Path,
    env: &GraphEnvironment,
    assembler: &mut GraphAssembler,
) -> BuildResult<NodeId> {
    let path = NodePath::for_fs(root.to_path_buf());
    let name = path.name();
    assembler.insert_node(CodeNode::new(NodeLabel::Folder, path, name, 0, env.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::environment::EnvironmentLayer;
    use crate::parse::ParserPool;

    fn env() -> GraphEnvironment {
        GraphEnvironment::new("e", None, EnvironmentLayer::Base)
    }

    fn build(src: &str, language: LanguageId) -> (GraphAssembler, Vec<DefinitionSite>) {
        let mut pool = ParserPool::new();
        let parsed = pool.parse(language, src.to_owned()).unwrap().unwrap();
        let mut assembler = GraphAssembler::new();
        let env = env();
        let (file_id, file_level) = emit_file_and_parents(
            std::path::Path::new("/r"),
            std::path::Path::new("/r/a.py"),
            Some(&parsed),
            &env,
            &mut assembler,
        )
        .unwrap();
        let mut definitions = Vec::new();
        build_file_subtree(
            &parsed,
            &NodePath::for_fs("/r/a.py"),
            file_id,
            file_level,
            language.rules(),
            &env,
            &mut assembler,
            &mut definitions,
        )
        .unwrap();
        (assembler, definitions)
    }

    fn paths(assembler: &GraphAssembler) -> Vec<String> {
        assembler.nodes().map(|n| n.path.to_string()).collect()
    }

    #[test]
    fn nested_defs_nest_in_the_containment_tree() {
        let src = "class C:\n    def m(self):\n        pass\n\ndef f():\n    pass\n";
        let (assembler, definitions) = build(src, LanguageId::Python);
        let all = paths(&assembler);
        assert!(all.contains(&"file:///r/a.py#C".to_string()));
        assert!(all.contains(&"file:///r/a.py#C.m".to_string()));
        assert!(all.contains(&"file:///r/a.py#f".to_string()));

        let class_node = assembler
            .nodes()
            .find(|n| n.path.to_string().ends_with("#C"))
            .unwrap();
        let method_node = assembler
            .nodes()
            .find(|n| n.path.to_string().ends_with("#C.m"))
            .unwrap();
        assert_eq!(class_node.label, NodeLabel::Class);
        assert_eq!(method_node.label, NodeLabel::Function);
        assert_eq!(method_node.level, class_node.level + 1);

        // definition sites arrive in DFS source order
        let rows: Vec<usize> = definitions.iter().map(|d| d.row).collect();
        assert_eq!(rows, vec![0, 1, 4]);
    }

    #[test]
    fn every_captured_node_has_exactly_one_incoming_contains() {
        let src = "class C:\n    def m(self):\n        pass\n\ndef f():\n    pass\n";
        let (assembler, _) = build(src, LanguageId::Python);
        for node in assembler.nodes() {
            if node.level == 0 {
                continue;
            }
            let incoming = assembler
                .relationships()
                .filter(|r| r.kind == RelationshipKind::Contains && r.target_id == node.node_id)
                .count();
            assert_eq!(incoming, 1, "node {}", node.path);
        }
    }

    #[test]
    fn duplicate_sibling_names_get_index_suffixes() {
        let src = "def f():\n    pass\n\ndef f():\n    pass\n\ndef f():\n    pass\n";
        let (assembler, _) = build(src, LanguageId::Python);
        let all = paths(&assembler);
        assert!(all.contains(&"file:///r/a.py#f".to_string()));
        assert!(all.contains(&"file:///r/a.py#f[2]".to_string()));
        assert!(all.contains(&"file:///r/a.py#f[3]".to_string()));
    }

    #[test]
    fn node_text_matches_span_slice() {
        let src = "def f():\n    return 1\n";
        let (assembler, _) = build(src, LanguageId::Python);
        let f = assembler
            .nodes()
            .find(|n| n.label == NodeLabel::Function)
            .unwrap();
        let span = f.span.unwrap();
        assert_eq!(f.text.as_deref(), Some(span.slice_text(src)));
        assert_eq!(span.start_line, 1);
        assert_eq!(span.end_line, 2);
    }

    #[test]
    fn broken_syntax_still_yields_identifiable_captures() {
        let src = "def ok():\n    pass\n\ndef broken(:::\n";
        let (assembler, _) = build(src, LanguageId::Python);
        assert!(assembler
            .nodes()
            .any(|n| n.label == NodeLabel::Function && n.name == "ok"));
    }

    #[test]
    fn folder_chain_levels_count_from_root() {
        let mut assembler = GraphAssembler::new();
        let env = env();
        let (_, file_level) = emit_file_and_parents(
            std::path::Path::new("/r"),
            std::path::Path::new("/r/a/b/c.py"),
            None,
            &env,
            &mut assembler,
        )
        .unwrap();
        assert_eq!(file_level, 3);
        let root = assembler
            .nodes()
            .find(|n| n.path.to_string() == "file:///r")
            .unwrap();
        assert_eq!(root.level, 0);
        assert_eq!(root.label, NodeLabel::Folder);
    }
}
