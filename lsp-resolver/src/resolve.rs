//! Reference resolution: definitions → LSP locations → graph edges.
//!
//! Definitions are processed in hierarchy emission order and each
//! response's locations in server order, deduplicated by position with
//! set semantics, so edge output is reproducible. Per location the site
//! file is looked up in the shared parse cache (or parsed once), the
//! innermost named AST node at the position becomes the classification
//! site, and the innermost enclosing CodeNode becomes the edge source —
//! falling back to the FILE node for module-level references. Sites in
//! comments or whitespace are dropped with a warning.
//!
//! Tie-break for equal spans: the deeper node wins (`named_descendant…`
//! returns the last, deepest match); among CodeNodes the later-starting,
//! then shorter, span wins.

use crate::errors::Error;
use crate::pool::{CancelFlag, ServerPool};
use crate::position::{byte_col_from_utf16, byte_offset, line_text, utf16_col};
use crate::util::uri_to_abs_path;
use graph_builder::config::BuildConfig;
use graph_builder::errors::BuildResult;
use graph_builder::graph::assembler::GraphAssembler;
use graph_builder::hierarchy::DefinitionSite;
use graph_builder::languages::LanguageId;
use graph_builder::model::relationship::Relationship;
use graph_builder::model::warning::{Warning, WarningKind};
use graph_builder::parse::{ParseCache, ParserPool};
use graph_builder::{build_hierarchy, GraphBuild, HierarchyBuild};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};
use tree_sitter::Node;

/// Full build: hierarchy, then references unless `only_hierarchy` is set.
pub async fn build_full(config: &BuildConfig) -> BuildResult<GraphBuild> {
    let mut build = build_hierarchy(config)?;
    if !config.only_hierarchy {
        resolve_references(&mut build, config, &CancelFlag::new()).await?;
    }
    Ok(build.finish())
}

/// Run the reference pass over an assembled hierarchy.
///
/// Cancellation stops new queries; servers shut down cleanly either way.
pub async fn resolve_references(
    build: &mut HierarchyBuild,
    config: &BuildConfig,
    cancel: &CancelFlag,
) -> BuildResult<()> {
    let mut pool = ServerPool::new(build.root.clone(), config.lsp.clone());
    let mut parsers = ParserPool::new();
    let mut warned_languages: HashSet<String> = HashSet::new();
    let mut edges = 0usize;

    for index in 0..build.definitions.len() {
        if cancel.is_cancelled() {
            info!("resolve: cancelled after {index} definitions");
            break;
        }
        let def = build.definitions[index].clone();

        let Some(parsed) = build.cache.get(&def.fs_path) else {
            continue;
        };
        let Some(line) = line_text(&parsed.source, def.row) else {
            continue;
        };
        let character = utf16_col(line, def.byte_col);

        let locations = match pool
            .references(
                def.language,
                &def.fs_path,
                def.row as u32,
                character,
                &parsed.source,
            )
            .await
        {
            Ok(locations) => locations,
            Err(Error::Unavailable(key)) => {
                if warned_languages.insert(key.clone()) {
                    build.warnings.push(
                        Warning::new(WarningKind::LspUnavailable).with("language", key),
                    );
                }
                continue;
            }
            Err(err) => {
                build.warnings.push(
                    Warning::new(WarningKind::LspRequestFailed)
                        .with("path", def.fs_path.display().to_string())
                        .with("error", err.to_string()),
                );
                continue;
            }
        };

        // Set semantics on (uri, line, character); response order preserved.
        let mut seen = HashSet::new();
        for location in locations {
            let key = (
                location.uri.as_str().to_owned(),
                location.range.start.line,
                location.range.start.character,
            );
            if !seen.insert(key) {
                continue;
            }
            if attach_reference(
                &mut build.assembler,
                &mut build.cache,
                &mut parsers,
                &mut build.warnings,
                &def,
                location.uri.as_str(),
                location.range.start.line,
                location.range.start.character,
            )? {
                edges += 1;
            }
        }
    }

    pool.shutdown_all().await;
    info!(edges, "resolve: reference pass complete");
    Ok(())
}

/// Map one reference location onto a graph edge.
///
/// Returns whether an edge was recorded. Unmappable locations (outside the
/// project, unsupported language, unreadable file) are skipped quietly;
/// comment/whitespace sites are skipped with a warning.
#[allow(clippy::too_many_arguments)]
pub fn attach_reference(
    assembler: &mut GraphAssembler,
    cache: &mut ParseCache,
    parsers: &mut ParserPool,
    warnings: &mut Vec<Warning>,
    def: &DefinitionSite,
    uri: &str,
    line: u32,
    character: u32,
) -> BuildResult<bool> {
    let Some(target) = assembler.node(def.node_id).map(|n| (n.node_id, n.label)) else {
        return Ok(false);
    };
    let (target_id, target_label) = target;

    let Some(fs_path) = uri_to_abs_path(uri) else {
        return Ok(false);
    };
    let ext = fs_path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let Some(language) = LanguageId::from_extension(ext) else {
        return Ok(false);
    };
    let Some(parsed) = cache.get_or_parse(parsers, &fs_path, language)? else {
        return Ok(false);
    };

    let row = line as usize;
    let Some(line_str) = line_text(&parsed.source, row) else {
        return Ok(false);
    };
    let byte_col = byte_col_from_utf16(line_str, character);
    let Some(byte) = byte_offset(&parsed.source, row, byte_col) else {
        return Ok(false);
    };

    let end = (byte + 1).min(parsed.source.len());
    let Some(site) = parsed.root().named_descendant_for_byte_range(byte, end) else {
        return Ok(false);
    };

    if !site_is_substantive(site, byte) {
        debug!("resolve: dropping reference in comment/whitespace at {uri}:{line}:{character}");
        warnings.push(
            Warning::new(WarningKind::IgnoredReference)
                .with("uri", uri)
                .with("line", line.to_string())
                .with("character", character.to_string()),
        );
        return Ok(false);
    }

    let Some(source_id) = innermost_code_node(assembler, &fs_path, byte) else {
        return Ok(false);
    };

    let classification = language
        .rules()
        .classify(site, parsed.bytes(), target_label);
    let mut relationship = Relationship::new(source_id, target_id, classification.kind);
    if let Some(scope) = classification.scope {
        let start = scope.start.min(parsed.source.len());
        let end = scope.end.min(parsed.source.len()).max(start);
        relationship = relationship.with_scope(&parsed.source[start..end]);
    }
    assembler.insert_relationship(relationship)?;
    Ok(true)
}

/// Innermost CodeNode of `fs_path` whose span contains `byte`.
///
/// The FILE node spans the whole file, so module-level references fall
/// back to it naturally. Later-starting spans win ties, then shorter.
fn innermost_code_node(
    assembler: &GraphAssembler,
    fs_path: &Path,
    byte: usize,
) -> Option<graph_builder::model::environment::NodeId> {
    let mut best: Option<(usize, usize)> = None; // (byte_len, start_byte)
    let mut best_id = None;
    for id in assembler.nodes_in_file(fs_path) {
        let node = assembler.node(*id)?;
        let Some(span) = node.span else { continue };
        if !span.contains_byte(byte) {
            continue;
        }
        let candidate = (span.byte_len(), span.start_byte);
        let better = match best {
            None => true,
            Some((len, start)) => {
                candidate.0 < len || (candidate.0 == len && candidate.1 > start)
            }
        };
        if better {
            best = Some(candidate);
            best_id = Some(*id);
        }
    }
    best_id
}

/// A site is substantive when it is not a comment and the position rests
/// on an actual token rather than the whitespace between children.
fn site_is_substantive(site: Node, byte: usize) -> bool {
    let kind = site.kind();
    if kind.contains("comment") {
        return false;
    }
    if site.child_count() == 0 {
        return true;
    }
    let mut cursor = site.walk();
    let on_token = site
        .children(&mut cursor)
        .any(|c| c.start_byte() <= byte && byte < c.end_byte());
    on_token && {
        // descend: the position must reach a leaf through real tokens
        let mut cursor = site.walk();
        site.children(&mut cursor)
            .find(|c| c.start_byte() <= byte && byte < c.end_byte())
            .map(|c| site_is_substantive(c, byte))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graph_builder::model::environment::{EnvironmentLayer, GraphEnvironment};
    use graph_builder::model::node::NodeLabel;
    use graph_builder::model::relationship::RelationshipKind;
    use graph_builder::BuildConfig;
    use std::fs;

    fn config(root: &Path) -> BuildConfig {
        BuildConfig::new(
            root,
            GraphEnvironment::new("e", Some("r".into()), EnvironmentLayer::Base),
        )
    }

    /// Feed a hand-built location through the same path a server response
    /// takes, and return the non-CONTAINS edges.
    fn attach(
        build: &mut HierarchyBuild,
        def_name: &str,
        site_file: &Path,
        src: &str,
        context: &str,
        ident: &str,
    ) -> Vec<Relationship> {
        let def = build
            .definitions
            .iter()
            .find(|d| {
                build
                    .assembler
                    .node(d.node_id)
                    .map(|n| n.name == def_name)
                    .unwrap_or(false)
            })
            .cloned()
            .expect("definition");

        let base = src.find(context).unwrap();
        let off = base + context.find(ident).unwrap();
        let row = src[..off].bytes().filter(|b| *b == b'\n').count();
        let line_start = src[..off].rfind('\n').map(|i| i + 1).unwrap_or(0);
        let character = utf16_col(&src[line_start..], off - line_start);

        let uri = crate::util::file_uri(site_file).unwrap();
        let mut parsers = ParserPool::new();
        attach_reference(
            &mut build.assembler,
            &mut build.cache,
            &mut parsers,
            &mut build.warnings,
            &def,
            &uri,
            row as u32,
            character,
        )
        .unwrap();

        build
            .assembler
            .relationships()
            .filter(|r| r.kind != RelationshipKind::Contains)
            .collect()
    }

    #[test]
    fn python_call_and_import_edges() {
        let dir = tempfile::tempdir().unwrap();
        let a = "def f():\n    pass\n";
        let b = "from a import f\n\ndef caller():\n    f()\n";
        fs::write(dir.path().join("a.py"), a).unwrap();
        fs::write(dir.path().join("b.py"), b).unwrap();

        let mut build = build_hierarchy(&config(dir.path())).unwrap();
        let b_path = dir.path().join("b.py");

        let edges = attach(&mut build, "f", &b_path, b, "    f()", "f");
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].kind, RelationshipKind::Calls);
        let source = build.assembler.node(edges[0].source_id).unwrap();
        assert_eq!(source.name, "caller");
        let target = build.assembler.node(edges[0].target_id).unwrap();
        assert!(target.path.to_string().ends_with("a.py#f"));
        assert_eq!(edges[0].scope_text.as_deref(), Some("f()"));

        let edges = attach(&mut build, "f", &b_path, b, "import f", "f");
        assert_eq!(edges.len(), 2);
        assert!(edges.iter().any(|e| {
            e.kind == RelationshipKind::Imports
                && build.assembler.node(e.source_id).unwrap().label == NodeLabel::File
        }));
    }

    #[test]
    fn javascript_inheritance_and_import_edges() {
        let dir = tempfile::tempdir().unwrap();
        let p = "class P {}\n";
        let c = "import {P} from './p';\n\nclass C extends P {}\n";
        fs::write(dir.path().join("p.js"), p).unwrap();
        fs::write(dir.path().join("c.js"), c).unwrap();

        let mut build = build_hierarchy(&config(dir.path())).unwrap();
        let c_path = dir.path().join("c.js");

        let edges = attach(&mut build, "P", &c_path, c, "extends P", "P");
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].kind, RelationshipKind::Inherits);
        assert_eq!(
            build.assembler.node(edges[0].source_id).unwrap().name,
            "C"
        );

        let edges = attach(&mut build, "P", &c_path, c, "{P}", "P");
        assert!(edges.iter().any(|e| e.kind == RelationshipKind::Imports));
    }

    #[test]
    fn ruby_construction_is_instantiates_not_calls() {
        let dir = tempfile::tempdir().unwrap();
        let m = "class M\nend\n";
        let u = "thing = M.new\n";
        fs::write(dir.path().join("m.rb"), m).unwrap();
        fs::write(dir.path().join("u.rb"), u).unwrap();

        let mut build = build_hierarchy(&config(dir.path())).unwrap();
        let u_path = dir.path().join("u.rb");

        let edges = attach(&mut build, "M", &u_path, u, "M.new", "M");
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].kind, RelationshipKind::Instantiates);
        assert_eq!(
            build.assembler.node(edges[0].source_id).unwrap().label,
            NodeLabel::File
        );
    }

    #[test]
    fn recursive_reference_may_self_loop() {
        let dir = tempfile::tempdir().unwrap();
        let a = "def f():\n    return f()\n";
        fs::write(dir.path().join("a.py"), a).unwrap();

        let mut build = build_hierarchy(&config(dir.path())).unwrap();
        let a_path = dir.path().join("a.py");
        let edges = attach(&mut build, "f", &a_path, a, "return f()", "f");
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].kind, RelationshipKind::Calls);
        assert_eq!(edges[0].source_id, edges[0].target_id);
    }

    #[test]
    fn comment_sites_are_dropped_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        let a = "def f():\n    pass\n\n# call f here\n";
        fs::write(dir.path().join("a.py"), a).unwrap();

        let mut build = build_hierarchy(&config(dir.path())).unwrap();
        let a_path = dir.path().join("a.py");
        let edges = attach(&mut build, "f", &a_path, a, "# call f here", "f");
        assert!(edges.is_empty());
        assert!(build
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::IgnoredReference));
    }

    #[tokio::test]
    async fn unavailable_server_degrades_to_hierarchy_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("main.go"),
            "package main\n\nfunc main() {\n\trun()\n}\n\nfunc run() {}\n",
        )
        .unwrap();

        let mut cfg = config(dir.path());
        cfg.lsp
            .servers
            .insert("go".into(), vec!["repograph-test-missing-server".into()]);

        let mut build = build_hierarchy(&cfg).unwrap();
        let contains_before = build.assembler.edge_count();
        resolve_references(&mut build, &cfg, &CancelFlag::new())
            .await
            .unwrap();

        assert_eq!(build.assembler.edge_count(), contains_before);
        let unavailable: Vec<_> = build
            .warnings
            .iter()
            .filter(|w| w.kind == WarningKind::LspUnavailable)
            .collect();
        assert_eq!(unavailable.len(), 1);
        assert_eq!(unavailable[0].context.get("language").unwrap(), "go");
    }

    #[tokio::test]
    async fn cancelled_build_issues_no_queries() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.py"), "def f():\n    pass\n").unwrap();
        let cfg = config(dir.path());
        let mut build = build_hierarchy(&cfg).unwrap();

        let cancel = CancelFlag::new();
        cancel.cancel();
        resolve_references(&mut build, &cfg, &cancel).await.unwrap();
        assert!(build.warnings.is_empty());
    }
}
