//! Partial graph construction from file-level change records.
//!
//! A diff build assembles only the changed files' subtrees plus the
//! FOLDER/FILE parent chain needed to merge the delta into a persisted
//! base graph. Two granularities:
//!
//! - *File-level* (no previous node states): every capturable node of an
//!   added/modified file is emitted under the PR environment and labeled.
//! - *Function-level* (states provided): current node text is compared
//!   against the prior slice at the same hierarchical path; only differing
//!   nodes switch to the PR environment and take a label, unchanged
//!   siblings are re-emitted as base-environment reference nodes.
//!
//! Reference edges run over the full definition list (outgoing edges from
//! changed code may land on definitions anywhere in the tree) and are then
//! filtered to changed-file sources; edges whose target stays outside the
//! change set are returned as external relationships for the caller to
//! upsert.

use crate::model::{ChangeKind, FileDiff, PreviousNodeState, UpdateResult};
use crate::patch::{change_counts, looks_like_binary_patch};
use graph_builder::builder::HierarchyBuild;
use graph_builder::config::BuildConfig;
use graph_builder::errors::{BuildError, BuildResult};
use graph_builder::graph::assembler::GraphAssembler;
use graph_builder::hierarchy::build_file_subtree;
use graph_builder::languages::LanguageId;
use graph_builder::model::environment::{GraphEnvironment, NodeId};
use graph_builder::model::node::{ChangeLabel, CodeNode, NodeLabel};
use graph_builder::model::path::NodePath;
use graph_builder::model::relationship::{Relationship, RelationshipKind};
use graph_builder::model::span::Span;
use graph_builder::model::warning::Warning;
use graph_builder::walk::folder_chain;
use graph_builder::{build_hierarchy, parse::ParsedFile};
use lsp_resolver::{resolve_references, CancelFlag};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

pub struct UpdateBuilder<'a> {
    config: &'a BuildConfig,
    diffs: Vec<FileDiff>,
    previous: Vec<PreviousNodeState>,
}

struct PartialState {
    assembler: GraphAssembler,
    external: Vec<Relationship>,
    warnings: Vec<Warning>,
    /// Absolute paths of added/modified files.
    changed: HashSet<PathBuf>,
    base_env: GraphEnvironment,
    pr_env: GraphEnvironment,
}

impl<'a> UpdateBuilder<'a> {
    pub fn new(
        config: &'a BuildConfig,
        diffs: Vec<FileDiff>,
        previous: Vec<PreviousNodeState>,
    ) -> Self {
        Self {
            config,
            diffs,
            previous,
        }
    }

    /// Build the partial graph, including reference edges unless the
    /// configuration asks for hierarchy only.
    pub async fn build(self) -> BuildResult<UpdateResult> {
        let (mut state, mut full) = self.build_partial()?;

        if !self.config.only_hierarchy {
            resolve_references(&mut full, self.config, &CancelFlag::new()).await?;
        }
        map_reference_edges(&full, &mut state)?;

        state.warnings.extend(full.warnings);
        let (nodes, relationships) = state.assembler.exports();
        info!(
            nodes = nodes.len(),
            relationships = relationships.len(),
            external = state.external.len(),
            "update: partial graph complete"
        );
        Ok(UpdateResult {
            nodes,
            relationships,
            external_relationships: state.external.iter().map(|r| r.export()).collect(),
            warnings: state.warnings,
        })
    }

    /// Hierarchy-only construction shared by both public paths.
    fn build_partial(&self) -> BuildResult<(PartialState, HierarchyBuild)> {
        self.config.validate()?;
        let root = self.config.canonical_root()?;
        let pr_env = self.config.pr_environment.clone().ok_or_else(|| {
            BuildError::InvalidConfig("diff builds require pr_environment".into())
        })?;
        let base_env = self.config.environment.clone();

        // Full hierarchy over the patched tree: parent context, parse
        // cache, and the definition list for the reference pass.
        let full = build_hierarchy(self.config)?;

        let mut state = PartialState {
            assembler: GraphAssembler::new(),
            external: Vec::new(),
            warnings: Vec::new(),
            changed: HashSet::new(),
            base_env,
            pr_env,
        };

        let previous_by_file = group_previous_by_file(&self.previous);
        let function_level = !self.previous.is_empty();

        for diff in &self.diffs {
            let abs = if diff.path.is_absolute() {
                diff.path.clone()
            } else {
                root.join(&diff.path)
            };
            let binary = looks_like_binary_patch(&diff.diff_text);
            let (added, removed) = change_counts(&diff.diff_text);
            info!(
                path = %abs.display(),
                change = ?diff.change_type,
                added,
                removed,
                binary,
                "update: applying file diff"
            );

            let prev_for_file = previous_by_file
                .get(&abs)
                .map(Vec::as_slice)
                .unwrap_or(&[]);

            match diff.change_type {
                ChangeKind::Deleted => {
                    self.emit_deleted(&mut state, &root, &abs, prev_for_file)?;
                }
                kind => {
                    state.changed.insert(abs.clone());
                    self.emit_changed(
                        &mut state,
                        &full,
                        &root,
                        &abs,
                        kind,
                        function_level && !binary,
                        prev_for_file,
                    )?;
                }
            }
        }

        Ok((state, full))
    }

    /// A deleted file: parents plus the file and its prior nodes, all
    /// under the base environment with only the DELETED label.
    fn emit_deleted(
        &self,
        state: &mut PartialState,
        root: &Path,
        abs: &Path,
        prev_for_file: &[&PreviousNodeState],
    ) -> BuildResult<()> {
        let (parent_id, file_level) = emit_folders(state, root, abs)?;
        let file_path = NodePath::for_fs(abs.to_path_buf());
        let file_uri = file_path.to_string();
        let mut file_node = CodeNode::new(
            NodeLabel::File,
            file_path,
            file_name(abs),
            file_level,
            state.base_env.clone(),
        );
        file_node.add_extra_label(ChangeLabel::Deleted);
        let file_id = state.assembler.insert_node(file_node)?;
        contain(state, parent_id, file_id)?;

        let mut emitted: HashMap<String, NodeId> = HashMap::new();
        for prev in prev_for_file {
            if prev.node_path == file_uri {
                continue;
            }
            let Ok(path) = NodePath::try_from(prev.node_path.clone()) else {
                continue;
            };
            let level = file_level + path.segments().len();
            let mut node = CodeNode::new(
                NodeLabel::Definition,
                path.clone(),
                path.name(),
                level,
                state.base_env.clone(),
            );
            node.text = Some(prev.code_text.clone());
            node.add_extra_label(ChangeLabel::Deleted);
            let id = state.assembler.insert_node(node)?;
            emitted.insert(path.to_string(), id);

            let container = path
                .parent()
                .and_then(|p| emitted.get(&p.to_string()).copied())
                .unwrap_or(file_id);
            contain(state, container, id)?;
        }
        Ok(())
    }

    /// An added or modified file, at the configured granularity.
    #[allow(clippy::too_many_arguments)]
    fn emit_changed(
        &self,
        state: &mut PartialState,
        full: &HierarchyBuild,
        root: &Path,
        abs: &Path,
        kind: ChangeKind,
        function_level: bool,
        prev_for_file: &[&PreviousNodeState],
    ) -> BuildResult<()> {
        let (parent_id, file_level) = emit_folders(state, root, abs)?;
        let parsed = full.cache.get(abs);
        let language = abs
            .extension()
            .and_then(|e| e.to_str())
            .and_then(LanguageId::from_extension);

        // File node environment: a brand-new file has no base identity; a
        // modified file keeps its base id at function granularity so
        // unchanged children attach to the persisted node.
        let (file_env, file_label) = if function_level && kind == ChangeKind::Modified {
            (state.base_env.clone(), None)
        } else {
            (state.pr_env.clone(), Some(kind.label()))
        };

        let file_path = NodePath::for_fs(abs.to_path_buf());
        let mut file_node = CodeNode::new(
            NodeLabel::File,
            file_path.clone(),
            file_name(abs),
            file_level,
            file_env,
        );
        if let Some(parsed) = parsed.as_deref() {
            file_node = with_file_span(file_node, parsed);
        }
        if let Some(label) = file_label {
            file_node.add_extra_label(label);
        }
        let file_id = state.assembler.insert_node(file_node)?;
        contain(state, parent_id, file_id)?;

        let (Some(parsed), Some(language)) = (parsed, language) else {
            // Unsupported or unreadable: the labeled file node is the delta.
            return Ok(());
        };

        if function_level {
            self.emit_function_level(
                state,
                &parsed,
                language,
                &file_path,
                file_id,
                file_level,
                prev_for_file,
            )
        } else {
            self.emit_file_level(state, &parsed, language, &file_path, file_id, file_level, kind)
        }
    }

    /// File-level granularity: the whole subtree under the PR environment,
    /// every captured node labeled.
    #[allow(clippy::too_many_arguments)]
    fn emit_file_level(
        &self,
        state: &mut PartialState,
        parsed: &Arc<ParsedFile>,
        language: LanguageId,
        file_path: &NodePath,
        file_id: NodeId,
        file_level: usize,
        kind: ChangeKind,
    ) -> BuildResult<()> {
        let pr_env = state.pr_env.clone();
        let mut definitions = Vec::new();
        build_file_subtree(
            parsed,
            file_path,
            file_id,
            file_level,
            language.rules(),
            &pr_env,
            &mut state.assembler,
            &mut definitions,
        )?;
        for def in &definitions {
            state.assembler.add_extra_label(def.node_id, kind.label());
        }
        debug!(
            file = %file_path,
            captured = definitions.len(),
            "update: file-level subtree emitted"
        );
        Ok(())
    }

    /// Function-level granularity: compare each captured node's text with
    /// its previous state and re-emit accordingly.
    #[allow(clippy::too_many_arguments)]
    fn emit_function_level(
        &self,
        state: &mut PartialState,
        parsed: &Arc<ParsedFile>,
        language: LanguageId,
        file_path: &NodePath,
        file_id: NodeId,
        file_level: usize,
        prev_for_file: &[&PreviousNodeState],
    ) -> BuildResult<()> {
        // Scratch walk under the base environment to learn the current
        // node set; nothing from it reaches the result directly.
        let mut scratch = GraphAssembler::new();
        let scratch_file = CodeNode::new(
            NodeLabel::File,
            file_path.clone(),
            file_path.name(),
            file_level,
            state.base_env.clone(),
        );
        let scratch_file = with_file_span(scratch_file, parsed);
        let scratch_file_id = scratch.insert_node(scratch_file)?;
        let base_env = state.base_env.clone();
        let mut definitions = Vec::new();
        build_file_subtree(
            parsed,
            file_path,
            scratch_file_id,
            file_level,
            language.rules(),
            &base_env,
            &mut scratch,
            &mut definitions,
        )?;

        let previous: HashMap<&str, &PreviousNodeState> = prev_for_file
            .iter()
            .map(|p| (p.node_path.as_str(), *p))
            .collect();

        let mut final_ids: HashMap<String, NodeId> = HashMap::new();
        let mut current_paths: HashSet<String> = HashSet::new();

        for def in &definitions {
            let node = match scratch.node(def.node_id) {
                Some(n) => n.clone(),
                None => continue,
            };
            let path_str = node.path.to_string();
            current_paths.insert(path_str.clone());

            let current_text = node.text.as_deref().unwrap_or("");
            let (env, label) = match previous.get(path_str.as_str()) {
                Some(prev) if prev.code_text == current_text => (state.base_env.clone(), None),
                Some(_) => (state.pr_env.clone(), Some(ChangeLabel::Modified)),
                None => (state.pr_env.clone(), Some(ChangeLabel::Added)),
            };

            let mut reissued = reissue(&node, env);
            if let Some(label) = label {
                reissued.add_extra_label(label);
            }
            let id = state.assembler.insert_node(reissued)?;
            final_ids.insert(path_str, id);
        }

        for def in &definitions {
            let Some(node) = scratch.node(def.node_id) else {
                continue;
            };
            let Some(child_id) = final_ids.get(&node.path.to_string()).copied() else {
                continue;
            };
            let container = node
                .path
                .parent()
                .and_then(|p| final_ids.get(&p.to_string()).copied())
                .unwrap_or(file_id);
            contain(state, container, child_id)?;
        }

        // Nodes known to the persisted graph but gone from the file.
        for prev in prev_for_file {
            if current_paths.contains(&prev.node_path) || prev.node_path == file_path.to_string()
            {
                continue;
            }
            let Ok(path) = NodePath::try_from(prev.node_path.clone()) else {
                continue;
            };
            let level = file_level + path.segments().len();
            let mut node = CodeNode::new(
                NodeLabel::Definition,
                path.clone(),
                path.name(),
                level,
                state.base_env.clone(),
            );
            node.text = Some(prev.code_text.clone());
            node.add_extra_label(ChangeLabel::Deleted);
            let id = state.assembler.insert_node(node)?;
            let container = path
                .parent()
                .and_then(|p| final_ids.get(&p.to_string()).copied())
                .unwrap_or(file_id);
            contain(state, container, id)?;
        }
        Ok(())
    }
}

/// Map the full build's semantic edges into the partial graph: sources
/// must live in changed files; targets outside the change set become
/// external relationships addressed by their base-environment ids.
fn map_reference_edges(full: &HierarchyBuild, state: &mut PartialState) -> BuildResult<()> {
    for rel in full.assembler.relationships() {
        if rel.kind == RelationshipKind::Contains {
            continue;
        }
        let Some(source) = full.assembler.node(rel.source_id) else {
            continue;
        };
        if !state.changed.contains(source.path.fs_path()) {
            continue;
        }
        let Some(final_source) = partial_id(state, &source.path) else {
            continue;
        };
        let Some(target) = full.assembler.node(rel.target_id) else {
            continue;
        };

        let mapped = Relationship {
            source_id: final_source,
            target_id: rel.target_id,
            kind: rel.kind,
            scope_text: rel.scope_text.clone(),
        };
        if state.changed.contains(target.path.fs_path()) {
            if let Some(final_target) = partial_id(state, &target.path) {
                state.assembler.insert_relationship(Relationship {
                    target_id: final_target,
                    ..mapped
                })?;
            }
        } else {
            // The target keeps its base-environment id from the full build.
            state.external.push(mapped);
        }
    }
    Ok(())
}

/// The id a node ended up with in the partial graph, PR env first.
fn partial_id(state: &PartialState, path: &NodePath) -> Option<NodeId> {
    let key = path.to_string();
    let pr = NodeId::derive(&state.pr_env, &key);
    if state.assembler.contains_node(pr) {
        return Some(pr);
    }
    let base = NodeId::derive(&state.base_env, &key);
    state.assembler.contains_node(base).then_some(base)
}

/// Emit the base-environment FOLDER chain for `abs`; returns the deepest
/// folder's id and the level the file node takes.
fn emit_folders(state: &mut PartialState, root: &Path, abs: &Path) -> BuildResult<(NodeId, usize)> {
    let chain = folder_chain(root, abs);
    let mut parent: Option<NodeId> = None;
    let mut level = 0usize;
    for folder in &chain {
        let path = NodePath::for_fs(folder.clone());
        let name = path.name();
        let node = CodeNode::new(NodeLabel::Folder, path, name, level, state.base_env.clone());
        let id = state.assembler.insert_node(node)?;
        if let Some(parent_id) = parent {
            contain(state, parent_id, id)?;
        }
        parent = Some(id);
        level += 1;
    }
    // folder_chain always yields at least the root itself
    let parent_id = parent.ok_or_else(|| {
        BuildError::InvalidConfig(format!("no folder chain for {}", abs.display()))
    })?;
    Ok((parent_id, level))
}

fn contain(state: &mut PartialState, source: NodeId, target: NodeId) -> BuildResult<()> {
    state
        .assembler
        .insert_relationship(Relationship::new(source, target, RelationshipKind::Contains))
}

fn reissue(node: &CodeNode, env: GraphEnvironment) -> CodeNode {
    let mut out = CodeNode::new(node.label, node.path.clone(), node.name.clone(), node.level, env);
    if let (Some(span), Some(text)) = (node.span, node.text.clone()) {
        out = out.with_span(span, text);
    }
    out
}

fn with_file_span(node: CodeNode, parsed: &ParsedFile) -> CodeNode {
    let lines = parsed.line_count().max(1);
    node.with_span(
        Span::new(1, lines, 0, parsed.source.len()),
        parsed.source.clone(),
    )
}

fn file_name(abs: &Path) -> String {
    abs.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn group_previous_by_file(
    previous: &[PreviousNodeState],
) -> HashMap<PathBuf, Vec<&PreviousNodeState>> {
    let mut grouped: HashMap<PathBuf, Vec<&PreviousNodeState>> = HashMap::new();
    for state in previous {
        if let Ok(path) = NodePath::try_from(state.node_path.clone()) {
            grouped
                .entry(path.fs_path().to_path_buf())
                .or_default()
                .push(state);
        }
    }
    grouped
}
