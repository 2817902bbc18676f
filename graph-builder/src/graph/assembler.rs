//! Graph assembly: id-keyed node store plus a deduplicated edge set.
//!
//! Duplicate inserts are idempotent. Conflicts are fatal: the same id with
//! different attributes means the hierarchy builder is corrupt, and two
//! paths hashing to one id is a collision the build must not survive.
//! Insert order never affects the stored graph; all maps are ordered by
//! key, so exports are deterministic as well.

use crate::errors::{BuildError, BuildResult};
use crate::model::environment::NodeId;
use crate::model::node::{ChangeLabel, CodeNode, NodeExport, NodeLabel};
use crate::model::relationship::{Relationship, RelationshipExport, RelationshipKind};
use petgraph::graph::Graph;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

#[derive(Default)]
pub struct GraphAssembler {
    nodes: BTreeMap<NodeId, CodeNode>,
    /// Edge key → first-seen scope text.
    edges: BTreeMap<(NodeId, NodeId, RelationshipKind), Option<String>>,
    /// Non-folder nodes grouped by their file, for span lookups.
    file_index: BTreeMap<PathBuf, Vec<NodeId>>,
}

impl GraphAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node, idempotently.
    ///
    /// Re-inserting an identical node merges `extra_labels` additively.
    /// Differing attributes under one id abort the build.
    pub fn insert_node(&mut self, node: CodeNode) -> BuildResult<NodeId> {
        let id = node.node_id;
        if let Some(existing) = self.nodes.get_mut(&id) {
            if existing.path != node.path {
                return Err(BuildError::HashCollision {
                    existing: existing.path.to_string(),
                    incoming: node.path.to_string(),
                });
            }
            if !existing.same_attributes(&node) {
                return Err(BuildError::NodeConflict {
                    node_id: id.to_string(),
                    path: node.path.to_string(),
                });
            }
            for label in node.extra_labels {
                existing.add_extra_label(label);
            }
            return Ok(id);
        }

        if node.label != NodeLabel::Folder {
            self.file_index
                .entry(node.path.fs_path().to_path_buf())
                .or_default()
                .push(id);
        }
        self.nodes.insert(id, node);
        Ok(id)
    }

    /// Insert an edge, idempotently. Both endpoints must already be nodes.
    ///
    /// The first edge to arrive for a given `(source, target, kind)` key
    /// decides `scope_text`.
    pub fn insert_relationship(&mut self, rel: Relationship) -> BuildResult<()> {
        if !self.nodes.contains_key(&rel.source_id) || !self.nodes.contains_key(&rel.target_id) {
            return Err(BuildError::DanglingEdge {
                edge_source: rel.source_id.to_string(),
                target: rel.target_id.to_string(),
                kind: rel.kind.to_string(),
            });
        }
        self.edges
            .entry((rel.source_id, rel.target_id, rel.kind))
            .or_insert(rel.scope_text);
        Ok(())
    }

    /// Attach a change label to an existing node.
    pub fn add_extra_label(&mut self, id: NodeId, label: ChangeLabel) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.add_extra_label(label);
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&CodeNode> {
        self.nodes.get(&id)
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &CodeNode> {
        self.nodes.values()
    }

    pub fn relationships(&self) -> impl Iterator<Item = Relationship> + '_ {
        self.edges.iter().map(|((s, t, k), scope)| Relationship {
            source_id: *s,
            target_id: *t,
            kind: *k,
            scope_text: scope.clone(),
        })
    }

    /// Ids of the non-folder nodes that live in `fs_path`.
    pub fn nodes_in_file(&self, fs_path: &Path) -> &[NodeId] {
        self.file_index
            .get(fs_path)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Export records in the persistence wire shape.
    pub fn exports(&self) -> (Vec<NodeExport>, Vec<RelationshipExport>) {
        let nodes = self.nodes.values().map(CodeNode::export).collect();
        let edges = self.relationships().map(|r| r.export()).collect();
        (nodes, edges)
    }

    /// Copy the stored graph into a petgraph structure for consumers that
    /// want traversal algorithms.
    pub fn to_petgraph(&self) -> Graph<CodeNode, RelationshipKind> {
        let mut g: Graph<CodeNode, RelationshipKind> = Graph::new();
        let mut index = HashMap::new();
        for (id, node) in &self.nodes {
            index.insert(*id, g.add_node(node.clone()));
        }
        for (s, t, k) in self.edges.keys() {
            if let (Some(&si), Some(&ti)) = (index.get(s), index.get(t)) {
                g.add_edge(si, ti, *k);
            }
        }
        g
    }
}
