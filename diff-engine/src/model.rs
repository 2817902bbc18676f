//! Change records consumed by the update engine and its result shape.

use graph_builder::model::node::{ChangeLabel, NodeExport};
use graph_builder::model::relationship::RelationshipExport;
use graph_builder::model::warning::Warning;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How a file changed between the base tree and the patched tree.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

impl ChangeKind {
    pub fn label(&self) -> ChangeLabel {
        match self {
            ChangeKind::Added => ChangeLabel::Added,
            ChangeKind::Modified => ChangeLabel::Modified,
            ChangeKind::Deleted => ChangeLabel::Deleted,
        }
    }
}

/// One changed file, as reported by the change-request provider.
///
/// `path` may be absolute or relative to the configured root. `diff_text`
/// is the file's unified diff and is used for diagnostics and binary
/// detection only; node-level change decisions compare source text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDiff {
    pub path: PathBuf,
    pub change_type: ChangeKind,
    #[serde(default)]
    pub diff_text: String,
}

impl FileDiff {
    pub fn new(path: impl Into<PathBuf>, change_type: ChangeKind, diff_text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            change_type,
            diff_text: diff_text.into(),
        }
    }
}

/// Prior source slice at a hierarchical node path, from the persisted
/// graph. Enables change decisions below file granularity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviousNodeState {
    /// Hierarchical locator string, e.g. `file:///r/m.py#b`.
    pub node_path: String,
    pub code_text: String,
}

impl PreviousNodeState {
    pub fn new(node_path: impl Into<String>, code_text: impl Into<String>) -> Self {
        Self {
            node_path: node_path.into(),
            code_text: code_text.into(),
        }
    }
}

/// Partial graph for a change set, plus the edges that leave it.
///
/// External relationships point from a node of the partial graph to a node
/// of the persisted base graph; the caller is responsible for upsert
/// semantics when merging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateResult {
    pub nodes: Vec<NodeExport>,
    pub relationships: Vec<RelationshipExport>,
    pub external_relationships: Vec<RelationshipExport>,
    pub warnings: Vec<Warning>,
}
