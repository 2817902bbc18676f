//! Graph vertex model and its export schema.
//!
//! `CodeNode` is the unified vertex for folders, files and code entities.
//! The export shapes at the bottom are part of the persisted artifact
//! contract; avoid renaming fields or enum variants.

use crate::model::environment::{GraphEnvironment, NodeId};
use crate::model::path::NodePath;
use crate::model::span::Span;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Primary label of a graph vertex.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeLabel {
    Folder,
    File,
    Class,
    Function,
    Definition,
}

impl Display for NodeLabel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            NodeLabel::Folder => "FOLDER",
            NodeLabel::File => "FILE",
            NodeLabel::Class => "CLASS",
            NodeLabel::Function => "FUNCTION",
            NodeLabel::Definition => "DEFINITION",
        })
    }
}

/// Additional labels attached additively by diff builds.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeLabel {
    Added,
    Modified,
    Deleted,
}

impl Display for ChangeLabel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ChangeLabel::Added => "ADDED",
            ChangeLabel::Modified => "MODIFIED",
            ChangeLabel::Deleted => "DELETED",
        })
    }
}

/// A vertex of the code graph.
///
/// Folder nodes carry no span or text; the file span is optional. Within a
/// build a node is immutable except for additive `extra_labels`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeNode {
    pub label: NodeLabel,
    pub path: NodePath,
    pub name: String,
    /// Depth in the containment tree; the project root folder is level 0.
    pub level: usize,
    #[serde(default)]
    pub span: Option<Span>,
    #[serde(default)]
    pub text: Option<String>,
    pub node_id: NodeId,
    pub environment: GraphEnvironment,
    #[serde(default)]
    pub extra_labels: Vec<ChangeLabel>,
}

impl CodeNode {
    /// Construct a node, deriving its id from `(environment, path)`.
    pub fn new(
        label: NodeLabel,
        path: NodePath,
        name: impl Into<String>,
        level: usize,
        environment: GraphEnvironment,
    ) -> Self {
        let node_id = NodeId::derive(&environment, &path.to_string());
        Self {
            label,
            path,
            name: name.into(),
            level,
            span: None,
            text: None,
            node_id,
            environment,
            extra_labels: Vec::new(),
        }
    }

    pub fn with_span(mut self, span: Span, text: impl Into<String>) -> Self {
        self.span = Some(span);
        self.text = Some(text.into());
        self
    }

    /// Attach a change label, keeping the list duplicate-free.
    pub fn add_extra_label(&mut self, label: ChangeLabel) {
        if !self.extra_labels.contains(&label) {
            self.extra_labels.push(label);
        }
    }

    /// True when both nodes would upsert to the same record.
    ///
    /// `extra_labels` are additive and excluded from the comparison.
    pub fn same_attributes(&self, other: &CodeNode) -> bool {
        self.label == other.label
            && self.path == other.path
            && self.name == other.name
            && self.level == other.level
            && self.span == other.span
            && self.text == other.text
            && self.environment == other.environment
    }

    pub fn export(&self) -> NodeExport {
        NodeExport {
            r#type: self.label.to_string(),
            extra_labels: self.extra_labels.iter().map(|l| l.to_string()).collect(),
            attributes: NodeAttributes {
                label: self.label.to_string(),
                path: self.path.to_string(),
                node_id: self.node_id.to_string(),
                name: self.name.clone(),
                level: self.level,
                start_line: self.span.map(|s| s.start_line),
                end_line: self.span.map(|s| s.end_line),
                text: self.text.clone(),
            },
        }
    }
}

/// Node record as consumed by the persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeExport {
    pub r#type: String,
    pub extra_labels: Vec<String>,
    pub attributes: NodeAttributes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeAttributes {
    pub label: String,
    pub path: String,
    pub node_id: String,
    pub name: String,
    pub level: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}
