//! Graph edge model and its export schema.
//!
//! Edges store endpoint ids, never back-pointers, so cycles in semantic
//! edges (mutual recursion and the like) are unproblematic. The exported
//! variant names are part of the persisted artifact contract.

use crate::model::environment::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Kind of a directed relationship between two code nodes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipKind {
    Contains,
    Calls,
    Imports,
    Inherits,
    Instantiates,
    Types,
    Assigns,
    References,
    Uses,
    Modified,
    Added,
    Deleted,
}

impl Display for RelationshipKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            RelationshipKind::Contains => "CONTAINS",
            RelationshipKind::Calls => "CALLS",
            RelationshipKind::Imports => "IMPORTS",
            RelationshipKind::Inherits => "INHERITS",
            RelationshipKind::Instantiates => "INSTANTIATES",
            RelationshipKind::Types => "TYPES",
            RelationshipKind::Assigns => "ASSIGNS",
            RelationshipKind::References => "REFERENCES",
            RelationshipKind::Uses => "USES",
            RelationshipKind::Modified => "MODIFIED",
            RelationshipKind::Added => "ADDED",
            RelationshipKind::Deleted => "DELETED",
        })
    }
}

/// A directed edge `(source, target, kind)` with an optional syntactic scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub source_id: NodeId,
    pub target_id: NodeId,
    pub kind: RelationshipKind,
    /// Source slice of the syntactic region the reference occurred in.
    #[serde(default)]
    pub scope_text: Option<String>,
}

impl Relationship {
    pub fn new(source_id: NodeId, target_id: NodeId, kind: RelationshipKind) -> Self {
        Self {
            source_id,
            target_id,
            kind,
            scope_text: None,
        }
    }

    pub fn with_scope(mut self, scope_text: impl Into<String>) -> Self {
        self.scope_text = Some(scope_text.into());
        self
    }

    pub fn export(&self) -> RelationshipExport {
        RelationshipExport {
            source_id: self.source_id.to_string(),
            target_id: self.target_id.to_string(),
            r#type: self.kind.to_string(),
            scope_text: self.scope_text.clone(),
        }
    }
}

/// Edge record as consumed by the persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipExport {
    pub source_id: String,
    pub target_id: String,
    pub r#type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope_text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::environment::{EnvironmentLayer, GraphEnvironment};

    #[test]
    fn export_uses_camel_case_wire_names() {
        let env = GraphEnvironment::new("e", None, EnvironmentLayer::Base);
        let a = NodeId::derive(&env, "file:///r/a.py");
        let b = NodeId::derive(&env, "file:///r/a.py#f");
        let rel = Relationship::new(a, b, RelationshipKind::Contains);
        let json = serde_json::to_value(rel.export()).unwrap();
        assert_eq!(json["type"], "CONTAINS");
        assert!(json.get("sourceId").is_some());
        assert!(json.get("targetId").is_some());
        assert!(json.get("scopeText").is_none());
    }
}
