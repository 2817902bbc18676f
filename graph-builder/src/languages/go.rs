//! Go capture and classification rules.
//!
//! Captures type specs and aliases as classes, plus function and method
//! declarations. `T{…}` composite literals are constructions.

use crate::languages::{classify_by_tables, Classification, LanguageRules};
use crate::model::node::NodeLabel;
use crate::model::relationship::RelationshipKind;
use tree_sitter::Node;

const CLASSIFY_TABLE: &[(&str, RelationshipKind)] = &[
    ("composite_literal", RelationshipKind::Instantiates),
    ("import_declaration", RelationshipKind::Imports),
    ("import_spec", RelationshipKind::Imports),
    ("call_expression", RelationshipKind::Calls),
];

pub struct GoRules;

impl LanguageRules for GoRules {
    fn is_node_worth_capturing(&self, node: &Node) -> bool {
        matches!(
            node.kind(),
            "type_spec" | "type_alias" | "function_declaration" | "method_declaration"
        )
    }

    fn node_label_for_type(&self, kind: &str) -> NodeLabel {
        match kind {
            "type_spec" | "type_alias" => NodeLabel::Class,
            "function_declaration" | "method_declaration" => NodeLabel::Function,
            _ => NodeLabel::Definition,
        }
    }

    fn classify(&self, site: Node, _source: &[u8], target_label: NodeLabel) -> Classification {
        classify_by_tables(site, target_label, |_, _, _| None, &[CLASSIFY_TABLE])
    }
}
