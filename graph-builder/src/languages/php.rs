//! PHP capture and classification rules.
//!
//! Captures classes, interfaces and traits plus functions and methods.
//! Call-shaped sites against CLASS targets downgrade to INSTANTIATES, the
//! same construction rule Python applies.

use crate::languages::{classify_by_tables, Classification, LanguageRules};
use crate::model::node::NodeLabel;
use crate::model::relationship::RelationshipKind;
use tree_sitter::Node;

const CLASSIFY_TABLE: &[(&str, RelationshipKind)] = &[
    ("object_creation_expression", RelationshipKind::Instantiates),
    ("base_clause", RelationshipKind::Inherits),
    ("class_interface_clause", RelationshipKind::Inherits),
    ("function_call_expression", RelationshipKind::Calls),
    ("member_call_expression", RelationshipKind::Calls),
    ("scoped_call_expression", RelationshipKind::Calls),
    ("namespace_use_declaration", RelationshipKind::Imports),
];

const CALL_KINDS: &[&str] = &[
    "function_call_expression",
    "member_call_expression",
    "scoped_call_expression",
];

pub struct PhpRules;

impl LanguageRules for PhpRules {
    fn is_node_worth_capturing(&self, node: &Node) -> bool {
        matches!(
            node.kind(),
            "class_declaration"
                | "interface_declaration"
                | "trait_declaration"
                | "function_definition"
                | "method_declaration"
        )
    }

    fn node_label_for_type(&self, kind: &str) -> NodeLabel {
        match kind {
            "class_declaration" | "interface_declaration" => NodeLabel::Class,
            "function_definition" | "method_declaration" => NodeLabel::Function,
            _ => NodeLabel::Definition,
        }
    }

    fn classify(&self, site: Node, _source: &[u8], target_label: NodeLabel) -> Classification {
        classify_by_tables(site, target_label, special, &[CLASSIFY_TABLE])
    }
}

fn special(_site: Node, ancestor: Node, target_label: NodeLabel) -> Option<Classification> {
    if target_label == NodeLabel::Class && CALL_KINDS.contains(&ancestor.kind()) {
        return Some(Classification::new(
            RelationshipKind::Instantiates,
            Some(ancestor.byte_range()),
        ));
    }
    None
}
