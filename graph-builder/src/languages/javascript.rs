//! JavaScript capture and classification rules.
//!
//! Captures classes, function declarations, methods, and variable
//! declarators whose value is a function (the common `const f = () => …`
//! form). `new_expression` outranks `call_expression` by ancestor
//! proximity, so constructions never double-report as calls.

use crate::languages::{
    classify_by_tables, within_field, Classification, LanguageRules,
};
use crate::model::node::NodeLabel;
use crate::model::relationship::RelationshipKind;
use tree_sitter::Node;

pub(crate) const CLASSIFY_TABLE: &[(&str, RelationshipKind)] = &[
    ("new_expression", RelationshipKind::Instantiates),
    ("call_expression", RelationshipKind::Calls),
    ("class_heritage", RelationshipKind::Inherits),
    ("import_specifier", RelationshipKind::Imports),
    ("import_clause", RelationshipKind::Imports),
    ("import_statement", RelationshipKind::Imports),
];

pub struct JavascriptRules;

impl LanguageRules for JavascriptRules {
    fn is_node_worth_capturing(&self, node: &Node) -> bool {
        is_capturable(node)
    }

    fn node_label_for_type(&self, kind: &str) -> NodeLabel {
        node_label(kind)
    }

    fn classify(&self, site: Node, _source: &[u8], target_label: NodeLabel) -> Classification {
        classify_by_tables(site, target_label, special, &[CLASSIFY_TABLE])
    }
}

pub(crate) fn is_capturable(node: &Node) -> bool {
    match node.kind() {
        "class_declaration"
        | "function_declaration"
        | "generator_function_declaration"
        | "method_definition" => true,
        "variable_declarator" => declares_function(node),
        _ => false,
    }
}

pub(crate) fn node_label(kind: &str) -> NodeLabel {
    match kind {
        "class_declaration" => NodeLabel::Class,
        "function_declaration" | "generator_function_declaration" | "method_definition" => {
            NodeLabel::Function
        }
        "variable_declarator" => NodeLabel::Function,
        _ => NodeLabel::Definition,
    }
}

/// `const f = () => …` and `const f = function …` count as functions.
fn declares_function(node: &Node) -> bool {
    node.child_by_field_name("value")
        .map(|v| matches!(v.kind(), "arrow_function" | "function_expression"))
        .unwrap_or(false)
}

pub(crate) fn special(site: Node, ancestor: Node, _target_label: NodeLabel) -> Option<Classification> {
    if ancestor.kind() == "assignment_expression" && within_field(ancestor, "left", site) {
        return Some(Classification::new(
            RelationshipKind::Assigns,
            Some(ancestor.byte_range()),
        ));
    }
    None
}
