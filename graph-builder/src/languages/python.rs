//! Python capture and classification rules.
//!
//! Captures `class_definition` and `function_definition`. Classification
//! walks from the reference site upward: call sites against CLASS targets
//! are constructions (`ClassName()` builds an instance in Python), the
//! `superclasses` argument list of a class definition is inheritance, and
//! assignment left-hand sides are ASSIGNS. F-string interpolations need no
//! special entry: an interpolated call still has a `call` ancestor below
//! the `interpolation` node.

use crate::languages::{
    classify_by_tables, within_field, Classification, LanguageRules,
};
use crate::model::node::NodeLabel;
use crate::model::relationship::RelationshipKind;
use tree_sitter::Node;

const CLASSIFY_TABLE: &[(&str, RelationshipKind)] = &[
    ("call", RelationshipKind::Calls),
    ("import_from_statement", RelationshipKind::Imports),
    ("import_statement", RelationshipKind::Imports),
    ("aliased_import", RelationshipKind::Imports),
    ("type", RelationshipKind::Types),
];

pub struct PythonRules;

impl LanguageRules for PythonRules {
    fn is_node_worth_capturing(&self, node: &Node) -> bool {
        matches!(node.kind(), "class_definition" | "function_definition")
    }

    fn node_label_for_type(&self, kind: &str) -> NodeLabel {
        match kind {
            "class_definition" => NodeLabel::Class,
            "function_definition" => NodeLabel::Function,
            _ => NodeLabel::Definition,
        }
    }

    fn classify(&self, site: Node, _source: &[u8], target_label: NodeLabel) -> Classification {
        classify_by_tables(site, target_label, special, &[CLASSIFY_TABLE])
    }
}

fn special(site: Node, ancestor: Node, target_label: NodeLabel) -> Option<Classification> {
    match ancestor.kind() {
        // `ClassName()` denotes construction, not a plain call.
        "call" if target_label == NodeLabel::Class => Some(Classification::new(
            RelationshipKind::Instantiates,
            Some(ancestor.byte_range()),
        )),
        "assignment" if within_field(ancestor, "left", site) => Some(Classification::new(
            RelationshipKind::Assigns,
            Some(ancestor.byte_range()),
        )),
        // The argument list of `class C(Base):` is the superclass list.
        "argument_list" => {
            let parent = ancestor.parent()?;
            if parent.kind() == "class_definition"
                && parent
                    .child_by_field_name("superclasses")
                    .map(|s| s.id() == ancestor.id())
                    .unwrap_or(false)
            {
                return Some(Classification::new(
                    RelationshipKind::Inherits,
                    Some(ancestor.byte_range()),
                ));
            }
            None
        }
        _ => None,
    }
}
