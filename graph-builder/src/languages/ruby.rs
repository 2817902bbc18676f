//! Ruby capture and classification rules.
//!
//! Captures classes, modules, and both instance and singleton methods.
//! `Klass.new` is a construction: a `call` ancestor whose method is the
//! literal `new` classifies as INSTANTIATES before the generic call entry.

use crate::languages::{classify_by_tables, node_text, Classification, LanguageRules};
use crate::model::node::NodeLabel;
use crate::model::relationship::RelationshipKind;
use tree_sitter::Node;

const CLASSIFY_TABLE: &[(&str, RelationshipKind)] = &[
    ("superclass", RelationshipKind::Inherits),
    ("call", RelationshipKind::Calls),
];

pub struct RubyRules;

impl LanguageRules for RubyRules {
    fn is_node_worth_capturing(&self, node: &Node) -> bool {
        matches!(node.kind(), "class" | "module" | "method" | "singleton_method")
    }

    fn node_label_for_type(&self, kind: &str) -> NodeLabel {
        match kind {
            "class" => NodeLabel::Class,
            "method" | "singleton_method" => NodeLabel::Function,
            _ => NodeLabel::Definition,
        }
    }

    fn classify(&self, site: Node, source: &[u8], target_label: NodeLabel) -> Classification {
        let special = |_site: Node, ancestor: Node, _label: NodeLabel| {
            if ancestor.kind() == "call"
                && ancestor
                    .child_by_field_name("method")
                    .map(|m| node_text(m, source) == "new")
                    .unwrap_or(false)
            {
                return Some(Classification::new(
                    RelationshipKind::Instantiates,
                    Some(ancestor.byte_range()),
                ));
            }
            None
        };
        classify_by_tables(site, target_label, special, &[CLASSIFY_TABLE])
    }
}
