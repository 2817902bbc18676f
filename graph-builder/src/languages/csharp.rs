//! C# capture and classification rules.
//!
//! Captures classes, interfaces, records and structs as classes, methods
//! and constructors as functions, and enums as plain definitions.

use crate::languages::{classify_by_tables, Classification, LanguageRules};
use crate::model::node::NodeLabel;
use crate::model::relationship::RelationshipKind;
use tree_sitter::Node;

const CLASSIFY_TABLE: &[(&str, RelationshipKind)] = &[
    ("object_creation_expression", RelationshipKind::Instantiates),
    ("base_list", RelationshipKind::Inherits),
    ("using_directive", RelationshipKind::Imports),
    ("invocation_expression", RelationshipKind::Calls),
];

pub struct CSharpRules;

impl LanguageRules for CSharpRules {
    fn is_node_worth_capturing(&self, node: &Node) -> bool {
        matches!(
            node.kind(),
            "class_declaration"
                | "interface_declaration"
                | "record_declaration"
                | "struct_declaration"
                | "enum_declaration"
                | "method_declaration"
                | "constructor_declaration"
                | "local_function_statement"
        )
    }

    fn node_label_for_type(&self, kind: &str) -> NodeLabel {
        match kind {
            "class_declaration" | "interface_declaration" | "record_declaration"
            | "struct_declaration" => NodeLabel::Class,
            "method_declaration" | "constructor_declaration" | "local_function_statement" => {
                NodeLabel::Function
            }
            _ => NodeLabel::Definition,
        }
    }

    fn classify(&self, site: Node, _source: &[u8], target_label: NodeLabel) -> Classification {
        classify_by_tables(site, target_label, |_, _, _| None, &[CLASSIFY_TABLE])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::LanguageId;
    use tree_sitter::{Parser, Tree};

    fn parse(src: &str) -> Tree {
        let mut parser = Parser::new();
        parser.set_language(&LanguageId::CSharp.grammar()).unwrap();
        parser.parse(src, None).unwrap()
    }

    fn ident_site<'t>(tree: &'t Tree, src: &str, context: &str, ident: &str) -> tree_sitter::Node<'t> {
        let base = src.find(context).expect("context present");
        let off = base + context.find(ident).expect("ident in context");
        tree.root_node()
            .named_descendant_for_byte_range(off, off + ident.len())
            .expect("site node")
    }

    #[test]
    fn captures_type_and_member_declarations() {
        let src = "record Point(int X);\n\nclass Repo {\n    Repo() {}\n    void Save() {}\n}\n";
        let tree = parse(src);
        let record = ident_site(&tree, src, "record Point", "Point").parent().unwrap();
        assert_eq!(record.kind(), "record_declaration");
        assert!(CSharpRules.is_node_worth_capturing(&record));
        assert_eq!(
            CSharpRules.node_label_for_type("record_declaration"),
            NodeLabel::Class
        );
        assert_eq!(
            CSharpRules.node_label_for_type("constructor_declaration"),
            NodeLabel::Function
        );
    }

    #[test]
    fn object_creation_is_instantiates() {
        let src = "class A { void M() { var r = new Repo(); } }\n";
        let tree = parse(src);
        let site = ident_site(&tree, src, "new Repo()", "Repo");
        let c = CSharpRules.classify(site, src.as_bytes(), NodeLabel::Class);
        assert_eq!(c.kind, RelationshipKind::Instantiates);
    }

    #[test]
    fn base_list_is_inherits() {
        let src = "class Repo : IStore {}\n";
        let tree = parse(src);
        let site = ident_site(&tree, src, ": IStore", "IStore");
        let c = CSharpRules.classify(site, src.as_bytes(), NodeLabel::Class);
        assert_eq!(c.kind, RelationshipKind::Inherits);
    }

    #[test]
    fn using_directive_is_imports() {
        let src = "using Billing.Core;\n";
        let tree = parse(src);
        let site = ident_site(&tree, src, "Billing.Core", "Billing");
        let c = CSharpRules.classify(site, src.as_bytes(), NodeLabel::Definition);
        assert_eq!(c.kind, RelationshipKind::Imports);
    }

    #[test]
    fn invocation_is_calls() {
        let src = "class A { void M() { Save(); } }\n";
        let tree = parse(src);
        let site = ident_site(&tree, src, "Save()", "Save");
        let c = CSharpRules.classify(site, src.as_bytes(), NodeLabel::Function);
        assert_eq!(c.kind, RelationshipKind::Calls);
    }
}
