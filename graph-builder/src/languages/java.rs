//! Java capture and classification rules.
//!
//! Captures classes, interfaces and records as classes, methods and
//! constructors as functions, enums as definitions. Both the `extends`
//! and `implements` positions classify as inheritance.

use crate::languages::{classify_by_tables, Classification, LanguageRules};
use crate::model::node::NodeLabel;
use crate::model::relationship::RelationshipKind;
use tree_sitter::Node;

const CLASSIFY_TABLE: &[(&str, RelationshipKind)] = &[
    ("object_creation_expression", RelationshipKind::Instantiates),
    ("method_invocation", RelationshipKind::Calls),
    ("import_declaration", RelationshipKind::Imports),
    ("superclass", RelationshipKind::Inherits),
    ("super_interfaces", RelationshipKind::Inherits),
    ("extends_interfaces", RelationshipKind::Inherits),
];

pub struct JavaRules;

impl LanguageRules for JavaRules {
    fn is_node_worth_capturing(&self, node: &Node) -> bool {
        matches!(
            node.kind(),
            "class_declaration"
                | "interface_declaration"
                | "record_declaration"
                | "enum_declaration"
                | "method_declaration"
                | "constructor_declaration"
        )
    }

    fn node_label_for_type(&self, kind: &str) -> NodeLabel {
        match kind {
            "class_declaration" | "interface_declaration" | "record_declaration" => {
                NodeLabel::Class
            }
            "method_declaration" | "constructor_declaration" => NodeLabel::Function,
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
        parser.set_language(&LanguageId::Java.grammar()).unwrap();
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
    fn object_creation_is_instantiates() {
        let src = "class A { void m() { Repo r = new Repo(); } }\n";
        let tree = parse(src);
        let site = ident_site(&tree, src, "new Repo()", "Repo");
        let c = JavaRules.classify(site, src.as_bytes(), NodeLabel::Class);
        assert_eq!(c.kind, RelationshipKind::Instantiates);
    }

    #[test]
    fn method_invocation_is_calls() {
        let src = "class A { void m() { save(); } }\n";
        let tree = parse(src);
        let site = ident_site(&tree, src, "save()", "save");
        let c = JavaRules.classify(site, src.as_bytes(), NodeLabel::Function);
        assert_eq!(c.kind, RelationshipKind::Calls);
    }

    #[test]
    fn import_declaration_is_imports() {
        let src = "import billing.Repo;\nclass A {}\n";
        let tree = parse(src);
        let site = ident_site(&tree, src, "billing.Repo", "Repo");
        let c = JavaRules.classify(site, src.as_bytes(), NodeLabel::Class);
        assert_eq!(c.kind, RelationshipKind::Imports);
    }

    #[test]
    fn extends_position_is_inherits() {
        let src = "class A extends Base {}\n";
        let tree = parse(src);
        let site = ident_site(&tree, src, "extends Base", "Base");
        let c = JavaRules.classify(site, src.as_bytes(), NodeLabel::Class);
        assert_eq!(c.kind, RelationshipKind::Inherits);
    }

    #[test]
    fn implements_position_is_inherits() {
        let src = "class A implements Store {}\n";
        let tree = parse(src);
        let site = ident_site(&tree, src, "implements Store", "Store");
        let c = JavaRules.classify(site, src.as_bytes(), NodeLabel::Class);
        assert_eq!(c.kind, RelationshipKind::Inherits);
    }
}
