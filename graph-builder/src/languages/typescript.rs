//! TypeScript (and TSX) capture and classification rules.
//!
//! Composes the JavaScript tables by concatenation: TypeScript-specific
//! entries are consulted first, then everything JavaScript knows. The same
//! rules object serves `.ts` and `.tsx`; only the grammar differs.

use crate::languages::{classify_by_tables, javascript, Classification, LanguageRules};
use crate::model::node::NodeLabel;
use crate::model::relationship::RelationshipKind;
use tree_sitter::Node;

const TS_CLASSIFY_TABLE: &[(&str, RelationshipKind)] = &[
    ("extends_clause", RelationshipKind::Inherits),
    ("implements_clause", RelationshipKind::Inherits),
    ("extends_type_clause", RelationshipKind::Inherits),
    ("type_annotation", RelationshipKind::Types),
    ("import_require_clause", RelationshipKind::Imports),
];

pub struct TypescriptRules;

impl LanguageRules for TypescriptRules {
    fn is_node_worth_capturing(&self, node: &Node) -> bool {
        match node.kind() {
            "interface_declaration" | "abstract_class_declaration" => true,
            "type_alias_declaration" | "enum_declaration" => true,
            _ => javascript::is_capturable(node),
        }
    }

    fn node_label_for_type(&self, kind: &str) -> NodeLabel {
        match kind {
            "interface_declaration" | "abstract_class_declaration" => NodeLabel::Class,
            "type_alias_declaration" | "enum_declaration" => NodeLabel::Definition,
            _ => javascript::node_label(kind),
        }
    }

    fn classify(&self, site: Node, _source: &[u8], target_label: NodeLabel) -> Classification {
        classify_by_tables(
            site,
            target_label,
            javascript::special,
            &[TS_CLASSIFY_TABLE, javascript::CLASSIFY_TABLE],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::LanguageId;
    use tree_sitter::{Parser, Tree};

    fn parse(src: &str) -> Tree {
        let mut parser = Parser::new();
        parser
            .set_language(&LanguageId::Typescript.grammar())
            .unwrap();
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
    fn interface_is_captured_as_class() {
        let src = "interface Shape { area(): number }\n";
        let tree = parse(src);
        let decl = ident_site(&tree, src, "interface Shape", "Shape")
            .parent()
            .unwrap();
        assert_eq!(decl.kind(), "interface_declaration");
        assert!(TypescriptRules.is_node_worth_capturing(&decl));
        assert_eq!(
            TypescriptRules.node_label_for_type(decl.kind()),
            NodeLabel::Class
        );
    }

    #[test]
    fn type_annotation_is_types() {
        let src = "let s: Shape;\n";
        let tree = parse(src);
        let site = ident_site(&tree, src, ": Shape", "Shape");
        let c = TypescriptRules.classify(site, src.as_bytes(), NodeLabel::Class);
        assert_eq!(c.kind, RelationshipKind::Types);
    }

    #[test]
    fn extends_clause_is_inherits() {
        let src = "class C extends P {}\n";
        let tree = parse(src);
        let site = ident_site(&tree, src, "extends P", "P");
        let c = TypescriptRules.classify(site, src.as_bytes(), NodeLabel::Class);
        assert_eq!(c.kind, RelationshipKind::Inherits);
    }

    #[test]
    fn implements_clause_is_inherits() {
        let src = "class C implements Shape {}\n";
        let tree = parse(src);
        let site = ident_site(&tree, src, "implements Shape", "Shape");
        let c = TypescriptRules.classify(site, src.as_bytes(), NodeLabel::Class);
        assert_eq!(c.kind, RelationshipKind::Inherits);
    }

    #[test]
    fn javascript_table_still_applies() {
        let src = "import {P} from './p';\nconst x = new P();\n";
        let tree = parse(src);
        let imp = ident_site(&tree, src, "{P}", "P");
        assert_eq!(
            TypescriptRules
                .classify(imp, src.as_bytes(), NodeLabel::Class)
                .kind,
            RelationshipKind::Imports
        );
        let inst = ident_site(&tree, src, "new P()", "P");
        assert_eq!(
            TypescriptRules
                .classify(inst, src.as_bytes(), NodeLabel::Class)
                .kind,
            RelationshipKind::Instantiates
        );
    }
}
