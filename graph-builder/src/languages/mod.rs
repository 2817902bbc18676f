//! Language registry and per-language capability objects.
//!
//! Each supported language contributes a static [`LanguageRules`] object:
//! which AST nodes become graph nodes, how they are named, and how a
//! reference site maps to a relationship kind. Adding a language means
//! implementing the capability set and registering its extension/grammar/LSP
//! id here; no core component changes.

pub mod csharp;
pub mod go;
pub mod java;
pub mod javascript;
pub mod php;
pub mod python;
pub mod ruby;
pub mod typescript;

use crate::model::node::NodeLabel;
use crate::model::relationship::RelationshipKind;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::ops::Range;
use tree_sitter::{Language, Node};

/// Supported languages, detected by file extension.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageId {
    Python,
    Javascript,
    Typescript,
    Tsx,
    Ruby,
    Go,
    CSharp,
    Java,
    Php,
}

impl Display for LanguageId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.lsp_identifier())
    }
}

impl LanguageId {
    /// Best-effort detection by file extension (no leading dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        let e = ext.to_ascii_lowercase();
        match e.as_str() {
            "py" | "pyi" => Some(Self::Python),
            "js" | "mjs" | "cjs" | "jsx" => Some(Self::Javascript),
            "ts" | "mts" | "cts" => Some(Self::Typescript),
            "tsx" => Some(Self::Tsx),
            "rb" => Some(Self::Ruby),
            "go" => Some(Self::Go),
            "cs" => Some(Self::CSharp),
            "java" => Some(Self::Java),
            "php" => Some(Self::Php),
            _ => None,
        }
    }

    /// Language identifier per the LSP specification.
    pub fn lsp_identifier(&self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::Javascript => "javascript",
            Self::Typescript => "typescript",
            Self::Tsx => "typescriptreact",
            Self::Ruby => "ruby",
            Self::Go => "go",
            Self::CSharp => "csharp",
            Self::Java => "java",
            Self::Php => "php",
        }
    }

    /// Key grouping languages that share one language-server process.
    pub fn server_key(&self) -> &'static str {
        match self {
            Self::Javascript | Self::Typescript | Self::Tsx => "typescript",
            other => other.lsp_identifier(),
        }
    }

    /// Tree-sitter grammar for this language.
    pub fn grammar(&self) -> Language {
        match self {
            Self::Python => tree_sitter_python::LANGUAGE.into(),
            Self::Javascript => tree_sitter_javascript::LANGUAGE.into(),
            Self::Typescript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Self::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Self::Ruby => tree_sitter_ruby::LANGUAGE.into(),
            Self::Go => tree_sitter_go::LANGUAGE.into(),
            Self::CSharp => tree_sitter_c_sharp::LANGUAGE.into(),
            Self::Java => tree_sitter_java::LANGUAGE.into(),
            Self::Php => tree_sitter_php::LANGUAGE_PHP.into(),
        }
    }

    /// Capability object with this language's capture and classify rules.
    pub fn rules(&self) -> &'static dyn LanguageRules {
        match self {
            Self::Python => &python::PythonRules,
            Self::Javascript => &javascript::JavascriptRules,
            Self::Typescript | Self::Tsx => &typescript::TypescriptRules,
            Self::Ruby => &ruby::RubyRules,
            Self::Go => &go::GoRules,
            Self::CSharp => &csharp::CSharpRules,
            Self::Java => &java::JavaRules,
            Self::Php => &php::PhpRules,
        }
    }

    pub fn all() -> &'static [LanguageId] {
        &[
            Self::Python,
            Self::Javascript,
            Self::Typescript,
            Self::Tsx,
            Self::Ruby,
            Self::Go,
            Self::CSharp,
            Self::Java,
            Self::Php,
        ]
    }
}

/// Outcome of classifying a reference site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub kind: RelationshipKind,
    /// Byte range of the enclosing syntactic region, for `scope_text`.
    pub scope: Option<Range<usize>>,
}

impl Classification {
    pub fn new(kind: RelationshipKind, scope: Option<Range<usize>>) -> Self {
        Self { kind, scope }
    }
}

/// Per-language capability set.
///
/// All methods are pure; rules objects are static and stateless.
pub trait LanguageRules: Send + Sync {
    /// Whether this AST node becomes a graph node.
    fn is_node_worth_capturing(&self, node: &Node) -> bool;

    /// Graph label for a capturable node kind.
    fn node_label_for_type(&self, kind: &str) -> NodeLabel;

    /// The identifier sub-node that names a capturable node.
    fn identifier_of<'t>(&self, node: Node<'t>) -> Option<Node<'t>> {
        node.child_by_field_name("name")
    }

    /// The node whose range provides span and text.
    fn body_of<'t>(&self, node: Node<'t>) -> Node<'t> {
        node
    }

    /// Walk upward from a reference site and determine the edge kind.
    fn classify(&self, site: Node, source: &[u8], target_label: NodeLabel) -> Classification;
}

/// Rules object for unknown extensions: hierarchy only, no semantics.
pub struct FallbackRules;

impl LanguageRules for FallbackRules {
    fn is_node_worth_capturing(&self, _node: &Node) -> bool {
        false
    }

    fn node_label_for_type(&self, _kind: &str) -> NodeLabel {
        NodeLabel::Definition
    }

    fn classify(&self, _site: Node, _source: &[u8], target_label: NodeLabel) -> Classification {
        Classification::new(unmatched_kind(target_label), None)
    }
}

/// Rules for an extension: a registered language's capability object, or
/// the fallback (hierarchy only) for everything else.
pub fn rules_for_extension(ext: &str) -> &'static dyn LanguageRules {
    match LanguageId::from_extension(ext) {
        Some(language) => language.rules(),
        None => &FallbackRules,
    }
}

/// Edge kind when the upward walk reaches the file root with no match:
/// plain `REFERENCES`, or `USES` for generic identifiers without call or
/// member context.
pub(crate) fn unmatched_kind(target_label: NodeLabel) -> RelationshipKind {
    match target_label {
        NodeLabel::Definition => RelationshipKind::Uses,
        _ => RelationshipKind::References,
    }
}

/// Shared upward walk over a site's ancestors.
///
/// At each ancestor the `special` hook runs first (context-sensitive
/// entries such as assignment left-hand sides), then the ordered kind
/// tables; the first match wins and its ancestor provides the scope range.
pub(crate) fn classify_by_tables(
    site: Node,
    target_label: NodeLabel,
    special: impl Fn(Node, Node, NodeLabel) -> Option<Classification>,
    tables: &[&[(&str, RelationshipKind)]],
) -> Classification {
    let mut current = site;
    while let Some(ancestor) = current.parent() {
        if let Some(hit) = special(site, ancestor, target_label) {
            return hit;
        }
        for table in tables {
            for (pattern, kind) in *table {
                if ancestor.kind() == *pattern {
                    return Classification::new(*kind, Some(ancestor.byte_range()));
                }
            }
        }
        current = ancestor;
    }
    Classification::new(unmatched_kind(target_label), None)
}

/// True if `inner` sits inside the given field of `outer`.
pub(crate) fn within_field(outer: Node, field: &str, inner: Node) -> bool {
    outer
        .child_by_field_name(field)
        .map(|f| f.byte_range().start <= inner.start_byte() && inner.end_byte() <= f.byte_range().end)
        .unwrap_or(false)
}

/// Node text helper shared by the rules modules.
pub(crate) fn node_text<'s>(node: Node, source: &'s [u8]) -> &'s str {
    node.utf8_text(source).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_lookup_covers_the_registry() {
        assert_eq!(LanguageId::from_extension("py"), Some(LanguageId::Python));
        assert_eq!(LanguageId::from_extension("TSX"), Some(LanguageId::Tsx));
        assert_eq!(LanguageId::from_extension("rb"), Some(LanguageId::Ruby));
        assert_eq!(LanguageId::from_extension("cs"), Some(LanguageId::CSharp));
        assert_eq!(LanguageId::from_extension("dart"), None);
    }

    #[test]
    fn web_languages_share_one_server() {
        assert_eq!(LanguageId::Javascript.server_key(), "typescript");
        assert_eq!(LanguageId::Tsx.server_key(), "typescript");
        assert_eq!(LanguageId::Go.server_key(), "go");
    }

    #[test]
    fn unknown_extensions_fall_back_to_hierarchy_only_rules() {
        let rules = rules_for_extension("xyz");
        let mut parser = tree_sitter::Parser::new();
        parser.set_language(&LanguageId::Python.grammar()).unwrap();
        let tree = parser.parse("def f():\n    pass\n", None).unwrap();
        assert!(!rules.is_node_worth_capturing(&tree.root_node().child(0).unwrap()));
        assert_eq!(
            rules.node_label_for_type("function_definition"),
            NodeLabel::Definition
        );
    }

    #[test]
    fn unmatched_walk_distinguishes_uses_from_references() {
        assert_eq!(unmatched_kind(NodeLabel::Definition), RelationshipKind::Uses);
        assert_eq!(unmatched_kind(NodeLabel::Class), RelationshipKind::References);
        assert_eq!(
            unmatched_kind(NodeLabel::Function),
            RelationshipKind::References
        );
    }
}
