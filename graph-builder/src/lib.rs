//! Structural code-graph construction.
//!
//! Walks a repository, parses supported languages with Tree-sitter, and
//! assembles a containment graph of folders, files, classes, functions and
//! definitions with stable, environment-scoped identities. Reference
//! resolution over this graph lives in the `lsp-resolver` crate; diff
//! builds live in `diff-engine`.

pub mod builder;
pub mod config;
pub mod errors;
pub mod export;
pub mod graph;
pub mod hierarchy;
pub mod languages;
pub mod model;
pub mod parse;
pub mod summary;
pub mod walk;

pub use builder::{build_hierarchy, GraphBuild, HierarchyBuild};
pub use config::BuildConfig;
pub use errors::{BuildError, BuildResult};
