//! Crate-wide error hierarchy for graph-builder.
//!
//! Only conditions that must abort a build live here; recoverable problems
//! are reported as [`crate::model::Warning`]s on the build result.

use std::path::PathBuf;
use thiserror::Error;

/// Convenient alias for crate-wide results.
pub type BuildResult<T> = Result<T, BuildError>;

/// Fatal build failure.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Bad caller-supplied configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configured root path does not exist.
    #[error("root path not found: {0}")]
    RootNotFound(PathBuf),

    /// Two distinct paths hashed to the same node id.
    #[error("node id collision between '{existing}' and '{incoming}'")]
    HashCollision { existing: String, incoming: String },

    /// The same node id was inserted twice with different attributes.
    #[error("conflicting attributes for node id {node_id} at '{path}'")]
    NodeConflict { node_id: String, path: String },

    /// An edge was inserted before one of its endpoints.
    #[error("edge {kind} from {edge_source} to {target} references a missing node")]
    DanglingEdge {
        edge_source: String,
        target: String,
        kind: String,
    },

    /// Filesystem failure outside the tolerated (logged + skipped) cases.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Tree-sitter rejected a grammar; indicates a build/link problem.
    #[error("tree-sitter language error: {0}")]
    Language(#[from] tree_sitter::LanguageError),

    /// Export serialization failure.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
