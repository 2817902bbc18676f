//! Diff-driven partial graph builds.
//!
//! Consumes file-level change records for a patched working tree and
//! produces an additive, mergeable delta: changed subtrees under the
//! pull-request environment, parent chains under the base environment,
//! and the external edges a persistence layer needs to stitch the delta
//! into an existing graph.

pub mod model;
pub mod patch;
pub mod update;

pub use model::{ChangeKind, FileDiff, PreviousNodeState, UpdateResult};
pub use update::UpdateBuilder;
