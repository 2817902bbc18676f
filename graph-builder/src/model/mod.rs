//! Data model shared across the pipeline: vertices, edges, locators,
//! environments, spans and warnings.

pub mod environment;
pub mod node;
pub mod path;
pub mod relationship;
pub mod span;
pub mod warning;

pub use environment::{EnvironmentLayer, GraphEnvironment, NodeId};
pub use node::{ChangeLabel, CodeNode, NodeAttributes, NodeExport, NodeLabel};
pub use path::NodePath;
pub use relationship::{Relationship, RelationshipExport, RelationshipKind};
pub use span::Span;
pub use warning::{Warning, WarningKind};
