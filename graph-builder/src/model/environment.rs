//! Logical namespaces and deterministic node identities.
//!
//! Every node id is a UUIDv5 computed from `(environment, path)`. The
//! environment hashes to a namespace UUID; the hierarchical path is the name
//! hashed inside that namespace. Two environments over the same code base
//! therefore produce fully disjoint id spaces, and two runs over identical
//! inputs produce identical ids.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Which logical layer of a repository an environment describes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentLayer {
    Base,
    PullRequest,
}

impl Display for EnvironmentLayer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            EnvironmentLayer::Base => "base",
            EnvironmentLayer::PullRequest => "pull_request",
        })
    }
}

/// Namespace tag injected into every node id.
///
/// `entity_id` identifies the owning organization/user, `repo_id` the
/// repository, `layer` the base vs. pull-request view of the code base.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphEnvironment {
    pub entity_id: String,
    #[serde(default)]
    pub repo_id: Option<String>,
    pub layer: EnvironmentLayer,
}

impl GraphEnvironment {
    pub fn new(entity_id: impl Into<String>, repo_id: Option<String>, layer: EnvironmentLayer) -> Self {
        Self {
            entity_id: entity_id.into(),
            repo_id,
            layer,
        }
    }

    /// Namespace UUID for this environment, derived once per environment.
    pub fn namespace(&self) -> Uuid {
        let key = format!(
            "env|{}|{}|{}",
            self.entity_id,
            self.repo_id.as_deref().unwrap_or(""),
            self.layer
        );
        Uuid::new_v5(&Uuid::nil(), key.as_bytes())
    }
}

/// Deterministic 128-bit node identity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Pure function of `(environment, path)`.
    pub fn derive(env: &GraphEnvironment, path: &str) -> Self {
        NodeId(Uuid::new_v5(&env.namespace(), path.as_bytes()))
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(layer: EnvironmentLayer) -> GraphEnvironment {
        GraphEnvironment::new("org-1", Some("repo-9".into()), layer)
    }

    #[test]
    fn ids_are_deterministic() {
        let a = NodeId::derive(&env(EnvironmentLayer::Base), "file:///r/a.py#f");
        let b = NodeId::derive(&env(EnvironmentLayer::Base), "file:///r/a.py#f");
        assert_eq!(a, b);
    }

    #[test]
    fn environments_produce_disjoint_ids() {
        let base = NodeId::derive(&env(EnvironmentLayer::Base), "file:///r/a.py#f");
        let pr = NodeId::derive(&env(EnvironmentLayer::PullRequest), "file:///r/a.py#f");
        assert_ne!(base, pr);
    }

    #[test]
    fn paths_produce_distinct_ids() {
        let e = env(EnvironmentLayer::Base);
        assert_ne!(
            NodeId::derive(&e, "file:///r/a.py#f"),
            NodeId::derive(&e, "file:///r/a.py#g")
        );
    }
}
