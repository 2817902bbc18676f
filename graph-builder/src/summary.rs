//! Build summary: counters collected from a finished graph.
//!
//! Lightweight, serializable, and stable: field names are grep-friendly
//! and unlikely to change, so downstream telemetry can rely on them.

use crate::builder::GraphBuild;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// High-level counters for a single build.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BuildSummary {
    pub nodes_total: usize,
    /// Node count per primary label (`FOLDER`, `FILE`, `CLASS`, …).
    pub nodes_by_label: BTreeMap<String, usize>,
    pub relationships_total: usize,
    /// Edge count per kind (`CONTAINS`, `CALLS`, …).
    pub relationships_by_kind: BTreeMap<String, usize>,
    pub warnings: usize,
}

impl GraphBuild {
    /// Aggregate counters over the exported graph. Cheap; safe to call at
    /// any time after the build finishes.
    pub fn summary(&self) -> BuildSummary {
        let mut nodes_by_label: BTreeMap<String, usize> = BTreeMap::new();
        for node in &self.nodes {
            *nodes_by_label.entry(node.r#type.clone()).or_insert(0) += 1;
        }
        let mut relationships_by_kind: BTreeMap<String, usize> = BTreeMap::new();
        for rel in &self.relationships {
            *relationships_by_kind.entry(rel.r#type.clone()).or_insert(0) += 1;
        }
        BuildSummary {
            nodes_total: self.nodes.len(),
            nodes_by_label,
            relationships_total: self.relationships.len(),
            relationships_by_kind,
            warnings: self.warnings.len(),
        }
    }
}
