//! Non-fatal build diagnostics.
//!
//! Fatal conditions abort the build with a typed error; everything else is
//! collected as a `Warning` on the result so callers can surface degraded
//! coverage (e.g. a language server that never started).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    LspUnavailable,
    LspRequestFailed,
    ParseFailed,
    PermissionDenied,
    IgnoredReference,
}

/// A machine-readable warning with free-form context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    pub kind: WarningKind,
    #[serde(default)]
    pub context: BTreeMap<String, String>,
}

impl Warning {
    pub fn new(kind: WarningKind) -> Self {
        Self {
            kind,
            context: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}
