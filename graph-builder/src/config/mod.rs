//! Configuration surface for graph builds.
//!
//! Callers construct a [`BuildConfig`] directly or load one from environment
//! variables. The loader is intentionally tolerant: unknown variables are
//! ignored and malformed values fall back to defaults; `validate()` then
//! rejects genuinely unusable configurations.
//!
//! Supported ENV vars (all optional unless noted):
//! - `REPOGRAPH_ROOT`              (path, required for `from_env`)
//! - `REPOGRAPH_ENTITY_ID`         (string)
//! - `REPOGRAPH_REPO_ID`           (string)
//! - `REPOGRAPH_SKIP_EXTENSIONS`   (comma-separated, leading dots)
//! - `REPOGRAPH_SKIP_NAMES`        (comma-separated path components)
//! - `REPOGRAPH_ONLY_HIERARCHY`    (bool: true/false/1/0)
//! - `REPOGRAPH_IGNORE_FILE`       (path to a plaintext glob list)
//! - `REPOGRAPH_LSP_TIMEOUT_SECS`  (u64)
//! - `REPOGRAPH_LSP_RETRIES`       (u64)

use crate::errors::{BuildError, BuildResult};
use crate::model::environment::{EnvironmentLayer, GraphEnvironment};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use std::{env, fs, path::Path, path::PathBuf};

/// Top-level configuration for a build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Absolute path to the repository root.
    pub root_path: PathBuf,
    /// Extensions (leading dot) excluded from file iteration.
    pub extensions_to_skip: BTreeSet<String>,
    /// Path components excluded from iteration.
    pub names_to_skip: BTreeSet<String>,
    /// When true, reference resolution is not invoked at all.
    pub only_hierarchy: bool,
    /// Namespace injected into every node id.
    pub environment: GraphEnvironment,
    /// Second namespace used by diff builds.
    #[serde(default)]
    pub pr_environment: Option<GraphEnvironment>,
    /// Plaintext file with additional shell-glob ignore patterns, one per line.
    #[serde(default)]
    pub ignore_file_path: Option<PathBuf>,
    /// Language-server tuning.
    #[serde(default)]
    pub lsp: LspSettings,
}

impl BuildConfig {
    /// Minimal configuration over a root path, base environment only.
    pub fn new(root_path: impl Into<PathBuf>, environment: GraphEnvironment) -> Self {
        Self {
            root_path: root_path.into(),
            extensions_to_skip: BTreeSet::new(),
            names_to_skip: BTreeSet::new(),
            only_hierarchy: false,
            environment,
            pr_environment: None,
            ignore_file_path: None,
            lsp: LspSettings::default(),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> BuildResult<Self> {
        let root = env::var("REPOGRAPH_ROOT")
            .map_err(|_| BuildError::InvalidConfig("REPOGRAPH_ROOT is not set".into()))?;
        let entity_id = env::var("REPOGRAPH_ENTITY_ID").unwrap_or_else(|_| "local".into());
        let repo_id = env::var("REPOGRAPH_REPO_ID").ok();

        let mut cfg = Self::new(
            PathBuf::from(root),
            GraphEnvironment::new(entity_id, repo_id, EnvironmentLayer::Base),
        );

        if let Some(v) = env_list("REPOGRAPH_SKIP_EXTENSIONS") {
            cfg.extensions_to_skip = v.into_iter().collect();
        }
        if let Some(v) = env_list("REPOGRAPH_SKIP_NAMES") {
            cfg.names_to_skip = v.into_iter().collect();
        }
        if let Some(v) = env_bool("REPOGRAPH_ONLY_HIERARCHY") {
            cfg.only_hierarchy = v;
        }
        if let Ok(v) = env::var("REPOGRAPH_IGNORE_FILE") {
            cfg.ignore_file_path = Some(PathBuf::from(v));
        }
        if let Some(v) = env_u64("REPOGRAPH_LSP_TIMEOUT_SECS") {
            cfg.lsp.request_timeout = Duration::from_secs(v);
        }
        if let Some(v) = env_u64("REPOGRAPH_LSP_RETRIES") {
            cfg.lsp.max_retries = v as u32;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    /// Basic validation: the root must exist, be absolute and be a directory.
    pub fn validate(&self) -> BuildResult<()> {
        if !self.root_path.is_absolute() {
            return Err(BuildError::InvalidConfig(format!(
                "root_path must be absolute: {}",
                self.root_path.display()
            )));
        }
        if !self.root_path.exists() {
            return Err(BuildError::RootNotFound(self.root_path.clone()));
        }
        if !self.root_path.is_dir() {
            return Err(BuildError::InvalidConfig(format!(
                "root_path is not a directory: {}",
                self.root_path.display()
            )));
        }
        Ok(())
    }

    /// Ignore patterns from `ignore_file_path`, if configured.
    ///
    /// Blank lines and `#` comments are skipped. A missing file is treated
    /// as an input error, not silently ignored.
    pub fn ignore_patterns(&self) -> BuildResult<Vec<String>> {
        let Some(path) = &self.ignore_file_path else {
            return Ok(Vec::new());
        };
        let raw = fs::read_to_string(path).map_err(|e| {
            BuildError::InvalidConfig(format!("ignore file {}: {e}", path.display()))
        })?;
        Ok(raw
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(str::to_owned)
            .collect())
    }

    /// Canonicalized root path.
    pub fn canonical_root(&self) -> BuildResult<PathBuf> {
        dunce::canonicalize(&self.root_path)
            .map_err(|_| BuildError::RootNotFound(self.root_path.clone()))
    }
}

/// Language-server tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LspSettings {
    /// Per-request ceiling; exceeded requests count as transport errors.
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,
    /// Retries per request on transport errors, with exponential backoff.
    pub max_retries: u32,
    /// Launch argv overrides keyed by LSP language identifier.
    #[serde(default)]
    pub servers: BTreeMap<String, Vec<String>>,
}

impl Default for LspSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            max_retries: 3,
            servers: BTreeMap::new(),
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

/* ------------------------- ENV helpers ------------------------- */

fn env_bool(key: &str) -> Option<bool> {
    env::var(key).ok().and_then(|s| {
        let v = s.trim().to_ascii_lowercase();
        match v.as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        }
    })
}

fn env_u64(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_list(key: &str) -> Option<Vec<String>> {
    let raw = env::var(key).ok()?;
    let list = raw
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect::<Vec<_>>();
    Some(list)
}

/// True if `path` has any component listed in `names`.
pub fn has_skipped_component(path: &Path, names: &BTreeSet<String>) -> bool {
    path.components().any(|c| {
        c.as_os_str()
            .to_str()
            .map(|s| names.contains(s))
            .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::environment::{EnvironmentLayer, GraphEnvironment};

    fn env() -> GraphEnvironment {
        GraphEnvironment::new("e", None, EnvironmentLayer::Base)
    }

    #[test]
    fn validate_rejects_relative_root() {
        let cfg = BuildConfig::new("relative/dir", env());
        assert!(matches!(cfg.validate(), Err(BuildError::InvalidConfig(_))));
    }

    #[test]
    fn validate_rejects_missing_root() {
        let cfg = BuildConfig::new("/definitely/not/here", env());
        assert!(matches!(cfg.validate(), Err(BuildError::RootNotFound(_))));
    }

    #[test]
    fn ignore_file_skips_comments_and_blanks() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("ignore.txt");
        fs::write(&file, "# header\n\n*.gen.py\nvendor/**\n").unwrap();
        let mut cfg = BuildConfig::new(dir.path(), env());
        cfg.ignore_file_path = Some(file);
        assert_eq!(cfg.ignore_patterns().unwrap(), vec!["*.gen.py", "vendor/**"]);
    }

    #[test]
    fn skipped_components_match_anywhere_in_path() {
        let names: BTreeSet<String> = ["node_modules".to_string()].into();
        assert!(has_skipped_component(
            Path::new("/r/node_modules/x/y.js"),
            &names
        ));
        assert!(!has_skipped_component(Path::new("/r/src/y.js"), &names));
    }
}
