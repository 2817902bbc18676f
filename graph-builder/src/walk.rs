//! Filesystem walk with ignore rules (the project iterator).
//!
//! Depth-first with lexicographic sibling order, symlinks not followed.
//! Hidden entries are traversed unless ignored explicitly. Permission
//! failures skip the offending subtree with a warning; a missing root is
//! fatal.

use crate::config::{has_skipped_component, BuildConfig};
use crate::errors::{BuildError, BuildResult};
use crate::languages::LanguageId;
use crate::model::warning::{Warning, WarningKind};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

#[derive(Debug, Clone)]
pub struct WalkedFile {
    pub path: PathBuf,
    pub language: Option<LanguageId>,
}

#[derive(Debug, Default)]
pub struct WalkOutcome {
    pub files: Vec<WalkedFile>,
    pub warnings: Vec<Warning>,
}

/// Enumerate files under the configured root.
///
/// With `include_unknown` false (the normal build), only files of
/// registered languages are yielded; a folder-only walk passes true and
/// receives every non-ignored file with `language: None` where unknown.
pub fn iter_files(config: &BuildConfig, include_unknown: bool) -> BuildResult<WalkOutcome> {
    let root = config.canonical_root()?;
    let ignore = build_globset(&config.ignore_patterns()?)?;

    info!("walk: start -> {}", root.display());

    let mut skipped_ignored = 0usize;
    let mut skipped_extension = 0usize;
    let mut out = WalkOutcome::default();

    let names = config.names_to_skip.clone();
    let walker = WalkDir::new(&root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(move |e| keep_entry(e, &names));

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                let path = err
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                if err
                    .io_error()
                    .map(|io| io.kind() == std::io::ErrorKind::PermissionDenied)
                    .unwrap_or(false)
                {
                    warn!("walk: permission denied, skipping {}", path);
                    out.warnings
                        .push(Warning::new(WarningKind::PermissionDenied).with("path", path));
                } else {
                    warn!("walk: error at {}: {}", path, err);
                }
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();

        let rel = path.strip_prefix(&root).unwrap_or(path);
        if is_ignored_by(rel, ignore.as_ref()) || has_skipped_component(rel, &config.names_to_skip)
        {
            skipped_ignored += 1;
            debug!("walk: ignore {}", path.display());
            continue;
        }

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if config.extensions_to_skip.contains(&format!(".{ext}")) {
            skipped_extension += 1;
            debug!("walk: skip extension {}", path.display());
            continue;
        }

        let language = LanguageId::from_extension(ext);
        if language.is_none() && !include_unknown {
            continue;
        }

        out.files.push(WalkedFile {
            path: path.to_path_buf(),
            language,
        });
    }

    info!(
        "walk: done, files={} (ignored={}, skipped_ext={})",
        out.files.len(),
        skipped_ignored,
        skipped_extension
    );
    Ok(out)
}

/// Folder chain from the root (inclusive) down to the file's parent.
pub fn folder_chain(root: &Path, file: &Path) -> Vec<PathBuf> {
    let mut chain = vec![root.to_path_buf()];
    if let Ok(rel) = file.strip_prefix(root) {
        let mut current = root.to_path_buf();
        let components: Vec<_> = rel.components().collect();
        for component in components.iter().take(components.len().saturating_sub(1)) {
            current = current.join(component);
            chain.push(current.clone());
        }
    }
    chain
}

/// Directory filter applied while descending: prune skipped names early.
fn keep_entry(entry: &DirEntry, names_to_skip: &std::collections::BTreeSet<String>) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| !names_to_skip.contains(name))
        .unwrap_or(true)
}

fn build_globset(patterns: &[String]) -> BuildResult<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| BuildError::InvalidConfig(format!("ignore pattern '{pattern}': {e}")))?;
        builder.add(glob);
    }
    let set = builder
        .build()
        .map_err(|e| BuildError::InvalidConfig(format!("ignore patterns: {e}")))?;
    Ok(Some(set))
}

fn is_ignored_by(rel: &Path, set: Option<&GlobSet>) -> bool {
    set.map(|s| s.is_match(rel)).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::environment::{EnvironmentLayer, GraphEnvironment};
    use std::fs;

    fn env() -> GraphEnvironment {
        GraphEnvironment::new("e", None, EnvironmentLayer::Base)
    }

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/inner")).unwrap();
        fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        fs::write(dir.path().join("src/b.py"), "x = 1\n").unwrap();
        fs::write(dir.path().join("src/a.py"), "y = 2\n").unwrap();
        fs::write(dir.path().join("src/inner/c.rb"), "z = 3\n").unwrap();
        fs::write(dir.path().join("src/notes.txt"), "text\n").unwrap();
        fs::write(dir.path().join("node_modules/pkg/d.js"), "var d;\n").unwrap();
        dir
    }

    #[test]
    fn yields_known_files_in_lexicographic_dfs_order() {
        let dir = fixture();
        let cfg = BuildConfig::new(dir.path(), env());
        let out = iter_files(&cfg, false).unwrap();
        let names: Vec<String> = out
            .files
            .iter()
            .map(|f| f.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        // node_modules/pkg/d.js appears (not skipped by default), then src.
        assert_eq!(names, vec!["d.js", "a.py", "b.py", "c.rb"]);
    }

    #[test]
    fn names_to_skip_prunes_subtrees() {
        let dir = fixture();
        let mut cfg = BuildConfig::new(dir.path(), env());
        cfg.names_to_skip.insert("node_modules".into());
        let out = iter_files(&cfg, false).unwrap();
        assert!(out.files.iter().all(|f| !f
            .path
            .components()
            .any(|c| c.as_os_str() == "node_modules")));
    }

    #[test]
    fn extension_skip_and_unknown_extensions() {
        let dir = fixture();
        let mut cfg = BuildConfig::new(dir.path(), env());
        cfg.extensions_to_skip.insert(".rb".into());
        let out = iter_files(&cfg, false).unwrap();
        assert!(out.files.iter().all(|f| {
            f.path.extension().and_then(|e| e.to_str()) != Some("rb")
        }));

        // folder-only walks see unknown extensions too
        let all = iter_files(&cfg, true).unwrap();
        assert!(all
            .files
            .iter()
            .any(|f| f.path.file_name().unwrap() == "notes.txt" && f.language.is_none()));
    }

    #[test]
    fn ignore_file_patterns_apply() {
        let dir = fixture();
        fs::write(dir.path().join(".graphignore"), "# skip ruby\n**/*.rb\n").unwrap();
        let mut cfg = BuildConfig::new(dir.path(), env());
        cfg.ignore_file_path = Some(dir.path().join(".graphignore"));
        let out = iter_files(&cfg, false).unwrap();
        assert!(out
            .files
            .iter()
            .all(|f| f.path.extension().and_then(|e| e.to_str()) != Some("rb")));
    }

    #[test]
    fn missing_root_is_fatal() {
        let cfg = BuildConfig::new("/no/such/root", env());
        assert!(matches!(
            iter_files(&cfg, false),
            Err(BuildError::RootNotFound(_))
        ));
    }

    #[test]
    fn folder_chain_walks_from_root_to_parent() {
        let root = Path::new("/r");
        let chain = folder_chain(root, Path::new("/r/a/b/c.py"));
        assert_eq!(
            chain,
            vec![
                PathBuf::from("/r"),
                PathBuf::from("/r/a"),
                PathBuf::from("/r/a/b")
            ]
        );
    }
}
