//! Parsing layer: a per-language parser pool and a per-file parse cache.
//!
//! Parsers are cheap but not shareable across threads, so the pool owns one
//! `tree_sitter::Parser` per language and reconfigures nothing between
//! calls. Parse errors never fail a build; ERROR nodes stay in the tree and
//! later stages tolerate them. Cached parses are immutable after first
//! insert and shared behind `Arc`.

use crate::errors::BuildResult;
use crate::languages::LanguageId;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use tree_sitter::{Node, Parser, Tree};

/// A parsed file: syntax tree plus the exact source it was parsed from.
#[derive(Debug)]
pub struct ParsedFile {
    pub language: LanguageId,
    pub source: String,
    pub tree: Tree,
}

impl ParsedFile {
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn bytes(&self) -> &[u8] {
        self.source.as_bytes()
    }

    /// Total number of lines, counting a trailing partial line.
    pub fn line_count(&self) -> usize {
        if self.source.is_empty() {
            return 0;
        }
        let newlines = self.source.bytes().filter(|b| *b == b'\n').count();
        if self.source.ends_with('\n') {
            newlines
        } else {
            newlines + 1
        }
    }
}

/// One `Parser` per language, created lazily and reused across files.
#[derive(Default)]
pub struct ParserPool {
    parsers: HashMap<LanguageId, Parser>,
}

impl ParserPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `source`. Returns `Ok(None)` when tree-sitter yields no tree;
    /// callers record a warning and keep going.
    pub fn parse(
        &mut self,
        language: LanguageId,
        source: String,
    ) -> BuildResult<Option<ParsedFile>> {
        let parser = match self.parsers.entry(language) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(v) => {
                let mut p = Parser::new();
                p.set_language(&language.grammar())?;
                v.insert(p)
            }
        };

        match parser.parse(&source, None) {
            Some(tree) => Ok(Some(ParsedFile {
                language,
                source,
                tree,
            })),
            None => {
                debug!(language = %language, "parse: tree-sitter returned no tree");
                Ok(None)
            }
        }
    }
}

/// Immutable-after-insert cache of parsed files, keyed by absolute path.
#[derive(Default)]
pub struct ParseCache {
    files: HashMap<PathBuf, Arc<ParsedFile>>,
}

impl ParseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &Path) -> Option<Arc<ParsedFile>> {
        self.files.get(path).cloned()
    }

    pub fn insert(&mut self, path: PathBuf, parsed: Arc<ParsedFile>) {
        self.files.entry(path).or_insert(parsed);
    }

    /// Cached parse, or parse now and remember the result.
    pub fn get_or_parse(
        &mut self,
        pool: &mut ParserPool,
        path: &Path,
        language: LanguageId,
    ) -> BuildResult<Option<Arc<ParsedFile>>> {
        if let Some(hit) = self.get(path) {
            return Ok(Some(hit));
        }
        let source = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "parse: read failed");
                return Ok(None);
            }
        };
        let Some(parsed) = pool.parse(language, source)? else {
            return Ok(None);
        };
        let parsed = Arc::new(parsed);
        self.files.insert(path.to_path_buf(), parsed.clone());
        Ok(Some(parsed))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
