//! Hierarchical node locators.
//!
//! A `NodePath` addresses a node as `file:///abs/path[#seg[.seg…]]`: the file
//! URI names the file (or folder), the fragment names the chain of containers
//! inside it. Folder and file nodes carry no fragment; a method `m` of class
//! `C` in `/r/a.py` is `file:///r/a.py#C.m`.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct NodePath {
    /// Absolute filesystem location of the file or folder.
    fs_path: PathBuf,
    /// Container chain inside the file, outermost first.
    segments: Vec<String>,
}

impl NodePath {
    /// Locator for a file or folder node.
    pub fn for_fs(path: impl Into<PathBuf>) -> Self {
        Self {
            fs_path: path.into(),
            segments: Vec::new(),
        }
    }

    /// Child locator one containment level deeper.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self {
            fs_path: self.fs_path.clone(),
            segments,
        }
    }

    /// The filesystem half of the locator.
    pub fn fs_path(&self) -> &Path {
        &self.fs_path
    }

    /// `file://` URI for the filesystem half, without the fragment.
    pub fn file_uri(&self) -> String {
        format!("file://{}", self.fs_path.display())
    }

    /// Container chain inside the file, outermost first.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The final segment, or the file/folder basename when no fragment exists.
    pub fn name(&self) -> String {
        match self.segments.last() {
            Some(s) => s.clone(),
            None => self
                .fs_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }

    /// True for folder/file locators (no fragment).
    pub fn is_fs_only(&self) -> bool {
        self.segments.is_empty()
    }

    /// Locator of the containing node, if any.
    pub fn parent(&self) -> Option<Self> {
        if !self.segments.is_empty() {
            let mut segments = self.segments.clone();
            segments.pop();
            return Some(Self {
                fs_path: self.fs_path.clone(),
                segments,
            });
        }
        self.fs_path.parent().map(NodePath::for_fs)
    }
}

impl Display for NodePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.file_uri())?;
        if !self.segments.is_empty() {
            write!(f, "#{}", self.segments.join("."))?;
        }
        Ok(())
    }
}

impl From<NodePath> for String {
    fn from(p: NodePath) -> String {
        p.to_string()
    }
}

impl TryFrom<String> for NodePath {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        let rest = s
            .strip_prefix("file://")
            .ok_or_else(|| format!("node path without file scheme: {s}"))?;
        let (fs, fragment) = match rest.split_once('#') {
            Some((fs, frag)) => (fs, Some(frag)),
            None => (rest, None),
        };
        if fs.is_empty() {
            return Err(format!("node path without filesystem part: {s}"));
        }
        let segments = fragment
            .map(|f| f.split('.').map(str::to_owned).collect())
            .unwrap_or_default();
        Ok(Self {
            fs_path: PathBuf::from(fs),
            segments,
        })
    }
}
