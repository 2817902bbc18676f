//! Path/URI normalization helpers.
//!
//! LSP servers speak percent-encoded `file://` URIs; the graph keys files
//! by absolute path. Conversions go through the `url` crate so unicode
//! paths survive round trips.

use std::path::{Path, PathBuf};

/// Percent-encoded `file://` URI for an absolute path.
pub fn file_uri(path: &Path) -> Option<String> {
    url::Url::from_file_path(path).ok().map(String::from)
}

/// Absolute filesystem path for a `file://` URI.
pub fn uri_to_abs_path(uri: &str) -> Option<PathBuf> {
    let parsed = url::Url::parse(uri).ok()?;
    if parsed.scheme() != "file" {
        return None;
    }
    parsed.to_file_path().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_plain_paths() {
        let uri = file_uri(Path::new("/r/src/a.py")).unwrap();
        assert_eq!(uri, "file:///r/src/a.py");
        assert_eq!(uri_to_abs_path(&uri), Some(PathBuf::from("/r/src/a.py")));
    }

    #[test]
    fn round_trips_unicode_paths() {
        let path = Path::new("/r/módulo/ファイル.py");
        let uri = file_uri(path).unwrap();
        assert!(uri.starts_with("file:///r/m%C3%B3dulo/"));
        assert_eq!(uri_to_abs_path(&uri), Some(path.to_path_buf()));
    }

    #[test]
    fn rejects_non_file_schemes() {
        assert_eq!(uri_to_abs_path("https://example.com/a.py"), None);
    }
}
