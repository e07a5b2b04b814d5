// src/watch/path_utils.rs

//! Utility functions for path handling in the watcher.

use std::path::Path;

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// - First we try a direct `strip_prefix(root)`.
/// - If that fails (symlinks, `/private/var` vs `/var` on macOS), both paths
///   are canonicalized and we try again. A removed file can't be
///   canonicalized, so its parent is used instead.
///
/// Returns `None` if the path cannot be related to `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(to_slash(rel));
    }

    let root_canon = root.canonicalize().ok()?;
    if let Ok(path_canon) = path.canonicalize() {
        if let Ok(rel) = path_canon.strip_prefix(&root_canon) {
            return Some(to_slash(rel));
        }
    }

    let parent = path.parent()?.canonicalize().ok()?;
    let name = path.file_name()?;
    let rel = parent.join(name);
    rel.strip_prefix(&root_canon).ok().map(to_slash)
}

fn to_slash(rel: &Path) -> String {
    rel.to_string_lossy().replace('\\', "/")
}

/// Whether a directory (relative path) should not be watched.
///
/// Patterns like `**/target/**` describe the directory's contents, so the
/// directory is tested with a sentinel child path as well as on its own.
pub fn dir_is_ignored<S: AsRef<str>>(
    matcher: &crate::matcher::PatternMatcher,
    rel_dir: &str,
    patterns: &[S],
) -> bool {
    if rel_dir.is_empty() {
        return false;
    }
    matcher.is_ignored(rel_dir, patterns)
        || matcher.is_ignored(&format!("{rel_dir}/{DIR_SENTINEL}"), patterns)
}

const DIR_SENTINEL: &str = ".devloop-dir-sentinel";
