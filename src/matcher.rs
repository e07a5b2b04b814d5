// src/matcher.rs

//! Glob matching with a memoizing result cache.
//!
//! Every rule, exclusion and ignore pattern is evaluated against every
//! changed path, and the same handful of patterns stay fixed for the whole
//! session. Compiled globs are cached per pattern and results per
//! `(pattern, path)`; nothing is ever evicted.
//!
//! Syntax is `globset`'s with `literal_separator` on: `*` stays within one
//! path segment, `**` crosses segments, `{a,b}` alternates.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobMatcher};
use tracing::warn;

/// Compile a single pattern with the crate's glob settings.
fn compile(pattern: &str) -> Result<GlobMatcher> {
    let glob = GlobBuilder::new(pattern)
        .literal_separator(true)
        .backslash_escape(true)
        .build()
        .with_context(|| format!("invalid glob pattern: {pattern}"))?;
    Ok(glob.compile_matcher())
}

/// Check that a pattern compiles. Used by config validation.
pub fn validate_pattern(pattern: &str) -> Result<()> {
    compile(pattern).map(|_| ())
}

/// Normalize a path or pattern: backslashes to slashes, no leading `./`.
pub fn normalize(path: &str) -> String {
    let s = path.replace('\\', "/");
    let mut s = s.as_str();
    while let Some(rest) = s.strip_prefix("./") {
        s = rest;
    }
    s.to_string()
}

#[derive(Debug, Default)]
pub struct PatternMatcher {
    /// `None` marks a pattern that failed to compile (already warned about).
    compiled: Mutex<HashMap<String, Option<GlobMatcher>>>,
    results: Mutex<HashMap<(String, String), bool>>,
}

impl PatternMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if `path` (relative, any separator style) matches
    /// `pattern`. Invalid patterns never match.
    pub fn is_match(&self, pattern: &str, path: &str) -> bool {
        let path = normalize(path);
        let key = (pattern.to_string(), path);

        if let Some(hit) = self.lock_results().get(&key) {
            return *hit;
        }

        let matched = self.matcher_for(pattern).is_some_and(|m| m.is_match(&key.1));
        self.lock_results().insert(key, matched);
        matched
    }

    /// True if any pattern in `patterns` matches `path`.
    pub fn is_ignored<S: AsRef<str>>(&self, path: &str, patterns: &[S]) -> bool {
        patterns.iter().any(|p| self.is_match(p.as_ref(), path))
    }

    /// Number of memoized `(pattern, path)` results.
    pub fn cached_results(&self) -> usize {
        self.lock_results().len()
    }

    fn matcher_for(&self, pattern: &str) -> Option<GlobMatcher> {
        let mut compiled = match self.compiled.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        compiled
            .entry(pattern.to_string())
            .or_insert_with(|| match compile(pattern) {
                Ok(m) => Some(m),
                Err(err) => {
                    warn!(pattern = %pattern, error = %err, "ignoring invalid glob pattern");
                    None
                }
            })
            .clone()
    }

    fn lock_results(&self) -> std::sync::MutexGuard<'_, HashMap<(String, String), bool>> {
        // A panic while holding this lock can only leave a complete entry
        // behind, so the map is still usable.
        match self.results.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
