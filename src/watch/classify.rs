// src/watch/classify.rs

//! Pure classification of a debounced batch.
//!
//! Decides, for every path, whether it matters and what it is, and for the
//! batch as a whole whether the app has to be rebuilt and restarted. Nothing
//! here touches the filesystem.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::assets::StaticKind;
use crate::layout::Layout;
use crate::matcher::PatternMatcher;

use super::event::{EventBatch, FileEvent};
use super::rules::WatchRule;

/// Ignored everywhere, on top of user patterns and the output dir.
pub const BUILTIN_IGNORES: &[&str] = &["**/.git/**", "**/node_modules/**", "**/target/**"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// Application source (by extension).
    Source,
    CriticalCss,
    NormalCss,
    Static(StaticKind),
    /// Matched by a user rule, none of the above.
    Other,
}

/// Which rule applies to a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleRef {
    /// Index into the user rules.
    User(usize),
    /// Built-in default rule: no callbacks, no flags.
    Default,
}

#[derive(Debug, Clone)]
pub struct ClassifiedPath {
    pub path: String,
    pub kind: PathKind,
    pub rule: RuleRef,
    pub event: FileEvent,
}

#[derive(Debug, Clone, Default)]
pub struct ClassifiedBatch {
    pub paths: Vec<ClassifiedPath>,
    pub needs_hard_reload: bool,
}

impl ClassifiedBatch {
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn has_kind(&self, pred: impl Fn(PathKind) -> bool) -> bool {
        self.paths.iter().any(|p| pred(p.kind))
    }
}

/// Directory prefixes and extensions the classifier sorts paths by.
#[derive(Debug, Clone)]
pub struct ClassifierDirs {
    pub public: String,
    pub private: String,
    pub critical_css: String,
    pub normal_css: String,
    pub source_extensions: Vec<String>,
}

impl ClassifierDirs {
    pub fn from_layout(layout: &Layout, source_extensions: &[String]) -> Self {
        Self {
            public: layout.public_rel.clone(),
            private: layout.private_rel.clone(),
            critical_css: layout.critical_css_rel.clone(),
            normal_css: layout.normal_css_rel.clone(),
            source_extensions: source_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_string())
                .collect(),
        }
    }
}

#[derive(Debug)]
pub struct Classifier {
    rules: Vec<WatchRule>,
    ignore: Vec<String>,
    dirs: ClassifierDirs,
    matcher: Arc<PatternMatcher>,
}

impl Classifier {
    pub fn new(
        rules: Vec<WatchRule>,
        ignore: Vec<String>,
        dirs: ClassifierDirs,
        matcher: Arc<PatternMatcher>,
    ) -> Self {
        Self {
            rules,
            ignore,
            dirs,
            matcher,
        }
    }

    pub fn rules(&self) -> &[WatchRule] {
        &self.rules
    }

    pub fn rule(&self, rule: RuleRef) -> Option<&WatchRule> {
        match rule {
            RuleRef::User(i) => self.rules.get(i),
            RuleRef::Default => None,
        }
    }

    pub fn ignore_patterns(&self) -> &[String] {
        &self.ignore
    }

    pub fn is_ignored(&self, path: &str) -> bool {
        self.matcher.is_ignored(path, &self.ignore)
    }

    /// First user rule whose pattern matches `path`.
    pub fn matching_rule(&self, path: &str) -> Option<usize> {
        self.rules
            .iter()
            .position(|r| self.matcher.is_match(&r.pattern, path))
    }

    /// What kind of file `path` is by location and extension.
    pub fn kind_of(&self, path: &str) -> Option<PathKind> {
        let d = &self.dirs;
        if has_extension(path, &d.source_extensions) {
            Some(PathKind::Source)
        } else if is_under(path, &d.critical_css) {
            Some(PathKind::CriticalCss)
        } else if is_under(path, &d.normal_css) {
            Some(PathKind::NormalCss)
        } else if is_under(path, &d.public) {
            Some(PathKind::Static(StaticKind::Public))
        } else if is_under(path, &d.private) {
            Some(PathKind::Static(StaticKind::Private))
        } else {
            None
        }
    }

    pub fn classify(&self, batch: &EventBatch) -> ClassifiedBatch {
        let substantive = batch.has_substantive();
        let mut out = ClassifiedBatch::default();

        for event in batch.iter() {
            let path = event.path.as_str();

            if self.is_ignored(path) {
                trace!(path = %path, "ignored");
                continue;
            }
            if event.is_noise() && !substantive {
                trace!(path = %path, "metadata-only change dropped");
                continue;
            }

            let (rule, kind) = match self.matching_rule(path) {
                Some(i) => (RuleRef::User(i), self.kind_of(path).unwrap_or(PathKind::Other)),
                None => match self.kind_of(path) {
                    Some(kind) => (RuleRef::Default, kind),
                    None => {
                        trace!(path = %path, "no rule applies");
                        continue;
                    }
                },
            };

            if self.forces_hard_reload(kind, rule) {
                out.needs_hard_reload = true;
            }
            out.paths.push(ClassifiedPath {
                path: path.to_string(),
                kind,
                rule,
                event: event.clone(),
            });
        }

        if !out.is_empty() {
            debug!(
                paths = out.paths.len(),
                hard_reload = out.needs_hard_reload,
                "classified batch"
            );
        }
        out
    }

    /// A callbacks-only rule never restarts the app, whatever its other flags.
    fn forces_hard_reload(&self, kind: PathKind, rule: RuleRef) -> bool {
        let rule = self.rule(rule);
        if rule.is_some_and(|r| r.run_callbacks_only) {
            return false;
        }
        let opaque = rule.is_some_and(|r| r.treat_source_as_opaque);
        let flagged = rule.is_some_and(|r| r.recompile_executable || r.restart_process);
        (kind == PathKind::Source && !opaque) || flagged
    }

    /// Whether this path's change means the executable must be rebuilt.
    pub fn needs_recompile(&self, path: &ClassifiedPath) -> bool {
        let rule = self.rule(path.rule);
        if rule.is_some_and(|r| r.run_callbacks_only) {
            return false;
        }
        let opaque = rule.is_some_and(|r| r.treat_source_as_opaque);
        (path.kind == PathKind::Source && !opaque)
            || rule.is_some_and(|r| r.recompile_executable)
    }

    /// True unless every path's rule asks to skip the `rebuilding` notice.
    /// Callbacks-only paths never ask for it.
    pub fn wants_rebuilding_notice(&self, batch: &ClassifiedBatch) -> bool {
        !batch.paths.iter().all(|p| {
            self.rule(p.rule)
                .is_some_and(|r| r.skip_rebuilding_notice || r.run_callbacks_only)
        })
    }
}

/// Default ignores plus user ignores plus the output dir.
pub fn ignore_patterns(output_rel: &str, user: &[String]) -> Vec<String> {
    let mut patterns: Vec<String> = BUILTIN_IGNORES.iter().map(|s| s.to_string()).collect();
    if !output_rel.is_empty() && output_rel != "." {
        patterns.push(format!("{output_rel}/**"));
    }
    patterns.extend(user.iter().map(|p| crate::matcher::normalize(p)));
    patterns
}

fn is_under(path: &str, dir: &str) -> bool {
    if dir.is_empty() || dir == "." {
        return false;
    }
    path.strip_prefix(dir).is_some_and(|rest| rest.starts_with('/'))
}

fn has_extension(path: &str, exts: &[String]) -> bool {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(0) | None => false,
        Some(dot) => exts.iter().any(|e| e == &name[dot + 1..]),
    }
}
