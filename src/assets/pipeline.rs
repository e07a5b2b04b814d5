// src/assets/pipeline.rs

//! The content-addressed asset pipeline.
//!
//! A build runs in two phases:
//! 1. public static files. Stylesheets resolve their `url(...)` references
//!    against the public asset map, so this finishes first.
//! 2. private static files and the two stylesheet bundles, concurrently.
//!    They write disjoint output sub-trees.
//!
//! Full builds wipe `<output>/static` first. Granular builds diff against the
//! asset maps left by the previous build, skip unchanged files and remove
//! outputs that are no longer referenced.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use anyhow::Context;
use tracing::{debug, info, warn};

use crate::assets::hash::{
    compute_file_hash, hashed_name, identifier_for_digest, output_identifier,
};
use crate::assets::map::{load_asset_map, save_asset_map, AssetMap};
use crate::assets::stylesheet::{
    collect_css, minify_whitespace, render_stylesheet, NORMAL_BUNDLE_BASE, NORMAL_BUNDLE_NAME,
};
use crate::errors::{DevloopError, Result};
use crate::fs::{write_if_changed, FileSystem, SubTree};
use crate::layout::Layout;

/// Which static directory a pass works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaticKind {
    Public,
    Private,
}

/// File counts for one build (or one part of it).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub written: usize,
    pub skipped: usize,
    pub removed: usize,
}

impl BuildReport {
    pub fn merge(&mut self, other: BuildReport) {
        self.written += other.written;
        self.skipped += other.skipped;
        self.removed += other.removed;
    }
}

/// Result of a stylesheet build.
#[derive(Debug, Clone)]
pub struct StylesheetOutput {
    /// Minified critical bundle, as written to the internal dir.
    pub critical_css: Vec<u8>,
    /// File name of the normal bundle inside the public output dir.
    pub normal_file: String,
    pub report: BuildReport,
}

enum FileOutcome {
    Written,
    Skipped,
}

#[derive(Debug, Clone)]
pub struct AssetPipeline {
    fs: Arc<dyn FileSystem>,
    layout: Arc<Layout>,
    /// Public map of the most recent build; empty until the first build or
    /// the first lazy load from disk.
    public_map: Arc<RwLock<AssetMap>>,
}

impl AssetPipeline {
    pub fn new(fs: Arc<dyn FileSystem>, layout: Arc<Layout>) -> Self {
        Self {
            fs,
            layout,
            public_map: Arc::new(RwLock::new(AssetMap::new())),
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Build public files, then private files and stylesheets concurrently.
    ///
    /// When both concurrent halves fail, the private-file error is reported;
    /// both always run to completion.
    pub async fn build_all(&self, granular: bool) -> Result<BuildReport> {
        let started = Instant::now();
        let mut report = BuildReport::default();

        let this = self.clone();
        let public = run_blocking(move || {
            this.prepare_output(granular)?;
            this.process_directory(StaticKind::Public, granular)
        })
        .await?;
        report.merge(public);

        let this = self.clone();
        let private = run_blocking(move || this.process_directory(StaticKind::Private, granular));
        let this = self.clone();
        let styles = run_blocking(move || this.build_stylesheets());

        let (private_res, styles_res) = tokio::join!(private, styles);

        let mut first_err: Option<DevloopError> = None;
        match private_res {
            Ok(r) => report.merge(r),
            Err(e) => first_err = Some(e),
        }
        match styles_res {
            Ok(out) => report.merge(out.report),
            Err(e) => {
                if first_err.is_none() {
                    first_err = Some(e);
                } else {
                    warn!(error = %e, "stylesheet build also failed");
                }
            }
        }
        if let Some(err) = first_err {
            return Err(err);
        }

        info!(
            granular,
            written = report.written,
            skipped = report.skipped,
            removed = report.removed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "asset build finished"
        );
        Ok(report)
    }

    /// Rebuild only the stylesheet bundles (hot CSS path).
    pub async fn rebuild_stylesheets(&self) -> Result<StylesheetOutput> {
        let this = self.clone();
        run_blocking(move || this.build_stylesheets()).await
    }

    /// Full mode: wipe `<output>/static` and recreate the skeleton.
    /// Granular mode: only make sure the skeleton exists.
    pub fn prepare_output(&self, granular: bool) -> Result<()> {
        let fs = &*self.fs;
        if !granular {
            debug!(dir = ?self.layout.static_dir(), "wiping static output tree");
            fs.remove_dir_all(&self.layout.static_dir()).map_err(build_error)?;
            self.public_map_mut().clear();
        }
        for dir in self.layout.skeleton() {
            fs.create_dir_all(&dir).map_err(build_error)?;
        }
        Ok(())
    }

    /// Copy or hash every file of one static directory into its output dir
    /// and persist the resulting asset map.
    ///
    /// Per-file failures do not stop the walk. The map is saved regardless
    /// (failed files keep their previous entry) and the first failure is
    /// returned afterwards.
    pub fn process_directory(&self, kind: StaticKind, granular: bool) -> Result<BuildReport> {
        let fs = &*self.fs;
        let (src, out, map_path) = match kind {
            StaticKind::Public => (
                self.layout.public_src.clone(),
                self.layout.public_out(),
                self.layout.public_map_path(),
            ),
            StaticKind::Private => (
                self.layout.private_src.clone(),
                self.layout.private_out(),
                self.layout.private_map_path(),
            ),
        };

        let old = if granular {
            match load_asset_map(fs, &map_path) {
                Ok(map) => map,
                Err(err) => {
                    warn!(?map_path, error = %err, "unreadable asset map; rebuilding every file");
                    AssetMap::new()
                }
            }
        } else {
            AssetMap::new()
        };

        let files = walk_files(&SubTree::new(Arc::clone(&self.fs), &src)).map_err(build_error)?;

        let mut new_map = AssetMap::new();
        let mut report = BuildReport::default();
        let mut first_err: Option<anyhow::Error> = None;

        for (rel, abs) in files {
            match self.process_file(&rel, &abs, &out, &old, granular) {
                Ok((id, FileOutcome::Written)) => {
                    debug!(path = %rel, id = %id, "wrote asset");
                    report.written += 1;
                    new_map.insert(rel, id);
                }
                Ok((id, FileOutcome::Skipped)) => {
                    report.skipped += 1;
                    new_map.insert(rel, id);
                }
                Err(err) => {
                    warn!(path = %rel, error = %format!("{err:#}"), "failed to process asset");
                    if let Some(old_id) = old.get(&rel) {
                        new_map.insert(rel.clone(), old_id.clone());
                    }
                    first_err.get_or_insert(err);
                }
            }
        }

        if granular {
            let live: HashSet<&String> = new_map.values().collect();
            for (rel, old_id) in old.iter() {
                if new_map.get(rel) == Some(old_id) || live.contains(old_id) {
                    continue;
                }
                match fs.remove_file(&out.join(old_id)) {
                    Ok(()) => {
                        debug!(path = %rel, id = %old_id, "removed stale asset");
                        report.removed += 1;
                    }
                    Err(err) => {
                        warn!(path = %rel, error = %err, "failed to remove stale asset");
                        first_err.get_or_insert(err);
                    }
                }
            }
        }

        let saved = save_asset_map(fs, &map_path, &new_map);
        if kind == StaticKind::Public {
            *self.public_map_mut() = new_map;
        }

        if let Some(err) = first_err {
            if let Err(save_err) = &saved {
                warn!(?map_path, error = %format!("{save_err:#}"), "failed to save asset map");
                return Err(DevloopError::Build(format!(
                    "{err:#}; asset map not saved: {save_err:#}"
                )));
            }
            return Err(build_error(err));
        }
        saved.map_err(build_error)?;

        debug!(?kind, ?report, "processed static directory");
        Ok(report)
    }

    fn process_file(
        &self,
        rel: &str,
        abs: &Path,
        out: &Path,
        old: &AssetMap,
        granular: bool,
    ) -> anyhow::Result<(String, FileOutcome)> {
        let fs = &*self.fs;

        if let Some(literal) = self.no_hash_literal(rel) {
            let bytes = fs.read(abs)?;
            let dest = out.join(literal);
            let outcome = if granular {
                match write_if_changed(fs, &dest, &bytes)? {
                    true => FileOutcome::Written,
                    false => FileOutcome::Skipped,
                }
            } else {
                fs.write(&dest, &bytes)?;
                FileOutcome::Written
            };
            return Ok((literal.to_string(), outcome));
        }

        // Unchanged files are only streamed through the hasher, never loaded.
        if granular {
            let id = identifier_for_digest(rel, &compute_file_hash(fs, abs)?);
            if old.get(rel) == Some(&id) && fs.exists(&out.join(&id)) {
                return Ok((id, FileOutcome::Skipped));
            }
        }

        let bytes = fs.read(abs)?;
        let id = output_identifier(rel, &bytes);
        let dest = out.join(&id);
        fs.write(&dest, &bytes)
            .with_context(|| format!("copying {rel} to {:?}", dest))?;
        Ok((id, FileOutcome::Written))
    }

    /// For a path under the no-hash sub-tree, the literal output path.
    fn no_hash_literal<'a>(&self, rel: &'a str) -> Option<&'a str> {
        rel.strip_prefix(self.layout.no_hash_prefix.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|rest| !rest.is_empty())
    }

    /// Build the critical and normal bundles.
    pub fn build_stylesheets(&self) -> Result<StylesheetOutput> {
        self.build_stylesheets_inner().map_err(build_error)
    }

    fn build_stylesheets_inner(&self) -> anyhow::Result<StylesheetOutput> {
        let fs = &*self.fs;
        let layout = &*self.layout;
        let public_map = self.current_public_map()?;
        let resolve = |target: &str| self.resolve_public_ref(&public_map, target);
        let mut report = BuildReport::default();

        let critical_files = collect_css(fs, &layout.critical_css_src)?;
        let critical = render_stylesheet(&contents_of(critical_files), resolve);
        let critical = minify_whitespace(&String::from_utf8_lossy(&critical)).into_bytes();
        count_write(&mut report, write_if_changed(fs, &layout.critical_css_path(), &critical)?);

        let normal_files = collect_css(fs, &layout.normal_css_src)?;
        let normal = render_stylesheet(&contents_of(normal_files), resolve);
        let normal_file = hashed_name(NORMAL_BUNDLE_BASE, Some("css"), &normal);

        let out = layout.public_out();
        let user_files: HashSet<&str> = public_map.values().map(String::as_str).collect();
        if fs.is_dir(&out) {
            for path in fs.read_dir(&out)? {
                let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                if NORMAL_BUNDLE_NAME.is_match(name)
                    && name != normal_file
                    && !user_files.contains(name)
                {
                    fs.remove_file(&path)?;
                    debug!(file = %name, "removed stale normal stylesheet bundle");
                    report.removed += 1;
                }
            }
        }

        count_write(&mut report, write_if_changed(fs, &out.join(&normal_file), &normal)?);
        count_write(
            &mut report,
            write_if_changed(fs, &layout.normal_css_ref_path(), normal_file.as_bytes())?,
        );

        debug!(normal = %normal_file, critical_bytes = critical.len(), "built stylesheets");
        Ok(StylesheetOutput {
            critical_css: critical,
            normal_file,
            report,
        })
    }

    /// `url(...)` target → hashed public URL, if the target is a known
    /// public asset (with or without the public URL prefix).
    fn resolve_public_ref(&self, map: &AssetMap, target: &str) -> Option<String> {
        let prefix = self.layout.public_url_prefix.as_str();
        let t = crate::matcher::normalize(target);
        let rel = t
            .strip_prefix(prefix)
            .or_else(|| t.strip_prefix(prefix.trim_start_matches('/')))
            .unwrap_or(&t)
            .trim_start_matches('/');
        map.get(rel).map(|id| format!("{prefix}{id}"))
    }

    fn current_public_map(&self) -> anyhow::Result<AssetMap> {
        {
            let map = self.public_map_read();
            if !map.is_empty() {
                return Ok(map.clone());
            }
        }
        let loaded = load_asset_map(&*self.fs, &self.layout.public_map_path())?;
        *self.public_map_mut() = loaded.clone();
        Ok(loaded)
    }

    /// Snapshot of the public asset map.
    pub fn public_map(&self) -> Result<AssetMap> {
        self.current_public_map().map_err(build_error)
    }

    /// Hashed public URL for a source path relative to the public dir.
    pub fn public_url(&self, rel: &str) -> Option<String> {
        let map = self.current_public_map().ok()?;
        let rel = crate::matcher::normalize(rel);
        map.get(rel.as_str())
            .map(|id| format!("{}{}", self.layout.public_url_prefix, id))
    }

    /// URL of the current normal bundle, from the reference file.
    pub fn normal_css_url(&self) -> Result<Option<String>> {
        let ref_path = self.layout.normal_css_ref_path();
        if !self.fs.exists(&ref_path) {
            return Ok(None);
        }
        let name = self.fs.read_to_string(&ref_path).map_err(build_error)?;
        let name = name.trim();
        if name.is_empty() {
            return Ok(None);
        }
        Ok(Some(format!("{}{}", self.layout.public_url_prefix, name)))
    }

    /// Current critical bundle bytes (empty before the first build).
    pub fn critical_css(&self) -> Result<Vec<u8>> {
        let path = self.layout.critical_css_path();
        if !self.fs.exists(&path) {
            return Ok(Vec::new());
        }
        self.fs.read(&path).map_err(build_error)
    }

    fn public_map_read(&self) -> std::sync::RwLockReadGuard<'_, AssetMap> {
        match self.public_map.read() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn public_map_mut(&self) -> std::sync::RwLockWriteGuard<'_, AssetMap> {
        match self.public_map.write() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// All files of `tree` as `(relative slash path, absolute path)`, sorted.
/// A missing root yields nothing.
fn walk_files(tree: &SubTree) -> anyhow::Result<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();
    if !tree.is_dir(Path::new("")) {
        debug!(root = ?tree.base(), "static source dir missing; nothing to process");
        return Ok(files);
    }

    let mut stack = vec![PathBuf::new()];
    while let Some(dir) = stack.pop() {
        for rel in tree.read_dir(&dir)? {
            if tree.is_dir(&rel) {
                stack.push(rel);
            } else if tree.is_file(&rel) {
                let rel_str = rel.to_string_lossy().replace('\\', "/");
                files.push((rel_str, tree.resolve(&rel)));
            }
        }
    }

    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

fn contents_of(files: Vec<(String, Vec<u8>)>) -> Vec<Vec<u8>> {
    files.into_iter().map(|(_, bytes)| bytes).collect()
}

fn count_write(report: &mut BuildReport, written: bool) {
    if written {
        report.written += 1;
    } else {
        report.skipped += 1;
    }
}

fn build_error(err: anyhow::Error) -> DevloopError {
    DevloopError::Build(format!("{err:#}"))
}

/// Run blocking filesystem work off the async threads.
async fn run_blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| DevloopError::Build(format!("asset build task panicked: {e}")))?
}
