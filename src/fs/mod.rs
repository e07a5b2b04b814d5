// src/fs/mod.rs

//! Filesystem capability used by the asset pipeline.
//!
//! A small closed set of implementations sits behind one trait:
//! - [`RealFileSystem`]: `std::fs`.
//! - [`SubTree`]: another filesystem seen from one of its directories.
//! - [`mock::MockFileSystem`]: in-memory, counts writes; for tests.
//!
//! The implementation is picked once at startup and handed around as
//! `Arc<dyn FileSystem>`.

use std::fmt::Debug;
use std::fs;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

pub mod mock;

/// Abstract filesystem interface.
pub trait FileSystem: Send + Sync + Debug {
    fn read(&self, path: &Path) -> Result<Vec<u8>>;
    fn read_to_string(&self, path: &Path) -> Result<String>;
    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>>;

    /// Write a file, creating parent directories as needed.
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;

    /// Remove a file. Removing a file that does not exist is not an error.
    fn remove_file(&self, path: &Path) -> Result<()>;

    /// Remove a directory tree. A missing directory is not an error.
    fn remove_dir_all(&self, path: &Path) -> Result<()>;
    fn create_dir_all(&self, path: &Path) -> Result<()>;

    fn exists(&self, path: &Path) -> bool;
    fn is_file(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;

    /// Return a list of entries in a directory.
    /// Returns full paths.
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).with_context(|| format!("reading file {:?}", path))
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).with_context(|| format!("reading file {:?}", path))
    }

    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>> {
        let file = fs::File::open(path).with_context(|| format!("opening file {:?}", path))?;
        Ok(Box::new(file))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating dir {:?}", parent))?;
        }
        let mut file = fs::File::create(path).with_context(|| format!("creating file {:?}", path))?;
        file.write_all(contents).with_context(|| format!("writing to file {:?}", path))?;
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("removing file {:?}", path)),
        }
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        match fs::remove_dir_all(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("removing dir {:?}", path)),
        }
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).with_context(|| format!("creating dir {:?}", path))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path).with_context(|| format!("reading dir {:?}", path))? {
            let entry = entry?;
            entries.push(entry.path());
        }
        Ok(entries)
    }
}

/// A view of another filesystem rooted at `base`.
///
/// Paths are relative to `base`, and `read_dir` returns them in that same
/// relative form. The empty path is `base` itself.
#[derive(Debug, Clone)]
pub struct SubTree {
    inner: Arc<dyn FileSystem>,
    base: PathBuf,
}

impl SubTree {
    pub fn new(inner: Arc<dyn FileSystem>, base: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            base: base.into(),
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Absolute path of `rel` in the underlying filesystem.
    pub fn resolve(&self, rel: &Path) -> PathBuf {
        if rel.as_os_str().is_empty() {
            self.base.clone()
        } else {
            self.base.join(rel)
        }
    }
}

impl FileSystem for SubTree {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.inner.read(&self.resolve(path))
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        self.inner.read_to_string(&self.resolve(path))
    }

    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>> {
        self.inner.open_read(&self.resolve(path))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.inner.write(&self.resolve(path), contents)
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        self.inner.remove_file(&self.resolve(path))
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        self.inner.remove_dir_all(&self.resolve(path))
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        self.inner.create_dir_all(&self.resolve(path))
    }

    fn exists(&self, path: &Path) -> bool {
        self.inner.exists(&self.resolve(path))
    }

    fn is_file(&self, path: &Path) -> bool {
        self.inner.is_file(&self.resolve(path))
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.inner.is_dir(&self.resolve(path))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let entries = self.inner.read_dir(&self.resolve(path))?;
        Ok(entries
            .into_iter()
            .filter_map(|p| p.strip_prefix(&self.base).ok().map(Path::to_path_buf))
            .collect())
    }
}

/// Write `contents` unless the file already holds exactly these bytes.
///
/// Returns whether a write happened. Keeps repeated builds from touching
/// files (and waking up watchers) when nothing changed.
pub fn write_if_changed(fs: &dyn FileSystem, path: &Path, contents: &[u8]) -> Result<bool> {
    if fs.is_file(path) {
        if let Ok(existing) = fs.read(path) {
            if existing == contents {
                return Ok(false);
            }
        }
    }
    fs.write(path, contents)?;
    Ok(true)
}
