// src/watch/event.rs

//! Filesystem events as the debouncer and classifier see them.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use notify::event::{EventKind, ModifyKind};

/// Set of operations observed for a path.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FileOps(u8);

impl FileOps {
    pub const WRITE: FileOps = FileOps(1);
    pub const CREATE: FileOps = FileOps(1 << 1);
    pub const REMOVE: FileOps = FileOps(1 << 2);
    pub const RENAME: FileOps = FileOps(1 << 3);
    pub const METADATA: FileOps = FileOps(1 << 4);

    pub const fn empty() -> Self {
        FileOps(0)
    }

    pub const fn union(self, other: FileOps) -> Self {
        FileOps(self.0 | other.0)
    }

    pub const fn contains(self, other: FileOps) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Only attributes changed (chmod, touch), not the contents.
    pub const fn is_metadata_only(self) -> bool {
        self.0 == Self::METADATA.0
    }

    /// Map a notify event kind. `None` for kinds that never matter (reads).
    pub fn from_kind(kind: &EventKind) -> Option<FileOps> {
        let ops = match kind {
            EventKind::Access(_) => return None,
            EventKind::Create(_) => Self::CREATE,
            EventKind::Remove(_) => Self::REMOVE,
            EventKind::Modify(ModifyKind::Metadata(_)) => Self::METADATA,
            EventKind::Modify(ModifyKind::Name(_)) => Self::RENAME,
            EventKind::Modify(_) | EventKind::Any | EventKind::Other => Self::WRITE,
        };
        Some(ops)
    }
}

impl std::ops::BitOr for FileOps {
    type Output = FileOps;

    fn bitor(self, rhs: FileOps) -> FileOps {
        self.union(rhs)
    }
}

impl fmt::Debug for FileOps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::WRITE, "write"),
            (Self::CREATE, "create"),
            (Self::REMOVE, "remove"),
            (Self::RENAME, "rename"),
            (Self::METADATA, "metadata"),
        ];
        let set: Vec<&str> = names
            .iter()
            .filter(|(op, _)| self.contains(*op))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "FileOps({})", set.join("|"))
    }
}

/// One observed change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    /// Relative to the project root, slash-separated.
    pub path: String,
    pub ops: FileOps,
    pub at: Instant,
    /// File size when the event was received; `None` if it could not be read
    /// (removed, or a directory).
    pub len: Option<u64>,
}

impl FileEvent {
    pub fn new(path: impl Into<String>, ops: FileOps, at: Instant) -> Self {
        Self {
            path: crate::matcher::normalize(&path.into()),
            ops,
            at,
            len: None,
        }
    }

    pub fn with_len(mut self, len: u64) -> Self {
        self.len = Some(len);
        self
    }

    /// A metadata-only event on a file that has contents. Editors and
    /// build tools emit these constantly without changing anything.
    pub fn is_noise(&self) -> bool {
        self.ops.is_metadata_only() && self.len.is_some_and(|l| l > 0)
    }
}

/// The latest event per path from one debounce window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventBatch {
    events: BTreeMap<String, FileEvent>,
}

impl EventBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last write wins.
    pub fn insert(&mut self, event: FileEvent) {
        self.events.insert(event.path.clone(), event);
    }

    pub fn get(&self, path: &str) -> Option<&FileEvent> {
        self.events.get(path)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileEvent> {
        self.events.values()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.events.keys().map(String::as_str)
    }

    /// True if at least one event is more than attribute noise.
    pub fn has_substantive(&self) -> bool {
        self.events.values().any(|e| !e.is_noise())
    }
}

impl FromIterator<FileEvent> for EventBatch {
    fn from_iter<I: IntoIterator<Item = FileEvent>>(iter: I) -> Self {
        let mut batch = EventBatch::new();
        for ev in iter {
            batch.insert(ev);
        }
        batch
    }
}
