// src/watch/mod.rs

//! File watching and change classification.
//!
//! - [`watcher`] wires up `notify` and runs the collector task.
//! - [`debouncer`] turns single events into batches (pure).
//! - [`classify`] decides what each path in a batch means (pure).
//! - [`rules`] holds `[[watch.rule]]` entries in matchable form.
//!
//! Nothing here builds or restarts anything; the engine acts on the
//! classified batches.

pub mod classify;
pub mod debouncer;
pub mod event;
pub mod path_utils;
pub mod rules;
pub mod watcher;

pub use classify::{
    ignore_patterns, ClassifiedBatch, ClassifiedPath, Classifier, ClassifierDirs, PathKind,
    RuleRef, BUILTIN_IGNORES,
};
pub use debouncer::Debouncer;
pub use event::{EventBatch, FileEvent, FileOps};
pub use rules::{rules_from_config, WatchRule};
pub use watcher::{spawn_watcher, WatchOptions, WatcherHandle};
