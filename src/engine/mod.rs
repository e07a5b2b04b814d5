// src/engine/mod.rs

//! Orchestration engine for devloop.
//!
//! This module ties together:
//! - the classified batches coming out of the watcher
//! - the asset pipeline and the app process
//! - rule callbacks
//! - live-reload broadcasts
//!
//! The pure planning step lives in [`core`]; [`dispatch`] carries a plan out
//! against a [`DevContext`], and [`runtime`] is the async loop around it.

use crate::watch::EventBatch;

/// Events flowing into the runtime.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A debounced batch of filesystem changes.
    Batch(EventBatch),
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

/// What dispatching one batch ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Nothing in the batch was relevant.
    Ignored,
    /// Assets or stylesheets were patched in place; the app kept running.
    HotReloaded,
    /// The app was rebuilt and/or restarted.
    Restarted,
}

pub mod context;
pub mod core;
pub mod dispatch;
pub mod runtime;

pub use context::DevContext;
pub use core::{plan_batch, BatchPlan, DefaultAction, HotMessage, PathStep};
pub use dispatch::dispatch_batch;
pub use runtime::Runtime;
