// src/process/backend.rs

//! Pluggable application-process abstraction.
//!
//! The engine drives the supervised app through `AppProcess` instead of the
//! concrete [`Supervisor`](super::Supervisor). Tests swap in a fake that
//! records calls and never spawns anything.

use std::future::Future;
use std::pin::Pin;

use crate::errors::Result;

pub type ProcessFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Lifecycle of the one supervised application.
pub trait AppProcess: Send + Sync {
    /// Rebuild the executable with the project toolchain.
    fn recompile(&self) -> ProcessFuture<'_>;

    /// Launch the executable. A running instance is stopped first.
    fn start(&self) -> ProcessFuture<'_>;

    /// Terminate the running instance. No-op when nothing runs.
    fn stop(&self) -> ProcessFuture<'_>;

    /// Poll the health check until it answers 200 or attempts run out.
    fn wait_for_readiness(&self) -> ProcessFuture<'_>;
}

impl std::fmt::Debug for dyn AppProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AppProcess")
    }
}
