// src/process/mod.rs

//! Application process supervision.
//!
//! - [`backend`] defines the `AppProcess` trait the engine talks to.
//! - [`supervisor`] is the production implementation: one child process,
//!   persisted PID file, orphan cleanup.
//! - [`toolchain`] runs the build command and installs the artifact.
//! - [`readiness`] polls the app's health check.

pub mod backend;
pub mod readiness;
pub mod supervisor;
pub mod toolchain;

pub use backend::{AppProcess, ProcessFuture};
pub use readiness::{health_url, wait_until_ready};
pub use supervisor::{ProcessHandle, ProcessState, Supervisor, SupervisorConfig};
