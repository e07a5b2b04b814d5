// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DevloopError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Toolchain or asset pipeline failure. The message carries captured
    /// build-tool output when there is any.
    #[error("Build failed: {0}")]
    Build(String),

    #[error("Callback for '{path}' failed: {message}")]
    Callback { path: String, message: String },

    #[error("Process supervision error: {0}")]
    Process(String),

    #[error("App did not become ready after {attempts} health checks against {url}")]
    Readiness { url: String, attempts: u32 },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DevloopError {
    /// Flatten into a build error, keeping the full context chain.
    ///
    /// Used where one failure is shared between several waiters and has to
    /// be re-created for each of them.
    pub fn to_build_message(&self) -> String {
        match self {
            DevloopError::Build(msg) => msg.clone(),
            DevloopError::Other(err) => format!("{err:#}"),
            other => other.to_string(),
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, DevloopError>;
