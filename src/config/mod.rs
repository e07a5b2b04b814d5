// src/config/mod.rs

//! Configuration loading and validation for devloop.
//!
//! - `model.rs`: the TOML-backed data model.
//! - `loader.rs`: read a config file and resolve the project root.
//! - `validate.rs`: `TryFrom<RawConfigFile> for ConfigFile`.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{
    AppSection, AssetsSection, CallbackConfig, ConfigFile, LiveReloadSection,
    ProjectSection, RawConfigFile, RuleConfig, WatchSection,
};
