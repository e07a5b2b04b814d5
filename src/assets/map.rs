// src/assets/map.rs

//! Persisted asset maps: relative source path → output identifier.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::fs::{write_if_changed, FileSystem};

/// One static directory's snapshot. Ordered so the JSON on disk is stable.
pub type AssetMap = BTreeMap<String, String>;

/// Load a map written by a previous build. A missing file is an empty map.
pub fn load_asset_map(fs: &dyn FileSystem, path: &Path) -> Result<AssetMap> {
    if !fs.exists(path) {
        debug!(?path, "no previous asset map");
        return Ok(AssetMap::new());
    }
    let contents = fs.read_to_string(path)?;
    let map: AssetMap = serde_json::from_str(&contents)
        .with_context(|| format!("parsing asset map at {:?}", path))?;
    Ok(map)
}

/// Persist `map`. Leaves the file untouched when its contents already match.
pub fn save_asset_map(fs: &dyn FileSystem, path: &Path, map: &AssetMap) -> Result<()> {
    let json = serde_json::to_vec_pretty(map).context("serializing asset map")?;
    let written = write_if_changed(fs, path, &json)
        .with_context(|| format!("writing asset map to {:?}", path))?;
    debug!(?path, entries = map.len(), written, "saved asset map");
    Ok(())
}
