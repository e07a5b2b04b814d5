// src/assets/mod.rs

//! Static asset handling: content hashing, asset maps, stylesheet bundles.

pub mod hash;
pub mod map;
pub mod pipeline;
pub mod stylesheet;

pub use hash::{
    compute_file_hash, content_hash, hashed_name, identifier_for_digest, output_identifier,
    SHORT_HASH_LEN,
};
pub use map::{load_asset_map, save_asset_map, AssetMap};
pub use pipeline::{AssetPipeline, BuildReport, StaticKind, StylesheetOutput};
