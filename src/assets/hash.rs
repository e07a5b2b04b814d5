// src/assets/hash.rs

//! Content fingerprints and output identifiers.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use blake3::Hasher;

use crate::fs::FileSystem;

/// Hex characters of the fingerprint kept in output names.
pub const SHORT_HASH_LEN: usize = 12;

/// Full blake3 hex digest of `bytes`.
pub fn content_hash(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// Stream a file through blake3.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file = fs
        .open_read(path)
        .with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// `<base>_<12 hex>[.<ext>]`.
pub fn hashed_name(base: &str, ext: Option<&str>, bytes: &[u8]) -> String {
    name_for_digest(base, ext, &content_hash(bytes))
}

fn name_for_digest(base: &str, ext: Option<&str>, digest: &str) -> String {
    let short = &digest[..SHORT_HASH_LEN.min(digest.len())];
    match ext {
        Some(ext) => format!("{base}_{short}.{ext}"),
        None => format!("{base}_{short}"),
    }
}

/// Output identifier for a hashed static file.
///
/// The relative path (minus extension, separators turned into `_`) is the
/// base name, so files from different directories never collide once they
/// are flattened into one output directory:
///
/// `images/logo.png` → `images_logo_3f2a9c0d11be.png`
pub fn output_identifier(rel_path: &str, bytes: &[u8]) -> String {
    identifier_for_digest(rel_path, &content_hash(bytes))
}

/// [`output_identifier`] from an already computed digest, e.g. one from
/// [`compute_file_hash`].
pub fn identifier_for_digest(rel_path: &str, digest: &str) -> String {
    let rel_path = rel_path.replace('\\', "/");
    let (stem, ext) = split_extension(&rel_path);
    name_for_digest(&stem.replace('/', "_"), ext, digest)
}

/// Split at the last `.` of the final path segment. Leading dots (dotfiles)
/// are not extensions.
fn split_extension(rel_path: &str) -> (&str, Option<&str>) {
    let name_start = rel_path.rfind('/').map(|i| i + 1).unwrap_or(0);
    match rel_path[name_start..].rfind('.') {
        Some(0) | None => (rel_path, None),
        Some(dot) => {
            let dot = name_start + dot;
            (&rel_path[..dot], Some(&rel_path[dot + 1..]))
        }
    }
}
