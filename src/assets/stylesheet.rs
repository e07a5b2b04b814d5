// src/assets/stylesheet.rs

//! Stylesheet bundling: concatenation, `url(...)` rewriting, whitespace
//! minification.

use std::path::Path;
use std::sync::LazyLock;

use anyhow::Result;
use regex::{Captures, Regex};
use tracing::warn;

use crate::fs::FileSystem;

/// Base name of the hashed normal bundle in the public output dir.
pub const NORMAL_BUNDLE_BASE: &str = "normal";

static URL_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"url\(\s*(['"]?)([^'")]+?)(['"]?)\s*\)"#).expect("static regex")
});

/// Matches every normal bundle this pipeline has ever emitted.
pub static NORMAL_BUNDLE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^normal_[0-9a-f]{12}\.css$").expect("static regex")
});

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));

/// Read the `.css` files directly inside `dir`, sorted by file name.
///
/// A missing directory yields no files.
pub fn collect_css(fs: &dyn FileSystem, dir: &Path) -> Result<Vec<(String, Vec<u8>)>> {
    if !fs.is_dir(dir) {
        return Ok(Vec::new());
    }

    let mut names: Vec<(String, std::path::PathBuf)> = fs
        .read_dir(dir)?
        .into_iter()
        .filter(|p| fs.is_file(p))
        .filter_map(|p| {
            let name = p.file_name()?.to_str()?.to_string();
            name.ends_with(".css").then_some((name, p))
        })
        .collect();
    names.sort_by(|a, b| a.0.cmp(&b.0));

    let mut files = Vec::with_capacity(names.len());
    for (name, path) in names {
        files.push((name, fs.read(&path)?));
    }
    Ok(files)
}

/// True for targets the pipeline must leave alone.
pub fn is_external_url(target: &str) -> bool {
    let t = target.trim().to_ascii_lowercase();
    t.starts_with("http://")
        || t.starts_with("https://")
        || t.starts_with("//")
        || t.starts_with("data:")
        || t.starts_with('#')
}

/// Concatenate `files` and rewrite local `url(...)` references through
/// `resolve`. Unresolvable references are kept verbatim.
pub fn render_stylesheet<F>(files: &[Vec<u8>], resolve: F) -> Vec<u8>
where
    F: Fn(&str) -> Option<String>,
{
    let joined: Vec<u8> = files.concat();
    let text = String::from_utf8_lossy(&joined);

    let rewritten = URL_REF.replace_all(&text, |caps: &Captures<'_>| {
        let open = &caps[1];
        let target = &caps[2];
        let close = &caps[3];
        if is_external_url(target) {
            return caps[0].to_string();
        }
        match resolve(target.trim()) {
            Some(url) => format!("url({open}{url}{close})"),
            None => {
                warn!(target = %target, "stylesheet references an unknown public asset");
                caps[0].to_string()
            }
        }
    });

    rewritten.into_owned().into_bytes()
}

/// Collapse whitespace runs to one space and trim the ends.
pub fn minify_whitespace(css: &str) -> String {
    WHITESPACE.replace_all(css, " ").trim().to_string()
}
