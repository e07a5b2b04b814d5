// src/layout.rs

//! Where everything lives on disk, derived once from the config.
//!
//! ```text
//! <root>/<output_dir>/
//!   bin/<app name>                 supervised executable
//!   static/assets/public/          hashed public files + normal_<hash>.css
//!   static/assets/private/         hashed private files
//!   static/internal/
//!     public_filemap.json
//!     private_filemap.json
//!     normal_css_file_ref.txt
//!     critical.css
//!     app.pid
//! ```

use std::path::PathBuf;

use crate::config::ConfigFile;

pub const PUBLIC_FILEMAP: &str = "public_filemap.json";
pub const PRIVATE_FILEMAP: &str = "private_filemap.json";
pub const NORMAL_CSS_REF: &str = "normal_css_file_ref.txt";
pub const CRITICAL_CSS: &str = "critical.css";
pub const PID_FILE: &str = "app.pid";

#[derive(Debug, Clone)]
pub struct Layout {
    pub root: PathBuf,
    pub output_dir: PathBuf,

    pub public_src: PathBuf,
    pub private_src: PathBuf,
    pub critical_css_src: PathBuf,
    pub normal_css_src: PathBuf,

    /// Root-relative forms of the source dirs above, slash-separated, as used
    /// for classification.
    pub public_rel: String,
    pub private_rel: String,
    pub critical_css_rel: String,
    pub normal_css_rel: String,
    pub output_rel: String,

    pub no_hash_prefix: String,
    /// Always ends with `/`.
    pub public_url_prefix: String,

    pub executable: PathBuf,
}

impl Layout {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        let root = cfg.root().to_path_buf();
        let output_dir = cfg.output_dir();
        let assets = &cfg.assets;

        let mut public_url_prefix = assets.public_url_prefix.clone();
        if !public_url_prefix.starts_with('/') {
            public_url_prefix.insert(0, '/');
        }
        if !public_url_prefix.ends_with('/') {
            public_url_prefix.push('/');
        }

        Self {
            public_src: root.join(&assets.public_dir),
            private_src: root.join(&assets.private_dir),
            critical_css_src: root.join(&assets.critical_css_dir),
            normal_css_src: root.join(&assets.normal_css_dir),
            public_rel: rel_dir(&assets.public_dir),
            private_rel: rel_dir(&assets.private_dir),
            critical_css_rel: rel_dir(&assets.critical_css_dir),
            normal_css_rel: rel_dir(&assets.normal_css_dir),
            output_rel: rel_dir(&cfg.project.output_dir.to_string_lossy()),
            no_hash_prefix: assets.no_hash_prefix.trim_matches('/').to_string(),
            public_url_prefix,
            executable: output_dir.join("bin").join(executable_name(&cfg.app.name)),
            output_dir,
            root,
        }
    }

    pub fn static_dir(&self) -> PathBuf {
        self.output_dir.join("static")
    }

    pub fn public_out(&self) -> PathBuf {
        self.static_dir().join("assets").join("public")
    }

    pub fn private_out(&self) -> PathBuf {
        self.static_dir().join("assets").join("private")
    }

    pub fn internal_dir(&self) -> PathBuf {
        self.static_dir().join("internal")
    }

    pub fn public_map_path(&self) -> PathBuf {
        self.internal_dir().join(PUBLIC_FILEMAP)
    }

    pub fn private_map_path(&self) -> PathBuf {
        self.internal_dir().join(PRIVATE_FILEMAP)
    }

    pub fn normal_css_ref_path(&self) -> PathBuf {
        self.internal_dir().join(NORMAL_CSS_REF)
    }

    pub fn critical_css_path(&self) -> PathBuf {
        self.internal_dir().join(CRITICAL_CSS)
    }

    pub fn pid_path(&self) -> PathBuf {
        self.internal_dir().join(PID_FILE)
    }

    /// Directories a full build recreates after wiping `static/`.
    pub fn skeleton(&self) -> Vec<PathBuf> {
        vec![self.public_out(), self.private_out(), self.internal_dir()]
    }
}

fn rel_dir(dir: &str) -> String {
    crate::matcher::normalize(dir).trim_end_matches('/').to_string()
}

fn executable_name(name: &str) -> String {
    if cfg!(windows) {
        format!("{name}.exe")
    } else {
        name.to_string()
    }
}
