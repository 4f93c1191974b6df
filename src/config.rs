//! Build configuration with typed defaults.

use std::env;
use std::path::{Path, PathBuf};

/// Environment variable holding the deployment prefix.
pub const BASE_PATH_VAR: &str = "TRAVELOGUE_BASE_PATH";

/// Configuration for the site build.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory containing `posts.json` and the lookup tables.
    pub data_dir: PathBuf,

    /// Directory for generated output.
    pub public_dir: PathBuf,

    /// Prefix for every asset URL, e.g. `/newfienova` on a project page.
    pub base_path: String,

    /// Site title shown in the page header.
    pub site_title: String,

    /// Whether inline images point at the optimized variants.
    pub optimized_images: bool,
}

impl Config {
    /// Create config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults, with the base path taken from the environment if set.
    pub fn from_env() -> Self {
        match env::var(BASE_PATH_VAR) {
            Ok(base) => Self::new().base_path(base),
            Err(_) => Self::new(),
        }
    }

    /// Builder: set data directory.
    pub fn data_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.data_dir = path.as_ref().to_path_buf();
        self
    }

    /// Builder: set public (output) directory.
    pub fn public_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.public_dir = path.as_ref().to_path_buf();
        self
    }

    /// Builder: set the deployment prefix. Trailing slashes are dropped.
    pub fn base_path(mut self, base: impl Into<String>) -> Self {
        self.base_path = base.into().trim_end_matches('/').to_string();
        self
    }

    /// Builder: set site title.
    pub fn site_title(mut self, title: impl Into<String>) -> Self {
        self.site_title = title.into();
        self
    }

    /// Builder: toggle optimized inline images.
    pub fn optimized_images(mut self, enabled: bool) -> Self {
        self.optimized_images = enabled;
        self
    }

    pub fn posts_file(&self) -> PathBuf {
        self.data_dir.join("posts.json")
    }

    pub fn index_html(&self) -> PathBuf {
        self.public_dir.join("index.html")
    }

    /// Gallery manifest consumed by the lightbox script.
    pub fn media_manifest(&self) -> PathBuf {
        self.public_dir.join("media-index.json")
    }

    /// Prefix an asset path with the base path, once.
    pub fn asset_path(&self, path: &str) -> String {
        if !self.base_path.is_empty() && path.starts_with(&self.base_path) {
            return path.to_string();
        }
        if path.starts_with('/') {
            format!("{}{}", self.base_path, path)
        } else {
            format!("{}/{}", self.base_path, path)
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            public_dir: PathBuf::from("public"),
            base_path: String::new(),
            site_title: String::from("Maritime Biking"),
            optimized_images: true,
        }
    }
}
