//! Build configuration.
//!
//! Configuration is an explicit value constructed once at process start and
//! passed into every stage — nothing in the core reads ambient global state.
//! Defaults are overridden by an optional `config.toml` in the source root,
//! which is in turn overridden by CLI flags.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! entities_per_page = 10  # Page size for category indexes
//! force = false           # Rebuild everything, ignoring timestamps
//! hash = false            # Content-hashed filenames + manifest.json
//! sub_version = false     # With hash: keep superseded hashed files
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Options read from `config.toml` in the source root.
///
/// Sparse on purpose: a config file overrides only the values it names.
/// Booleans are `Option` so that an absent key never overrides a CLI flag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub entities_per_page: Option<u32>,
    pub force: Option<bool>,
    pub hash: Option<bool>,
    pub sub_version: Option<bool>,
}

/// The complete configuration for one build run.
///
/// `dist_indexes(type)` and friends derive every output location from `dist`,
/// so path layout decisions live here and nowhere else.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Content source root; each child directory is one content type.
    pub src: PathBuf,
    /// Output root for generated endpoints.
    pub dist: PathBuf,
    /// Page size for category indexes. Must be > 0.
    pub entities_per_page: u32,
    /// Bypass change classification; treat every entry as fully updated.
    pub force: bool,
    /// Enable content-hashed filenames and manifest generation.
    pub hash: bool,
    /// With `hash`: never delete superseded hashed files (append-only).
    pub sub_version: bool,
}

pub const DEFAULT_ENTITIES_PER_PAGE: u32 = 10;

impl BuildConfig {
    pub fn new(src: PathBuf, dist: PathBuf) -> Self {
        Self {
            src,
            dist,
            entities_per_page: DEFAULT_ENTITIES_PER_PAGE,
            force: false,
            hash: false,
            sub_version: false,
        }
    }

    /// Overlay values from a file config (file wins over defaults, CLI flags
    /// are applied after and win over the file).
    pub fn merge_file(mut self, file: &FileConfig) -> Self {
        if let Some(n) = file.entities_per_page {
            self.entities_per_page = n;
        }
        if let Some(force) = file.force {
            self.force = force;
        }
        if let Some(hash) = file.hash {
            self.hash = hash;
        }
        if let Some(sub_version) = file.sub_version {
            self.sub_version = sub_version;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.entities_per_page == 0 {
            return Err(ConfigError::Validation(
                "entities_per_page must be greater than 0".into(),
            ));
        }
        if self.sub_version && !self.hash {
            return Err(ConfigError::Validation(
                "sub_version requires hash to be enabled".into(),
            ));
        }
        Ok(())
    }

    /// Source directory of one content type.
    pub fn src_type(&self, type_name: &str) -> PathBuf {
        self.src.join(type_name)
    }

    /// Output directory of one content type's entity documents.
    pub fn dist_type(&self, type_name: &str) -> PathBuf {
        self.dist.join(type_name)
    }

    /// Output directory of one content type's category indexes.
    pub fn dist_indexes(&self, type_name: &str) -> PathBuf {
        self.dist.join("categories").join(type_name)
    }

    /// Output directory of one content type's static assets.
    pub fn dist_static(&self, type_name: &str) -> PathBuf {
        self.dist.join("static").join(type_name)
    }
}

/// Load `config.toml` from the source root, if present.
pub fn load_file_config(src: &Path) -> Result<FileConfig, ConfigError> {
    let path = src.join("config.toml");
    if !path.exists() {
        return Ok(FileConfig::default());
    }
    let content = fs::read_to_string(&path)?;
    Ok(toml::from_str(&content)?)
}

/// A documented stock `config.toml` with every option at its default.
pub fn stock_config_toml() -> &'static str {
    r#"# static-api configuration
# All options are optional - defaults shown below.
# CLI flags override values set here.

# Page size for category indexes
entities_per_page = 10

# Rebuild everything, ignoring source/output timestamps
force = false

# Content-hashed filenames (index-<hash>.json) + manifest.json
hash = false

# With hash: keep superseded hashed files instead of replacing them
sub_version = false
"#
}
