//! Source entries and change classification.
//!
//! An [`Entry`] is the path/identity wrapper for one content item: it knows
//! where the item's source files live and where its published outputs go,
//! independent of the item's rendered form. Entries are recreated on every
//! run and never persisted.
//!
//! ## Entry layout
//!
//! ```text
//! src/<type>/<name>/
//! ├── index.toml        # Metadata: title, slug, date, categories, draft
//! ├── content.md        # Body (rendered into the entity document)
//! ├── excerpt.md        # Excerpt (rendered into index pages)
//! └── static/           # Optional assets, copied to dist/static/<type>/<name>
//! ```
//!
//! ## Change classification
//!
//! Classification compares source modification times against the published
//! output and assigns three independent flags (entity document stale, index
//! projection stale, static dir stale). The comparison itself is a pure
//! function over collected timestamps ([`classify`]); the filesystem shims
//! ([`source_times`], [`dist_times`]) only gather the inputs. An entry with
//! no flag set is dropped from the update set entirely.

use crate::config::BuildConfig;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;
use walkdir::WalkDir;

/// Metadata file name within an entry's source directory.
pub const META_FILE: &str = "index.toml";
/// Body file name within an entry's source directory.
pub const CONTENT_FILE: &str = "content.md";
/// Excerpt file name within an entry's source directory.
pub const EXCERPT_FILE: &str = "excerpt.md";
/// Static assets directory name within an entry's source directory.
pub const STATIC_DIR: &str = "static";

#[derive(Error, Debug)]
pub enum EntryError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Missing required file '{file}' for entry '{name}'")]
    MissingRequiredFile { name: String, file: PathBuf },
}

/// Path/identity wrapper for one content item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Stable identity: the source directory name.
    pub name: String,
    /// Source directory: `src/<type>/<name>`.
    pub src: PathBuf,
    pub src_meta: PathBuf,
    pub src_content: PathBuf,
    pub src_excerpt: PathBuf,
    pub src_static: PathBuf,
    /// Output directory: `dist/<type>/<name>`.
    pub dist: PathBuf,
    /// Default (unhashed) output document: `dist/<type>/<name>/index.json`.
    pub dist_doc: PathBuf,
    /// Published static assets: `dist/static/<type>/<name>`.
    pub dist_static: PathBuf,
    /// URL prefix rewritten into rendered relative asset references.
    pub urls_path: String,
}

impl Entry {
    pub fn new(name: &str, type_name: &str, config: &BuildConfig) -> Self {
        let src = config.src_type(type_name).join(name);
        let dist = config.dist_type(type_name).join(name);
        Self {
            name: name.to_string(),
            src_meta: src.join(META_FILE),
            src_content: src.join(CONTENT_FILE),
            src_excerpt: src.join(EXCERPT_FILE),
            src_static: src.join(STATIC_DIR),
            src,
            dist_doc: dist.join("index.json"),
            dist,
            dist_static: config.dist_static(type_name).join(name),
            urls_path: format!("/static/{}/{}", type_name, name),
        }
    }
}

/// The three independent staleness flags assigned by classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeFlags {
    /// Metadata or body newer than the published document.
    pub entity: bool,
    /// Metadata or excerpt newer than the published document.
    pub index: bool,
    /// Source static dir present and newer than the published one (or the
    /// published one is missing).
    pub static_dir: bool,
}

impl ChangeFlags {
    /// Everything stale — used for added entries and forced rebuilds.
    pub fn all() -> Self {
        Self {
            entity: true,
            index: true,
            static_dir: true,
        }
    }

    pub fn any(&self) -> bool {
        self.entity || self.index || self.static_dir
    }
}

/// Source-side modification times of one entry.
#[derive(Debug, Clone, Copy)]
pub struct SourceTimes {
    pub meta: SystemTime,
    pub content: SystemTime,
    pub excerpt: SystemTime,
    /// Newest file inside `static/`, or `None` when the dir is missing/empty.
    pub static_dir: Option<SystemTime>,
}

/// Output-side modification times of one entry.
///
/// `None` means "never published": any source time counts as newer.
#[derive(Debug, Clone, Copy, Default)]
pub struct DistTimes {
    pub doc: Option<SystemTime>,
    pub static_dir: Option<SystemTime>,
}

/// Assign change flags by comparing source times against published times.
///
/// Comparisons are strict (`>`): equal timestamps mean unchanged.
pub fn classify(src: &SourceTimes, dist: &DistTimes) -> ChangeFlags {
    let newer = |time: SystemTime| dist.doc.is_none_or(|doc| time > doc);
    ChangeFlags {
        entity: newer(src.meta) || newer(src.content),
        index: newer(src.meta) || newer(src.excerpt),
        static_dir: src.static_dir.is_some_and(|src_static| {
            dist.static_dir.is_none_or(|dist_static| src_static > dist_static)
        }),
    }
}

/// Collect source modification times for an entry.
///
/// Fails with [`EntryError::MissingRequiredFile`] when the metadata, body,
/// or excerpt file is absent; a missing static dir is not an error.
pub fn source_times(entry: &Entry) -> Result<SourceTimes, EntryError> {
    Ok(SourceTimes {
        meta: required_mtime(entry, &entry.src_meta)?,
        content: required_mtime(entry, &entry.src_content)?,
        excerpt: required_mtime(entry, &entry.src_excerpt)?,
        static_dir: newest_in_dir(&entry.src_static),
    })
}

/// Collect published modification times for an entry.
///
/// With hashed filenames the exact document name is unknown in advance, so
/// the published time is the newest file anywhere inside the entry's output
/// directory. Missing outputs read as "never published" rather than failing.
pub fn dist_times(entry: &Entry, hash: bool) -> DistTimes {
    DistTimes {
        doc: if hash {
            newest_in_dir(&entry.dist)
        } else {
            fs::metadata(&entry.dist_doc)
                .and_then(|meta| meta.modified())
                .ok()
        },
        static_dir: newest_in_dir(&entry.dist_static),
    }
}

fn required_mtime(entry: &Entry, path: &Path) -> Result<SystemTime, EntryError> {
    match fs::metadata(path) {
        Ok(meta) => Ok(meta.modified()?),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            Err(EntryError::MissingRequiredFile {
                name: entry.name.clone(),
                file: path.to_path_buf(),
            })
        }
        Err(err) => Err(err.into()),
    }
}

/// Newest file modification time under a directory, or `None` when the
/// directory is missing or holds no files.
fn newest_in_dir(dir: &Path) -> Option<SystemTime> {
    if !dir.is_dir() {
        return None;
    }
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|walked| walked.ok())
        .filter(|walked| walked.file_type().is_file())
        .filter_map(|walked| walked.metadata().ok()?.modified().ok())
        .max()
}

/// List entry names (subdirectory names) in a type directory, sorted.
///
/// Hidden directories are skipped. The caller decides what a missing
/// directory means: fatal for sources, empty for unpublished outputs.
pub fn list_entry_names(dir: &Path) -> io::Result<Vec<String>> {
    let mut names: Vec<String> = fs::read_dir(dir)?
        .filter_map(|dirent| dirent.ok())
        .filter(|dirent| dirent.path().is_dir())
        .filter_map(|dirent| dirent.file_name().into_string().ok())
        .filter(|name| !name.starts_with('.'))
        .collect();
    names.sort();
    Ok(names)
}

/// The listing diff between source and published entry names.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct EntrySets {
    /// Present in source, absent from output.
    pub add: Vec<String>,
    /// Present in output, absent from source.
    pub remove: Vec<String>,
    /// Present in both — candidates for update.
    pub old: Vec<String>,
}

/// Split sorted source/output name lists into add/remove/old sets.
pub fn split_entries(src: &[String], dist: &[String]) -> EntrySets {
    EntrySets {
        add: src.iter().filter(|name| !dist.contains(name)).cloned().collect(),
        remove: dist.iter().filter(|name| !src.contains(name)).cloned().collect(),
        old: src.iter().filter(|name| dist.contains(name)).cloned().collect(),
    }
}
