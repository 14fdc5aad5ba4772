//! Endpoint writing: the committing half of a build.
//!
//! Takes the declarative [`Update`] a plan produced and applies it to the
//! output tree. All serialization happens here, so the planner stays free of
//! write effects and the output layout lives in one place:
//!
//! ```text
//! dist/
//! ├── <type>/<name>/index[-<hash>].json          # Entity documents
//! ├── static/<type>/<name>/…                     # Copied static assets
//! └── categories/<type>/
//!     ├── index[-<hash>].json                    # Categories listing
//!     ├── <bucket>/<page>/index[-<hash>].json    # Index pages
//!     ├── cache.json                             # Differ state
//!     └── manifest.json                          # Hash lookup (hash mode)
//! ```
//!
//! With hashed filenames, superseded `index-<hash>.json` siblings are removed
//! before each write unless `sub_version` keeps them. `cache.json` is written
//! through a temp file and renamed, so an interrupted run never leaves a
//! truncated cache behind.

use crate::config::BuildConfig;
use crate::entity::doc_path;
use crate::plan::{CACHE_FILE, Update};
use crate::types::{Indexes, Page};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Manifest file name within the indexes directory.
pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Error, Debug)]
pub enum EndpointError {
    #[error("There was an error while writing '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("There was an error while removing '{path}': {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("There was an error while serializing '{path}': {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// What a commit actually touched, for the build summary.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommitStats {
    pub documents_written: usize,
    pub documents_removed: usize,
    pub static_dirs_copied: usize,
    pub pages_written: usize,
    pub indexes_removed: usize,
}

/// Apply one planned update to the output tree.
pub fn commit(update: &Update, config: &BuildConfig) -> Result<CommitStats, EndpointError> {
    let mut stats = CommitStats::default();

    for entry in &update.entries.remove {
        remove_tree(&entry.dist)?;
        remove_tree(&entry.dist_static)?;
        stats.documents_removed += 1;
    }

    for planned in update.entries.add.iter().chain(&update.entries.update) {
        if planned.flags.entity
            && let Some(entity) = &planned.entity
        {
            let path = doc_path(&planned.entry, entity);
            if config.hash && !config.sub_version {
                remove_superseded(&planned.entry.dist, &path)?;
            }
            write_json(&path, entity)?;
            stats.documents_written += 1;
        }
        if planned.flags.static_dir && planned.entry.src_static.is_dir() {
            replace_dir(&planned.entry.src_static, &planned.entry.dist_static)?;
            stats.static_dirs_copied += 1;
        }
    }

    stats.indexes_removed = update.indexes.remove.len();
    for path in &update.indexes.remove {
        remove_tree(path)?;
    }

    let indexes_dir = config.dist_indexes(&update.type_name);
    for (bucket, pages) in &update.indexes.write {
        for (number, page) in pages {
            let dir = indexes_dir.join(bucket).join(number.to_string());
            let path = page_path(&dir, page);
            if config.hash && !config.sub_version {
                remove_superseded(&dir, &path)?;
            }
            write_json(&path, page)?;
            stats.pages_written += 1;
        }
    }

    // Listing and cache only move when the index set moved.
    if !update.indexes.write.is_empty() || !update.indexes.remove.is_empty() {
        write_listing(&indexes_dir, update, config)?;
        write_atomic_json(&indexes_dir.join(CACHE_FILE), &update.indexes.cache)?;
    }

    if let Some(manifest) = &update.manifest {
        write_atomic_json(&indexes_dir.join(MANIFEST_FILE), manifest)?;
    }

    Ok(stats)
}

/// Write the categories listing: bucket slug → display name.
fn write_listing(
    indexes_dir: &Path,
    update: &Update,
    config: &BuildConfig,
) -> Result<(), EndpointError> {
    let listing = categories_listing(&update.indexes.cache);
    let path = match update.manifest.as_ref() {
        Some(manifest) => indexes_dir.join(format!("index-{}.json", manifest.categories)),
        None => indexes_dir.join("index.json"),
    };
    if config.hash && !config.sub_version {
        remove_superseded(indexes_dir, &path)?;
    }
    write_json(&path, &listing)
}

fn categories_listing(cache: &Indexes) -> BTreeMap<String, String> {
    cache
        .keys()
        .map(|slug| (slug.clone(), display_name(slug)))
        .collect()
}

/// Capitalize a bucket slug for display (`all` → `All`, `essays` → `Essays`).
fn display_name(slug: &str) -> String {
    let mut chars = slug.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn page_path(dir: &Path, page: &Page) -> PathBuf {
    match &page.hash {
        Some(hash) => dir.join(format!("index-{hash}.json")),
        None => dir.join("index.json"),
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), EndpointError> {
    let bytes = serde_json::to_vec(value).map_err(|source| EndpointError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;
    let write = |path: &Path| -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, &bytes)
    };
    write(path).map_err(|source| EndpointError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Write through a temp sibling and rename into place.
fn write_atomic_json<T: Serialize>(path: &Path, value: &T) -> Result<(), EndpointError> {
    let temp = path.with_extension("json.tmp");
    write_json(&temp, value)?;
    fs::rename(&temp, path).map_err(|source| EndpointError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Remove old `index-<hash>.json` siblings, keeping the file being written.
fn remove_superseded(dir: &Path, keep: &Path) -> Result<(), EndpointError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(source) => {
            return Err(EndpointError::Remove {
                path: dir.to_path_buf(),
                source,
            });
        }
    };
    for dirent in entries.filter_map(|dirent| dirent.ok()) {
        let path = dirent.path();
        if path == keep || !path.is_file() {
            continue;
        }
        let superseded = dirent
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with("index-") && name.ends_with(".json"));
        if superseded {
            fs::remove_file(&path).map_err(|source| EndpointError::Remove {
                path: path.clone(),
                source,
            })?;
        }
    }
    Ok(())
}

/// Remove a directory tree; absent is fine.
fn remove_tree(path: &Path) -> Result<(), EndpointError> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(EndpointError::Remove {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Replace `dest` with a fresh recursive copy of `src`.
fn replace_dir(src: &Path, dest: &Path) -> Result<(), EndpointError> {
    remove_tree(dest)?;
    for walked in WalkDir::new(src) {
        let walked = walked.map_err(|err| EndpointError::Write {
            path: src.to_path_buf(),
            source: err.into(),
        })?;
        let relative = walked
            .path()
            .strip_prefix(src)
            .unwrap_or_else(|_| Path::new(""));
        let target = dest.join(relative);
        let result = if walked.file_type().is_dir() {
            fs::create_dir_all(&target)
        } else {
            fs::copy(walked.path(), &target).map(|_| ())
        };
        result.map_err(|source| EndpointError::Write {
            path: target.clone(),
            source,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::plan_type;
    use std::path::Path;
    use tempfile::TempDir;

    fn config(tmp: &TempDir) -> BuildConfig {
        BuildConfig::new(tmp.path().join("src"), tmp.path().join("dist"))
    }

    fn write_entry(src: &Path, type_name: &str, name: &str, date: u32, categories: &[&str]) {
        let dir = src.join(type_name).join(name);
        fs::create_dir_all(&dir).unwrap();
        let list = categories
            .iter()
            .map(|c| format!("\"{c}\""))
            .collect::<Vec<_>>()
            .join(", ");
        fs::write(
            dir.join("index.toml"),
            format!("title = \"title\"\ndate = {date}\ncategories = [{list}]\n"),
        )
        .unwrap();
        fs::write(dir.join("content.md"), "# Content").unwrap();
        fs::write(dir.join("excerpt.md"), "*Excerpt*").unwrap();
    }

    fn build(config: &BuildConfig) -> CommitStats {
        let update = plan_type("posts", config).unwrap();
        commit(&update, config).unwrap()
    }

    // =========================================================================
    // First build
    // =========================================================================

    #[test]
    fn first_build_writes_the_whole_tree() {
        let tmp = TempDir::new().unwrap();
        let config = config(&tmp);
        write_entry(&config.src, "posts", "hello", 20000101, &["essays"]);

        let stats = build(&config);
        assert_eq!(stats.documents_written, 1);
        assert_eq!(stats.pages_written, 2);

        let dist = &config.dist;
        assert!(dist.join("posts/hello/index.json").is_file());
        assert!(dist.join("categories/posts/all/1/index.json").is_file());
        assert!(dist.join("categories/posts/essays/1/index.json").is_file());
        assert!(dist.join("categories/posts/index.json").is_file());
        assert!(dist.join("categories/posts/cache.json").is_file());
        assert!(!dist.join("categories/posts/manifest.json").exists());
    }

    #[test]
    fn listing_maps_slugs_to_display_names() {
        let tmp = TempDir::new().unwrap();
        let config = config(&tmp);
        write_entry(&config.src, "posts", "hello", 20000101, &["essays"]);
        build(&config);

        let raw =
            fs::read_to_string(config.dist.join("categories/posts/index.json")).unwrap();
        let listing: BTreeMap<String, String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(listing["all"], "All");
        assert_eq!(listing["essays"], "Essays");
    }

    #[test]
    fn static_dir_is_copied_recursively() {
        let tmp = TempDir::new().unwrap();
        let config = config(&tmp);
        write_entry(&config.src, "posts", "hello", 20000101, &["essays"]);
        let assets = config.src.join("posts/hello/static/nested");
        fs::create_dir_all(&assets).unwrap();
        fs::write(assets.join("photo.jpg"), "jpeg").unwrap();

        let stats = build(&config);
        assert_eq!(stats.static_dirs_copied, 1);
        assert!(
            config
                .dist
                .join("static/posts/hello/nested/photo.jpg")
                .is_file()
        );
    }

    // =========================================================================
    // Removal
    // =========================================================================

    #[test]
    fn removed_entry_outputs_are_deleted() {
        let tmp = TempDir::new().unwrap();
        let config = config(&tmp);
        write_entry(&config.src, "posts", "hello", 20000101, &["essays"]);
        write_entry(&config.src, "posts", "world", 20000102, &["notes"]);
        build(&config);

        fs::remove_dir_all(config.src.join("posts/world")).unwrap();
        let stats = build(&config);

        assert_eq!(stats.documents_removed, 1);
        assert!(!config.dist.join("posts/world").exists());
        // Sole member of its category bucket: the bucket goes away too.
        assert!(!config.dist.join("categories/posts/notes").exists());
        assert!(config.dist.join("posts/hello/index.json").is_file());
    }

    #[test]
    fn listing_drops_removed_categories() {
        let tmp = TempDir::new().unwrap();
        let config = config(&tmp);
        write_entry(&config.src, "posts", "hello", 20000101, &["essays"]);
        write_entry(&config.src, "posts", "world", 20000102, &["notes"]);
        build(&config);

        fs::remove_dir_all(config.src.join("posts/world")).unwrap();
        build(&config);

        let raw =
            fs::read_to_string(config.dist.join("categories/posts/index.json")).unwrap();
        let listing: BTreeMap<String, String> = serde_json::from_str(&raw).unwrap();
        assert!(listing.contains_key("essays"));
        assert!(!listing.contains_key("notes"));
    }

    // =========================================================================
    // Hashed filenames
    // =========================================================================

    #[test]
    fn hashed_build_writes_hashed_names_and_manifest() {
        let tmp = TempDir::new().unwrap();
        let mut config = config(&tmp);
        config.hash = true;
        write_entry(&config.src, "posts", "hello", 20000101, &["essays"]);

        let update = plan_type("posts", &config).unwrap();
        commit(&update, &config).unwrap();

        let manifest = update.manifest.unwrap();
        let doc_hash = &manifest.entities["hello"];
        assert!(
            config
                .dist
                .join(format!("posts/hello/index-{doc_hash}.json"))
                .is_file()
        );
        let page_hash = &manifest.indexes["all"][&1];
        assert!(
            config
                .dist
                .join(format!("categories/posts/all/1/index-{page_hash}.json"))
                .is_file()
        );
        assert!(
            config
                .dist
                .join(format!("categories/posts/index-{}.json", manifest.categories))
                .is_file()
        );
        assert!(config.dist.join("categories/posts/manifest.json").is_file());
    }

    #[test]
    fn superseded_hashed_documents_are_replaced() {
        let tmp = TempDir::new().unwrap();
        let mut config = config(&tmp);
        config.hash = true;
        write_entry(&config.src, "posts", "hello", 20000101, &["essays"]);
        build(&config);

        fs::write(config.src.join("posts/hello/content.md"), "# Changed").unwrap();
        build(&config);

        let docs: Vec<_> = fs::read_dir(config.dist.join("posts/hello"))
            .unwrap()
            .filter_map(|dirent| dirent.ok())
            .collect();
        assert_eq!(docs.len(), 1);
    }

    #[test]
    fn sub_version_keeps_superseded_documents() {
        let tmp = TempDir::new().unwrap();
        let mut config = config(&tmp);
        config.hash = true;
        config.sub_version = true;
        write_entry(&config.src, "posts", "hello", 20000101, &["essays"]);
        build(&config);

        fs::write(config.src.join("posts/hello/content.md"), "# Changed").unwrap();
        build(&config);

        let docs: Vec<_> = fs::read_dir(config.dist.join("posts/hello"))
            .unwrap()
            .filter_map(|dirent| dirent.ok())
            .collect();
        assert_eq!(docs.len(), 2);
    }

    // =========================================================================
    // Cache handling
    // =========================================================================

    #[test]
    fn cache_has_no_temp_sibling_after_commit() {
        let tmp = TempDir::new().unwrap();
        let config = config(&tmp);
        write_entry(&config.src, "posts", "hello", 20000101, &["essays"]);
        build(&config);

        let dir = config.dist.join("categories/posts");
        assert!(dir.join("cache.json").is_file());
        assert!(!dir.join("cache.json.tmp").exists());
    }

    #[test]
    fn cache_roundtrips_into_the_next_plan() {
        let tmp = TempDir::new().unwrap();
        let config = config(&tmp);
        write_entry(&config.src, "posts", "hello", 20000101, &["essays"]);
        build(&config);

        write_entry(&config.src, "posts", "world", 20000102, &["essays"]);
        let update = plan_type("posts", &config).unwrap();
        assert_eq!(update.entries.add.len(), 1);
        assert_eq!(update.indexes.cache["all"][&1].entities.len(), 2);
    }
}
