//! Update planning: the read-only half of a build.
//!
//! For one content type, the planner turns the current source tree and the
//! previously published state into a single declarative [`Update`] naming
//! every filesystem effect to perform. It reads sources, timestamps, and
//! `cache.json`, but writes nothing — the committing half lives in
//! [`endpoints`](crate::endpoints). The split keeps the whole diffing
//! pipeline testable without mocking writes.
//!
//! Per type, the pipeline is:
//!
//! 1. Diff the source and output entry listings into add/remove/update sets.
//! 2. Classify surviving entries by modification time (skipped with
//!    `force`); unchanged entries drop out here and are never re-read.
//! 3. Render entities for entries whose document or index projection is
//!    stale — in parallel across entries, they are read-only until commit.
//! 4. Feed the index projections through categorize/diff to compute the
//!    minimal index page writes and removals.
//! 5. Derive the hash manifest when hashed filenames are enabled.
//!
//! A failure in any step aborts this content type only; other types build
//! independently.

use crate::categorize::categorize;
use crate::config::BuildConfig;
use crate::diff::{IndexesUpdate, WriteSet, diff_indexes};
use crate::entity::{EntityError, load_entity, with_hash};
use crate::entry::{
    self, ChangeFlags, Entry, EntryError, classify, dist_times, source_times,
};
use crate::manifest::build_manifest;
use crate::types::{Entity, Indexes, Manifest};
use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Name of the per-type index cache file within the indexes directory.
pub const CACHE_FILE: &str = "cache.json";

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("There was no sources found in '{0}'")]
    NoSources(PathBuf),
    #[error("There was an error while reading sources directory '{path}': {source}")]
    SourcesDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("There was no '{type_name}' source directory")]
    MissingSourceDirectory { type_name: String },
    #[error("There was an error while reading '{type_name}' entries: {source}")]
    ReadingEntries {
        type_name: String,
        #[source]
        source: io::Error,
    },
    #[error("There was an error while getting updated '{type_name}': {source}")]
    ReadingUpdatedEntries {
        type_name: String,
        #[source]
        source: EntryError,
    },
    #[error("There was an error while getting '{type_name}' entities: {source}")]
    GettingEntities {
        type_name: String,
        #[source]
        source: EntityError,
    },
    #[error("There was no '{type_name}' to build")]
    NothingToBuild { type_name: String },
}

/// One entry scheduled for (re)publication.
///
/// `entity` is `None` only for static-dir-only updates, which never touch
/// the entity document or the indexes.
#[derive(Debug, Clone)]
pub struct EntityUpdate {
    pub entry: Entry,
    pub flags: ChangeFlags,
    pub entity: Option<Entity>,
}

/// The entry portion of an update.
#[derive(Debug, Clone, Default)]
pub struct EntriesUpdate {
    pub add: Vec<EntityUpdate>,
    pub remove: Vec<Entry>,
    pub update: Vec<EntityUpdate>,
}

impl EntriesUpdate {
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty() && self.update.is_empty()
    }
}

/// The complete declarative output of planning one content type.
///
/// Created fresh each run and consumed exactly once by the execution layer.
#[derive(Debug, Clone)]
pub struct Update {
    pub type_name: String,
    pub entries: EntriesUpdate,
    pub indexes: IndexesUpdate,
    pub manifest: Option<Manifest>,
}

/// List the content types: the child directories of the source root.
pub fn list_types(config: &BuildConfig) -> Result<Vec<String>, PlanError> {
    let types = entry::list_entry_names(&config.src).map_err(|source| PlanError::SourcesDir {
        path: config.src.clone(),
        source,
    })?;
    if types.is_empty() {
        return Err(PlanError::NoSources(config.src.clone()));
    }
    Ok(types)
}

/// Plan the update for one content type.
pub fn plan_type(type_name: &str, config: &BuildConfig) -> Result<Update, PlanError> {
    let entries = plan_entries(type_name, config)?;
    if entries.is_empty() {
        return Err(PlanError::NothingToBuild {
            type_name: type_name.to_string(),
        });
    }

    let write = indexes_to_write(&entries, config);
    let removed: Vec<String> = entries
        .remove
        .iter()
        .map(|entry| entry.name.clone())
        .collect();
    let cache = load_cache(type_name, config);
    let indexes = diff_indexes(
        &cache,
        &write,
        &removed,
        &config.dist_indexes(type_name),
        config.entities_per_page,
        config.hash,
    );

    let manifest = config.hash.then(|| build_manifest(&indexes.cache));

    Ok(Update {
        type_name: type_name.to_string(),
        entries,
        indexes,
        manifest,
    })
}

/// Diff listings, classify, and render the entries of one content type.
fn plan_entries(type_name: &str, config: &BuildConfig) -> Result<EntriesUpdate, PlanError> {
    let src_names = match entry::list_entry_names(&config.src_type(type_name)) {
        Ok(names) => names,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(PlanError::MissingSourceDirectory {
                type_name: type_name.to_string(),
            });
        }
        Err(source) => {
            return Err(PlanError::ReadingEntries {
                type_name: type_name.to_string(),
                source,
            });
        }
    };
    // An unpublished type has no output directory yet: empty listing.
    let dist_names = match entry::list_entry_names(&config.dist_type(type_name)) {
        Ok(names) => names,
        Err(err) if err.kind() == io::ErrorKind::NotFound => Vec::new(),
        Err(source) => {
            return Err(PlanError::ReadingEntries {
                type_name: type_name.to_string(),
                source,
            });
        }
    };
    let sets = entry::split_entries(&src_names, &dist_names);

    let add = sets
        .add
        .par_iter()
        .map(|name| {
            let entry = Entry::new(name, type_name, config);
            load_update(entry, ChangeFlags::all(), type_name, config)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let remove: Vec<Entry> = sets
        .remove
        .iter()
        .map(|name| Entry::new(name, type_name, config))
        .collect();

    let update = sets
        .old
        .par_iter()
        .map(|name| {
            let entry = Entry::new(name, type_name, config);
            let mut flags = if config.force {
                ChangeFlags::all()
            } else {
                classify_entry(&entry, type_name, config)?
            };
            // The index projection carries the entity hash, so a document
            // change moves the indexes too when hashing is on.
            if config.hash && flags.entity {
                flags.index = true;
            }
            if !flags.any() {
                return Ok(None);
            }
            load_update(entry, flags, type_name, config).map(Some)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(EntriesUpdate {
        add: add.into_iter().flatten().collect(),
        remove,
        update: update.into_iter().flatten().flatten().collect(),
    })
}

fn classify_entry(
    entry: &Entry,
    type_name: &str,
    config: &BuildConfig,
) -> Result<ChangeFlags, PlanError> {
    let src = source_times(entry).map_err(|source| PlanError::ReadingUpdatedEntries {
        type_name: type_name.to_string(),
        source,
    })?;
    let dist = dist_times(entry, config.hash);
    Ok(classify(&src, &dist))
}

/// Render the entity for an entry whose document or index is stale.
///
/// Returns `None` for drafts — they are excluded from publication entirely.
/// Static-dir-only updates keep `entity` unset.
fn load_update(
    entry: Entry,
    flags: ChangeFlags,
    type_name: &str,
    config: &BuildConfig,
) -> Result<Option<EntityUpdate>, PlanError> {
    if !(flags.entity || flags.index) {
        return Ok(Some(EntityUpdate {
            entry,
            flags,
            entity: None,
        }));
    }
    let entity = load_entity(&entry).map_err(|source| PlanError::GettingEntities {
        type_name: type_name.to_string(),
        source,
    })?;
    if entity.draft {
        return Ok(None);
    }
    let entity = if config.hash {
        with_hash(entity)
    } else {
        entity
    };
    Ok(Some(EntityUpdate {
        entry,
        flags,
        entity: Some(entity),
    }))
}

/// Project the flat, sorted, categorized index write set from the entries.
///
/// Removed entries are excluded; added/updated entries contribute when
/// their index projection is stale (all of them under `force`).
fn indexes_to_write(entries: &EntriesUpdate, config: &BuildConfig) -> WriteSet {
    let mut indexes: Vec<_> = entries
        .add
        .iter()
        .chain(&entries.update)
        .filter(|update| config.force || update.flags.index)
        .filter_map(|update| update.entity.as_ref())
        .map(|entity| entity.index())
        .collect();
    indexes.sort_by_key(|index| index.date);
    categorize(&indexes)
}

/// Load the previous index cache, or start empty.
///
/// `force` bypasses the cache (full rebuild); a missing or unreadable cache
/// reads as empty, which also forces full re-pagination of written buckets.
fn load_cache(type_name: &str, config: &BuildConfig) -> Indexes {
    if config.force {
        return Indexes::new();
    }
    let path = config.dist_indexes(type_name).join(CACHE_FILE);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(_) => return Indexes::new(),
    };
    serde_json::from_str(&content).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
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

    // =========================================================================
    // Type listing
    // =========================================================================

    #[test]
    fn empty_source_root_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let config = config(&tmp);
        fs::create_dir_all(&config.src).unwrap();
        assert!(matches!(list_types(&config), Err(PlanError::NoSources(_))));
    }

    #[test]
    fn types_are_the_source_root_directories() {
        let tmp = TempDir::new().unwrap();
        let config = config(&tmp);
        fs::create_dir_all(config.src.join("posts")).unwrap();
        fs::create_dir_all(config.src.join("notes")).unwrap();
        assert_eq!(
            list_types(&config).unwrap(),
            vec!["notes".to_string(), "posts".to_string()]
        );
    }

    // =========================================================================
    // First build
    // =========================================================================

    #[test]
    fn first_build_adds_everything_and_paginates_from_scratch() {
        let tmp = TempDir::new().unwrap();
        let config = config(&tmp);
        write_entry(&config.src, "posts", "hello", 20000101, &["test"]);
        write_entry(&config.src, "posts", "world", 20000102, &["test"]);

        let update = plan_type("posts", &config).unwrap();
        assert_eq!(update.entries.add.len(), 2);
        assert!(update.entries.remove.is_empty());
        assert!(update.entries.update.is_empty());

        // Cold cache: write and cache views coincide.
        assert_eq!(update.indexes.write, update.indexes.cache);
        assert_eq!(update.indexes.cache["all"][&1].entities.len(), 2);
        assert_eq!(update.indexes.cache["test"][&1].entities.len(), 2);
        assert!(update.manifest.is_none());
    }

    #[test]
    fn missing_type_directory_is_fatal_for_the_type() {
        let tmp = TempDir::new().unwrap();
        let config = config(&tmp);
        fs::create_dir_all(config.src.join("posts")).unwrap();

        assert!(matches!(
            plan_type("notes", &config),
            Err(PlanError::MissingSourceDirectory { .. })
        ));
    }

    #[test]
    fn entry_missing_required_file_fails_the_type() {
        let tmp = TempDir::new().unwrap();
        let config = config(&tmp);
        write_entry(&config.src, "posts", "hello", 20000101, &["test"]);
        fs::remove_file(config.src.join("posts/hello/excerpt.md")).unwrap();

        assert!(matches!(
            plan_type("posts", &config),
            Err(PlanError::GettingEntities { .. })
        ));
    }

    #[test]
    fn draft_only_add_is_nothing_to_build() {
        let tmp = TempDir::new().unwrap();
        let config = config(&tmp);
        write_entry(&config.src, "posts", "hello", 20000101, &["test"]);
        let meta = config.src.join("posts/hello/index.toml");
        let raw = fs::read_to_string(&meta).unwrap();
        fs::write(&meta, format!("{raw}draft = true\n")).unwrap();

        assert!(matches!(
            plan_type("posts", &config),
            Err(PlanError::NothingToBuild { .. })
        ));
    }

    // =========================================================================
    // Incremental runs
    // =========================================================================

    /// Publish the planned entity documents and cache, so that a following
    /// plan sees everything up to date.
    fn commit_minimal(update: &Update, config: &BuildConfig) {
        for planned in update.entries.add.iter().chain(&update.entries.update) {
            fs::create_dir_all(&planned.entry.dist).unwrap();
            fs::write(&planned.entry.dist_doc, "{}").unwrap();
        }
        let dir = config.dist_indexes(&update.type_name);
        fs::create_dir_all(&dir).unwrap();
        let json = serde_json::to_string(&update.indexes.cache).unwrap();
        fs::write(dir.join(CACHE_FILE), json).unwrap();
    }

    #[test]
    fn unchanged_rerun_is_nothing_to_build() {
        let tmp = TempDir::new().unwrap();
        let config = config(&tmp);
        write_entry(&config.src, "posts", "hello", 20000101, &["test"]);

        let update = plan_type("posts", &config).unwrap();
        commit_minimal(&update, &config);

        assert!(matches!(
            plan_type("posts", &config),
            Err(PlanError::NothingToBuild { .. })
        ));
    }

    #[test]
    fn removed_source_entry_is_scheduled_for_removal() {
        let tmp = TempDir::new().unwrap();
        let config = config(&tmp);
        write_entry(&config.src, "posts", "hello", 20000101, &["test"]);
        write_entry(&config.src, "posts", "world", 20000102, &["test"]);

        let update = plan_type("posts", &config).unwrap();
        commit_minimal(&update, &config);
        fs::remove_dir_all(config.src.join("posts/world")).unwrap();

        let update = plan_type("posts", &config).unwrap();
        assert!(update.entries.add.is_empty());
        assert_eq!(update.entries.remove.len(), 1);
        assert_eq!(update.entries.remove[0].name, "world");
        assert_eq!(update.indexes.cache["all"][&1].entities.len(), 1);
    }

    #[test]
    fn force_treats_every_entry_as_fully_updated() {
        let tmp = TempDir::new().unwrap();
        let mut config = config(&tmp);
        write_entry(&config.src, "posts", "hello", 20000101, &["test"]);

        let update = plan_type("posts", &config).unwrap();
        commit_minimal(&update, &config);

        config.force = true;
        let update = plan_type("posts", &config).unwrap();
        assert_eq!(update.entries.update.len(), 1);
        assert!(update.entries.update[0].flags.entity);
        // Forced runs ignore the cache and re-paginate from scratch.
        assert_eq!(update.indexes.write, update.indexes.cache);
    }

    #[test]
    fn hash_mode_stamps_entities_and_derives_a_manifest() {
        let tmp = TempDir::new().unwrap();
        let mut config = config(&tmp);
        config.hash = true;
        write_entry(&config.src, "posts", "hello", 20000101, &["test"]);

        let update = plan_type("posts", &config).unwrap();
        let entity = update.entries.add[0].entity.as_ref().unwrap();
        assert!(entity.hash.is_some());

        let manifest = update.manifest.unwrap();
        assert_eq!(manifest.entities["hello"], entity.hash.clone().unwrap());
        assert!(manifest.indexes["all"].contains_key(&1));
    }
}
