//! Entry authoring: scaffold, edit, and retire source entries.
//!
//! These operations touch the *source* tree only. Published endpoints are
//! never edited directly: the next `build` picks the change up through the
//! regular listing diff and classification, so the indexes and cache always
//! move together with the documents.
//!
//! New entries are scaffolded as drafts. Flip `draft` off (with `set`, or by
//! editing `index.toml`) once the entry is ready to publish.

use crate::config::BuildConfig;
use crate::entity::EntryMeta;
use crate::entry::Entry;
use std::fs;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthorError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Entry '{0}' already exists")]
    AlreadyExists(String),
    #[error("No entry named '{0}'")]
    NotFound(String),
    #[error("Invalid metadata for entry '{name}': {reason}")]
    InvalidMetadata { name: String, reason: String },
}

/// The fields of an entry to scaffold.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub title: String,
    /// Publication date as integer `YYYYMMDD`.
    pub date: u32,
    pub categories: Vec<String>,
    /// Directory name and URL identity; defaults to the slugified title.
    pub slug: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
}

/// A partial edit of an existing entry. Unset fields are left alone.
#[derive(Debug, Clone, Default)]
pub struct EntryChanges {
    pub title: Option<String>,
    pub date: Option<u32>,
    pub categories: Option<Vec<String>>,
    pub slug: Option<String>,
    pub draft: Option<bool>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
}

/// Scaffold a new draft entry under `src/<type>/<slug>/`.
///
/// Creates the directory, `index.toml` (with `draft = true`), `content.md`,
/// `excerpt.md`, and an empty `static/` directory. Fails when an entry with
/// the same name already exists.
pub fn add_entry(
    spec: &NewEntry,
    type_name: &str,
    config: &BuildConfig,
) -> Result<Entry, AuthorError> {
    let name = match &spec.slug {
        Some(slug) => slug.clone(),
        None => slug::slugify(&spec.title),
    };
    let entry = Entry::new(&name, type_name, config);
    if entry.src.exists() {
        return Err(AuthorError::AlreadyExists(name));
    }

    let meta = EntryMeta {
        title: spec.title.clone(),
        date: spec.date,
        categories: spec.categories.clone(),
        slug: None,
        draft: true,
    };

    fs::create_dir_all(&entry.src)?;
    fs::create_dir_all(&entry.src_static)?;
    write_meta(&entry, &meta)?;
    let content = match &spec.content {
        Some(content) => content.clone(),
        None => format!("# {}\n", spec.title),
    };
    fs::write(&entry.src_content, content)?;
    let excerpt = match &spec.excerpt {
        Some(excerpt) => excerpt.clone(),
        None => format!("{}\n", spec.title),
    };
    fs::write(&entry.src_excerpt, excerpt)?;

    Ok(entry)
}

/// Apply a partial edit to an existing entry's source files.
///
/// Metadata fields are merged into `index.toml`; `content`/`excerpt` replace
/// their files wholesale when given.
pub fn set_entry(
    name: &str,
    changes: &EntryChanges,
    type_name: &str,
    config: &BuildConfig,
) -> Result<Entry, AuthorError> {
    let entry = Entry::new(name, type_name, config);
    if !entry.src_meta.is_file() {
        return Err(AuthorError::NotFound(name.to_string()));
    }

    let raw = fs::read_to_string(&entry.src_meta)?;
    let mut meta: EntryMeta =
        toml::from_str(&raw).map_err(|err| AuthorError::InvalidMetadata {
            name: name.to_string(),
            reason: err.message().to_string(),
        })?;

    if let Some(title) = &changes.title {
        meta.title = title.clone();
    }
    if let Some(date) = changes.date {
        meta.date = date;
    }
    if let Some(categories) = &changes.categories {
        meta.categories = categories.clone();
    }
    if let Some(slug) = &changes.slug {
        meta.slug = Some(slug.clone());
    }
    if let Some(draft) = changes.draft {
        meta.draft = draft;
    }
    write_meta(&entry, &meta)?;

    if let Some(content) = &changes.content {
        fs::write(&entry.src_content, content)?;
    }
    if let Some(excerpt) = &changes.excerpt {
        fs::write(&entry.src_excerpt, excerpt)?;
    }

    Ok(entry)
}

/// Delete an entry's source directory.
///
/// Published outputs are left in place on purpose: the next `build` sees an
/// output entry without a source, removes its endpoints, and re-paginates
/// the indexes it appeared in.
pub fn remove_entry(
    name: &str,
    type_name: &str,
    config: &BuildConfig,
) -> Result<Entry, AuthorError> {
    let entry = Entry::new(name, type_name, config);
    if !entry.src.is_dir() {
        return Err(AuthorError::NotFound(name.to_string()));
    }
    fs::remove_dir_all(&entry.src)?;
    Ok(entry)
}

fn write_meta(entry: &Entry, meta: &EntryMeta) -> Result<(), AuthorError> {
    // EntryMeta always serializes cleanly; surface the message if not.
    let raw = toml::to_string(meta).map_err(|err| AuthorError::InvalidMetadata {
        name: entry.name.clone(),
        reason: err.to_string(),
    })?;
    fs::write(&entry.src_meta, raw)?;
    Ok(())
}
