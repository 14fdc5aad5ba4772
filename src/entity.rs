//! Entity assembly: metadata parsing and markdown rendering.
//!
//! Turns one [`Entry`] into a fully rendered [`Entity`]: `index.toml` is
//! parsed for the structured fields, `content.md` and `excerpt.md` are
//! rendered to HTML with [pulldown-cmark](https://docs.rs/pulldown-cmark).
//! Image references into the entry's `static/` directory are rewritten to
//! the published static URL (`/static/<type>/<name>/…`) during rendering.
//!
//! ## Metadata format
//!
//! ```toml
//! title = "Hello world"
//! date = 20000101          # YYYYMMDD
//! categories = ["essays"]  # At least one
//! slug = "hello-world"     # Optional, defaults to the entry name
//! draft = false            # Optional
//! ```

use crate::entry::{Entry, STATIC_DIR};
use crate::types::{Entity, short_hash};
use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, html};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EntityError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Missing required file '{file}' for entry '{name}'")]
    MissingRequiredFile { name: String, file: PathBuf },
    #[error("Invalid metadata for entry '{name}': {reason}")]
    InvalidMetadata { name: String, reason: String },
}

/// The structured fields of `index.toml`.
///
/// Shared with the authoring commands, which scaffold and rewrite the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct EntryMeta {
    pub(crate) title: String,
    pub(crate) date: u32,
    pub(crate) categories: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) slug: Option<String>,
    #[serde(default)]
    pub(crate) draft: bool,
}

/// Read and render one entry into an [`Entity`].
///
/// The returned entity has no hash; [`with_hash`] adds one when hashed
/// filenames are enabled.
pub fn load_entity(entry: &Entry) -> Result<Entity, EntityError> {
    let meta = load_meta(entry)?;
    let content = read_required(entry, &entry.src_content)?;
    let excerpt = read_required(entry, &entry.src_excerpt)?;
    Ok(Entity {
        name: entry.name.clone(),
        slug: meta.slug.unwrap_or_else(|| entry.name.clone()),
        title: meta.title,
        date: meta.date,
        categories: meta.categories,
        excerpt: render_markdown(&excerpt, &entry.urls_path),
        content: render_markdown(&content, &entry.urls_path),
        draft: meta.draft,
        hash: None,
    })
}

/// Stamp an entity with its content hash.
///
/// The hash digests the serialized entity (hash field unset), so it covers
/// every published field including the rendered HTML.
pub fn with_hash(mut entity: Entity) -> Entity {
    let serialized = serde_json::to_vec(&entity).unwrap_or_default();
    entity.hash = Some(short_hash(&serialized));
    entity
}

/// Resolve the output document path for an entity.
///
/// `index.json`, or `index-<hash>.json` when the entity carries a hash.
pub fn doc_path(entry: &Entry, entity: &Entity) -> PathBuf {
    match &entity.hash {
        Some(hash) => entry.dist.join(format!("index-{hash}.json")),
        None => entry.dist_doc.clone(),
    }
}

fn load_meta(entry: &Entry) -> Result<EntryMeta, EntityError> {
    let raw = read_required(entry, &entry.src_meta)?;
    let meta: EntryMeta =
        toml::from_str(&raw).map_err(|err| EntityError::InvalidMetadata {
            name: entry.name.clone(),
            reason: err.message().to_string(),
        })?;
    if meta.categories.is_empty() {
        return Err(EntityError::InvalidMetadata {
            name: entry.name.clone(),
            reason: "at least one category is required".into(),
        });
    }
    Ok(meta)
}

fn read_required(entry: &Entry, path: &std::path::Path) -> Result<String, EntityError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            Err(EntityError::MissingRequiredFile {
                name: entry.name.clone(),
                file: path.to_path_buf(),
            })
        }
        Err(err) => Err(err.into()),
    }
}

/// Render markdown to HTML.
///
/// Image destinations that point into the entry's `static/` directory are
/// rewritten to the published static URL; outbound and absolute references
/// pass through untouched.
pub fn render_markdown(markdown: &str, urls_path: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);

    let events = Parser::new_ext(markdown, options)
        .map(|event| rewrite_event(event, urls_path));
    let mut out = String::new();
    html::push_html(&mut out, events);
    out
}

fn rewrite_event<'a>(event: Event<'a>, urls_path: &str) -> Event<'a> {
    match event {
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Image {
            link_type,
            dest_url: rewrite_static_url(dest_url, urls_path),
            title,
            id,
        }),
        other => other,
    }
}

/// Rewrite `static/<file>` destinations to `<urls_path>/<file>`.
fn rewrite_static_url<'a>(dest: CowStr<'a>, urls_path: &str) -> CowStr<'a> {
    match dest.strip_prefix(STATIC_DIR) {
        Some(rest) if rest.starts_with('/') => {
            CowStr::Boxed(format!("{urls_path}{rest}").into_boxed_str())
        }
        _ => dest,
    }
}
