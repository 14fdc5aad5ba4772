//! Shared types serialized as endpoint documents and cache state.
//!
//! These shapes are the wire format of everything the generator writes:
//! entity documents, index pages, `cache.json`, and `manifest.json`. The
//! `cache.json` produced by one run is deserialized unchanged by the next,
//! so every change here is a cache format change.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// A fully rendered content item — the body of one entity endpoint.
///
/// `date` uses the integer `YYYYMMDD` format; it is the sort key for every
/// index. `categories` holds the raw (unslugified) names from the entry
/// metadata. A `draft` entity is excluded from indexes and from publication
/// entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    pub slug: String,
    pub title: String,
    pub date: u32,
    pub categories: Vec<String>,
    /// Rendered excerpt HTML (from `excerpt.md`).
    pub excerpt: String,
    /// Rendered body HTML (from `content.md`).
    pub content: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub draft: bool,
    /// Short content hash, set only when hashed filenames are enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

fn is_false(value: &bool) -> bool {
    !value
}

impl Entity {
    /// Project the index view of this entity: every field except `content`.
    ///
    /// Indexes carry the excerpt, not the body, so index pages stay small.
    pub fn index(&self) -> EntityIndex {
        EntityIndex {
            name: self.name.clone(),
            slug: self.slug.clone(),
            title: self.title.clone(),
            date: self.date,
            categories: self.categories.clone(),
            excerpt: self.excerpt.clone(),
            draft: self.draft,
            hash: self.hash.clone(),
        }
    }
}

/// The projection of an [`Entity`] stored inside index pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityIndex {
    pub name: String,
    pub slug: String,
    pub title: String,
    pub date: u32,
    pub categories: Vec<String>,
    pub excerpt: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub draft: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

/// One paginated slice of a bucket's entity list.
///
/// `prev`/`next` are relative path fragments (`page/<n>/`) or the empty
/// string at the boundaries. `hash` is present only when hashed filenames
/// are enabled: it digests the member entity hashes in order, so it changes
/// with membership, order, or member content — and with nothing else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub entities: Vec<EntityIndex>,
    pub prev: String,
    pub next: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

/// Pages of one bucket, keyed by 1-based page number.
pub type Pages = BTreeMap<u32, Page>;

/// The complete paginated state: bucket slug → pages.
///
/// Bucket names are category slugs plus the synthetic `all` bucket. This is
/// simultaneously the persisted cache (`cache.json`) and, as a subset, the
/// per-run write view.
pub type Indexes = BTreeMap<String, Pages>;

/// Hash lookup table for content-addressed endpoint filenames.
///
/// Written as `manifest.json` when hashing is enabled; consumers use it to
/// resolve the current hashed filename of any endpoint without listing the
/// output directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Digest of the ordered bucket name set.
    pub categories: String,
    /// Entity name → entity content hash.
    pub entities: BTreeMap<String, String>,
    /// Bucket slug → page number → page hash.
    pub indexes: BTreeMap<String, BTreeMap<u32, String>>,
}

/// Length of the hex hash suffix used in content-addressed filenames.
const SHORT_HASH_LEN: usize = 8;

/// Short SHA-256 digest of arbitrary bytes, as lowercase hex.
///
/// Truncated to [`SHORT_HASH_LEN`] characters — these hashes name files and
/// bust caches, they are not integrity checks.
pub fn short_hash(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut hex = format!("{:x}", digest);
    hex.truncate(SHORT_HASH_LEN);
    hex
}
