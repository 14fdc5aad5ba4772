//! Manifest derivation for content-addressed filenames.
//!
//! When hashed filenames are enabled, consumers cannot guess an endpoint's
//! current filename. The manifest, derived from the final (post-diff) cache,
//! is their lookup table: the categories digest names the categories listing
//! file, the entities map names each entity document, and the indexes map
//! names each page file.

use crate::categorize::ALL;
use crate::types::{Indexes, Manifest, short_hash};
use std::collections::BTreeMap;

/// Walk the final cache into a [`Manifest`].
///
/// The categories hash digests the ordered bucket name set, so it is stable
/// across runs while the same buckets exist and changes whenever a bucket
/// appears or disappears.
pub fn build_manifest(cache: &Indexes) -> Manifest {
    let mut names = String::new();
    for bucket in cache.keys() {
        names.push_str(bucket);
    }

    let entities: BTreeMap<String, String> = cache
        .get(ALL)
        .map(|pages| {
            pages
                .values()
                .flat_map(|page| &page.entities)
                .filter_map(|entity| {
                    entity.hash.clone().map(|hash| (entity.name.clone(), hash))
                })
                .collect()
        })
        .unwrap_or_default();

    let indexes: BTreeMap<String, BTreeMap<u32, String>> = cache
        .iter()
        .map(|(bucket, pages)| {
            let hashes = pages
                .iter()
                .filter_map(|(number, page)| {
                    page.hash.clone().map(|hash| (*number, hash))
                })
                .collect();
            (bucket.clone(), hashes)
        })
        .collect();

    Manifest {
        categories: short_hash(names.as_bytes()),
        entities,
        indexes,
    }
}
