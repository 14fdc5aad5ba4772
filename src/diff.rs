//! Incremental index re-pagination — the core of the build.
//!
//! Re-paginating every bucket on every run is correct but forces a full
//! rewrite and full cache invalidation for the smallest change. Instead,
//! each cached bucket is diffed independently against the entities being
//! written and removed this run:
//!
//! 1. Flatten the bucket's cached pages into one ordered entity list.
//! 2. Locate the earliest position affected by a removal and the earliest
//!    affected by a write.
//! 3. Neither exists: the bucket is untouched — copy it into the new cache.
//! 4. Otherwise slice the list from the first affected page; pages before
//!    it are kept verbatim.
//! 5. Drop removed entities from the slice (source removed, or category
//!    membership dropped from a multi-category entity).
//! 6. Merge in the written entities, replacing prior occurrences by name.
//! 7. Re-sort by date (stable) and re-paginate from the affected page.
//! 8. A merge that empties the bucket deletes it; otherwise diff the new
//!    pages against the cached ones so coincidentally identical pages are
//!    not rewritten, and record cached page numbers that no longer exist.
//!
//! The result must exactly equal a from-scratch re-pagination of each
//! bucket's final entity set — the incremental path is an optimization of
//! that computation, not an approximation. Each bucket is reduced by a pure
//! function returning fresh values; nothing mutates the previous cache.

use crate::categorize::{ALL, has_category};
use crate::paginate::paginate;
use crate::types::{EntityIndex, Indexes, Pages};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// The index portion of an update: the full next cache, the subset of pages
/// to write, and the index directories/pages to remove.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexesUpdate {
    pub cache: Indexes,
    pub write: Indexes,
    pub remove: Vec<PathBuf>,
}

/// Entities to write this run, bucketed by category slug (sorted by date).
pub type WriteSet = BTreeMap<String, Vec<EntityIndex>>;

/// Diff the cached indexes against this run's written/removed entities.
///
/// `cache` is the previous run's paginated state (empty on first run or
/// forced rebuild — then every write bucket is paginated from scratch and
/// becomes both cache and write). `removed` lists the names of entries
/// whose source was removed. `dist_indexes` roots the removal paths.
pub fn diff_indexes(
    cache: &Indexes,
    write: &WriteSet,
    removed: &[String],
    dist_indexes: &Path,
    limit: u32,
    hash: bool,
) -> IndexesUpdate {
    let mut update = IndexesUpdate::default();

    for (bucket, pages) in cache {
        match diff_bucket(bucket, pages, write, removed, limit, hash) {
            BucketOutcome::Untouched => {
                update.cache.insert(bucket.clone(), pages.clone());
            }
            BucketOutcome::Deleted => {
                update.remove.push(dist_indexes.join(bucket));
            }
            BucketOutcome::Repaginated {
                cache: next_pages,
                write: write_pages,
                stale,
            } => {
                update
                    .remove
                    .extend(stale.iter().map(|page| {
                        dist_indexes.join(bucket).join(page.to_string())
                    }));
                if !write_pages.is_empty() {
                    update.write.insert(bucket.clone(), write_pages);
                }
                update.cache.insert(bucket.clone(), next_pages);
            }
        }
    }

    // Buckets introduced this run (and every bucket on a cold cache) are
    // paginated from scratch.
    for (bucket, entities) in write {
        if update.cache.contains_key(bucket) || cache.contains_key(bucket) {
            continue;
        }
        let pages = paginate(entities, limit, 1, hash);
        update.cache.insert(bucket.clone(), pages.clone());
        update.write.insert(bucket.clone(), pages);
    }

    update
}

enum BucketOutcome {
    /// Nothing in this run touches the bucket.
    Untouched,
    /// The merge left zero entities: the bucket's index directory goes away.
    Deleted,
    Repaginated {
        cache: Pages,
        write: Pages,
        /// Cached page numbers that no longer exist after re-pagination.
        stale: Vec<u32>,
    },
}

/// Reduce one cached bucket against the run's write/remove sets.
fn diff_bucket(
    bucket: &str,
    pages: &Pages,
    write: &WriteSet,
    removed: &[String],
    limit: u32,
    hash: bool,
) -> BucketOutcome {
    let entities: Vec<EntityIndex> = pages
        .values()
        .flat_map(|page| page.entities.iter().cloned())
        .collect();

    // An entity leaves this bucket when its source entry was removed, or —
    // for category buckets — when its rewritten version no longer carries
    // the category (it then shows up in the `all` write set without it).
    let leaves_bucket = |entity: &EntityIndex| {
        removed.contains(&entity.name)
            || (bucket != ALL
                && write.get(ALL).is_some_and(|all| {
                    all.iter().any(|next| {
                        next.name == entity.name && !has_category(next, bucket)
                    })
                }))
    };

    let writes = write.get(bucket).map(Vec::as_slice).unwrap_or(&[]);
    let written = |entity: &EntityIndex| writes.iter().any(|w| w.name == entity.name);

    let first_removed = entities.iter().position(|entity| leaves_bucket(entity));
    let first_written = writes.first().map(|oldest| {
        // Changes begin at the oldest written date's insertion point, or at
        // a written entity's prior occurrence, whichever comes first.
        let by_date = entities.partition_point(|entity| entity.date < oldest.date);
        match entities.iter().position(|entity| written(entity)) {
            Some(by_name) => by_name.min(by_date),
            None => by_date,
        }
    });

    let first_affected = match (first_removed, first_written) {
        (Some(removed), Some(written)) => removed.min(written),
        (Some(removed), None) => removed,
        (None, Some(written)) => written,
        (None, None) => return BucketOutcome::Untouched,
    };

    // The page to re-paginate from. A boundary index re-paginates the page
    // before it as well, so that page's `next` link stays correct when the
    // bucket grows past it.
    let mut first_page = (first_affected.div_ceil(limit as usize)).max(1) as u32;

    loop {
        let start = ((first_page - 1) as usize * limit as usize).min(entities.len());
        let mut merged: Vec<EntityIndex> = entities[start..]
            .iter()
            .filter(|&entity| !leaves_bucket(entity) && !written(entity))
            .cloned()
            .collect();
        merged.extend(writes.iter().cloned());

        if merged.is_empty() {
            if first_page > 1 {
                // The tail vanished entirely; back up one page so the new
                // last page gets a correct empty `next` link.
                first_page -= 1;
                continue;
            }
            return BucketOutcome::Deleted;
        }

        merged.sort_by_key(|entity| entity.date);
        let next_pages = paginate(&merged, limit, first_page, hash);

        let mut cache: Pages = pages
            .range(..first_page)
            .map(|(number, page)| (*number, page.clone()))
            .collect();
        cache.extend(next_pages.clone());

        let stale: Vec<u32> = pages
            .keys()
            .filter(|&number| !cache.contains_key(number))
            .copied()
            .collect();

        // Keep only pages that actually changed: new number, different
        // content, or containing an entity rewritten this run.
        let write_pages: Pages = next_pages
            .into_iter()
            .filter(|(number, page)| match pages.get(number) {
                None => true,
                Some(old) => old != page || page.entities.iter().any(|e| written(e)),
            })
            .collect();

        return BucketOutcome::Repaginated {
            cache,
            write: write_pages,
            stale,
        };
    }
}
