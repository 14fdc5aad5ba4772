//! Category bucketing.
//!
//! Groups a flat, pre-sorted entity-index list into named buckets: one per
//! category (keyed by the category's slug) plus the synthetic `all` bucket
//! holding every entity. Always sort, then categorize, then paginate each
//! bucket — bucket order is inherited from the input, which keeps bucketing
//! deterministic and stable.

use crate::types::EntityIndex;
use std::collections::BTreeMap;

/// Name of the synthetic bucket holding every non-draft entity.
pub const ALL: &str = "all";

/// Slugify a category name for use as a path segment.
pub fn category_slug(category: &str) -> String {
    slug::slugify(category)
}

/// True when `index` carries `category` (compared by slug).
pub fn has_category(index: &EntityIndex, category: &str) -> bool {
    index
        .categories
        .iter()
        .any(|name| category_slug(name) == category)
}

/// Group a pre-sorted entity-index list into buckets by category slug.
///
/// Empty input yields an empty map — no `all` bucket.
pub fn categorize(entities: &[EntityIndex]) -> BTreeMap<String, Vec<EntityIndex>> {
    let mut buckets: BTreeMap<String, Vec<EntityIndex>> = BTreeMap::new();
    if entities.is_empty() {
        return buckets;
    }
    buckets.insert(ALL.to_string(), entities.to_vec());
    for entity in entities {
        for category in &entity.categories {
            buckets
                .entry(category_slug(category))
                .or_default()
                .push(entity.clone());
        }
    }
    buckets
}
