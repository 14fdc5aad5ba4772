//! Pagination of bucket entity lists.
//!
//! Splits a sorted entity-index list into fixed-size pages numbered from an
//! offset. The offset is 1 for full pagination; the index differ passes the
//! first affected page number so untouched leading pages are never rebuilt.

use crate::types::{EntityIndex, Page, Pages, short_hash};

/// Paginate `entities` into pages of `limit`, numbered from `offset`.
///
/// `entities` must already hold the bucket's tail starting at page `offset`
/// (the caller slices off the kept pages). Page numbers run contiguously
/// from `offset` to the bucket's final page; `prev`/`next` are `page/<n>/`
/// fragments, empty at the boundaries.
///
/// With `hash`, each page's hash digests its member entity hashes in list
/// order, making it sensitive to membership and order but not to unchanged
/// content.
pub fn paginate(entities: &[EntityIndex], limit: u32, offset: u32, hash: bool) -> Pages {
    let mut pages = Pages::new();
    let limit_size = limit as usize;
    let pages_count = offset - 1 + entities.len().div_ceil(limit_size) as u32;

    for number in offset..=pages_count {
        let start = ((number - offset) as usize) * limit_size;
        let end = (start + limit_size).min(entities.len());
        let members = &entities[start..end];
        pages.insert(
            number,
            Page {
                entities: members.to_vec(),
                prev: if number > 1 {
                    format!("page/{}/", number - 1)
                } else {
                    String::new()
                },
                next: if number < pages_count {
                    format!("page/{}/", number + 1)
                } else {
                    String::new()
                },
                hash: hash.then(|| page_hash(members)),
            },
        );
    }

    pages
}

/// Digest of the member entity hashes, in list order.
fn page_hash(entities: &[EntityIndex]) -> String {
    let mut concatenated = String::new();
    for entity in entities {
        if let Some(hash) = &entity.hash {
            concatenated.push_str(hash);
        }
    }
    short_hash(concatenated.as_bytes())
}
