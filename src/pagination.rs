//! Offset-paged "fetch everything" driver shared by playlist and item listings.

use crate::error::Result;
use crate::models::Page;
use std::future::Future;
use tracing::{debug, warn};

/// Fetch every page strictly in sequence and concatenate the live entries.
///
/// The next offset is the previous offset plus the number of entries the
/// page actually held (tombstones included), so a short page never causes
/// a skip. Tombstones are dropped from the result. The first error from
/// `fetch_page` is returned as-is.
pub async fn collect_all<T, F, Fut>(limit: u32, mut fetch_page: F) -> Result<Vec<T>>
where
    F: FnMut(u32, u32) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut collected = Vec::new();
    let mut offset: u32 = 0;
    let mut pages = 0usize;

    loop {
        let page = fetch_page(offset, limit).await?;
        pages += 1;
        let fetched = page.items.len();
        let before = collected.len();
        collected.extend(page.items.into_iter().flatten());
        debug!(
            "page {} at offset {}: {} entries, {} tombstones",
            pages,
            offset,
            fetched,
            fetched - (collected.len() - before)
        );

        if !page.has_more {
            break;
        }
        if fetched == 0 {
            // A remote claiming more data but returning nothing would loop forever.
            warn!("empty page at offset {} reported more data; stopping", offset);
            break;
        }
        offset += fetched as u32;
    }

    Ok(collected)
}
