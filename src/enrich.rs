//! Back-fill of album release dates before a release-date sort.

use crate::api::{Credential, Provider, MAX_TRACK_LOOKUP};
use crate::error::Result;
use crate::models::{Album, PlaylistItem, Track};
use crate::sort::SortKey;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Distinct ids of tracks that lack a release date, in first-seen order.
/// Tracks without an id (local files) cannot be looked up and are skipped.
pub fn missing_release_dates(items: &[PlaylistItem]) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter(|i| !i.track.album.has_release_date() && !i.track.id.is_empty())
        .filter(|i| seen.insert(i.track.id.clone()))
        .map(|i| i.track.id.clone())
        .collect()
}

/// Overlay `fetched` onto `album`. Non-empty fetched fields win; anything the
/// lookup left blank keeps its original value.
pub fn merge_album(album: &mut Album, fetched: &Album) {
    if !fetched.name.is_empty() {
        album.name = fetched.name.clone();
    }
    if fetched.has_release_date() {
        album.release_date = fetched.release_date.clone();
    }
    if fetched.release_date_precision.is_some() {
        album.release_date_precision = fetched.release_date_precision.clone();
    }
}

/// Fill in release dates the sort key needs.
///
/// Does nothing unless `key` is a release-date sort and some item lacks a
/// date. Lookups go out in batches of at most `batch_size` ids (capped at the
/// remote ceiling), one after another. Every batch must succeed before any
/// item is touched, so a failure leaves `items` unchanged for the caller.
pub async fn enrich(
    provider: &dyn Provider,
    cred: &Credential,
    mut items: Vec<PlaylistItem>,
    key: &SortKey,
    batch_size: usize,
) -> Result<Vec<PlaylistItem>> {
    if !key.needs_release_date() {
        return Ok(items);
    }
    let missing = missing_release_dates(&items);
    if missing.is_empty() {
        debug!("all {} items already carry a release date", items.len());
        return Ok(items);
    }

    let batch_size = batch_size.clamp(1, MAX_TRACK_LOOKUP);
    let mut fetched: HashMap<String, Track> = HashMap::with_capacity(missing.len());
    for (n, batch) in missing.chunks(batch_size).enumerate() {
        let tracks = provider.get_tracks(cred, batch).await?;
        debug!("metadata batch {}: asked {}, got {}", n + 1, batch.len(), tracks.len());
        fetched.extend(tracks.into_iter().map(|t| (t.id.clone(), t)));
    }

    let mut filled = 0usize;
    for item in items.iter_mut().filter(|i| !i.track.album.has_release_date()) {
        if let Some(track) = fetched.get(&item.track.id) {
            merge_album(&mut item.track.album, &track.album);
            if item.track.album.has_release_date() {
                filled += 1;
            }
        }
    }
    info!(
        "enriched {} of {} items missing a release date via {} lookups",
        filled,
        missing.len(),
        (missing.len() + batch_size - 1) / batch_size
    );
    Ok(items)
}
