//! Replays a sorted track list onto the remote playlist.

use crate::api::{Credential, Provider, MAX_WRITE_BATCH};
use crate::error::{ReorderError, Result};
use crate::models::VersionToken;
use tracing::{error, info};

/// Write `uris` to the playlist in exactly this order.
///
/// An empty list clears the playlist with one replace call and returns the
/// [`VersionToken::cleared`] sentinel. Otherwise the first batch replaces the
/// playlist contents and each following batch is appended, strictly one after
/// another. The token of the last batch is returned.
///
/// Nothing is retried or rolled back. If a batch after the first fails, the
/// playlist keeps the batches already written and the error is
/// [`ReorderError::PartialWriteFailure`] carrying how many items made it.
/// A failing first batch returns the provider's error unchanged.
pub async fn write_back(
    provider: &dyn Provider,
    cred: &Credential,
    playlist_id: &str,
    uris: &[String],
    batch_size: usize,
) -> Result<VersionToken> {
    if uris.is_empty() {
        provider.replace_playlist_items(cred, playlist_id, &[]).await?;
        info!("Playlist {} cleared", playlist_id);
        return Ok(VersionToken::cleared());
    }

    let batch_size = batch_size.clamp(1, MAX_WRITE_BATCH);
    let total = uris.len();
    let mut committed = 0usize;
    let mut token: Option<VersionToken> = None;

    for (n, batch) in uris.chunks(batch_size).enumerate() {
        let res = if n == 0 {
            provider.replace_playlist_items(cred, playlist_id, batch).await
        } else {
            provider.append_playlist_items(cred, playlist_id, batch).await
        };
        match res {
            Ok(t) => {
                committed += batch.len();
                info!(
                    "{} batch {} of playlist {} ({} items, {}/{}), snapshot: {}",
                    if n == 0 { "Replaced" } else { "Appended" },
                    n + 1,
                    playlist_id,
                    batch.len(),
                    committed,
                    total,
                    t
                );
                token = Some(t);
            }
            Err(e) if committed == 0 => return Err(e),
            Err(e) => {
                error!(
                    "write-back of playlist {} stopped at batch {}; {}/{} items committed: {}",
                    playlist_id,
                    n + 1,
                    committed,
                    total,
                    e
                );
                return Err(ReorderError::PartialWriteFailure { committed, total, source: Box::new(e) });
            }
        }
    }

    token.ok_or_else(|| ReorderError::Decode("write-back produced no version token".into()))
}
