//! Request-facing operations: list editable playlists, reorder one playlist.
//!
//! A reorder runs fetch -> enrich -> sort -> write-back as a strict sequence;
//! each stage needs the complete output of the one before it. Requests share
//! nothing but the provider handle, which holds no per-request state. Two
//! reorders of the same playlist are not serialized: the last write-back wins.

use crate::api::{Credential, Provider};
use crate::config::Limits;
use crate::enrich::enrich;
use crate::error::{ReorderError, Result};
use crate::models::{PlaylistItem, PlaylistSummary, ReorderOutcome, SortDirection};
use crate::pagination::collect_all;
use crate::sort::{sort_items, SortKey};
use crate::writeback::write_back;
use std::sync::Arc;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

#[derive(Clone)]
pub struct PlaylistService {
    provider: Arc<dyn Provider>,
    limits: Limits,
}

impl PlaylistService {
    pub fn new(provider: Arc<dyn Provider>, limits: Limits) -> Self {
        Self { provider, limits }
    }

    /// Playlists the caller may rewrite: owned by them, or collaborative.
    pub async fn editable_playlists(&self, token: &str) -> Result<Vec<PlaylistSummary>> {
        let cred = Credential::new(token)?;
        let span = info_span!("playlists", request = %Uuid::new_v4(), cred = %cred);
        async {
            let user_id = self.provider.current_user_id(&cred).await?;
            let all = collect_all(self.limits.playlist_page, |offset, limit| {
                self.provider.list_playlists(&cred, offset, limit)
            })
            .await?;
            let total = all.len();
            let editable: Vec<PlaylistSummary> = all
                .into_iter()
                .filter(|p| p.owner.id == user_id || p.collaborative)
                .collect();
            info!("Found {} editable of {} playlists for user {}", editable.len(), total, user_id);
            Ok::<_, ReorderError>(editable)
        }
        .instrument(span)
        .await
    }

    /// Every live entry of a playlist, in remote order.
    pub async fn playlist_items(&self, cred: &Credential, playlist_id: &str) -> Result<Vec<PlaylistItem>> {
        collect_all(self.limits.item_page, |offset, limit| {
            self.provider.list_playlist_items(cred, playlist_id, offset, limit)
        })
        .await
    }

    /// Sort a playlist by `sort_key` / `direction` and write the new order back.
    ///
    /// Inputs are validated before any remote call. An unrecognized sort key
    /// is not an error: the playlist is rewritten in its current order.
    pub async fn reorder_playlist(
        &self,
        token: &str,
        playlist_id: &str,
        sort_key: &str,
        direction: &str,
    ) -> Result<ReorderOutcome> {
        let request = ReorderRequest::parse(token, playlist_id, sort_key, direction)?;
        let span = info_span!(
            "reorder",
            request = %Uuid::new_v4(),
            playlist = %request.playlist_id,
            key = %request.key,
            direction = ?request.direction,
            cred = %request.cred,
        );
        self.run(request).instrument(span).await
    }

    /// Fetch, enrich and sort without writing anything back.
    pub async fn preview_order(
        &self,
        token: &str,
        playlist_id: &str,
        sort_key: &str,
        direction: &str,
    ) -> Result<Vec<PlaylistItem>> {
        let request = ReorderRequest::parse(token, playlist_id, sort_key, direction)?;
        let span = info_span!("preview", request = %Uuid::new_v4(), playlist = %request.playlist_id);
        self.sorted(&request).instrument(span).await
    }

    async fn sorted(&self, req: &ReorderRequest) -> Result<Vec<PlaylistItem>> {
        let items = self.playlist_items(&req.cred, &req.playlist_id).await?;
        if items.is_empty() {
            return Err(ReorderError::NotFoundOrEmpty(req.playlist_id.clone()));
        }
        let items = enrich(self.provider.as_ref(), &req.cred, items, &req.key, self.limits.metadata_batch).await?;
        Ok(sort_items(items, &req.key, req.direction))
    }

    async fn run(&self, req: ReorderRequest) -> Result<ReorderOutcome> {
        info!("Reordering playlist {} by {} ({:?})", req.playlist_id, req.key, req.direction);

        let sorted = self.sorted(&req).await?;
        let uris: Vec<String> = sorted.into_iter().map(|i| i.track.uri).collect();

        let version_token = write_back(
            self.provider.as_ref(),
            &req.cred,
            &req.playlist_id,
            &uris,
            self.limits.write_batch,
        )
        .await?;
        info!("Playlist {} reordered: {} items, snapshot {}", req.playlist_id, uris.len(), version_token);
        Ok(ReorderOutcome { version_token, item_count: uris.len() })
    }
}

/// A validated reorder request.
#[derive(Debug)]
struct ReorderRequest {
    cred: Credential,
    playlist_id: String,
    key: SortKey,
    direction: SortDirection,
}

impl ReorderRequest {
    fn parse(token: &str, playlist_id: &str, sort_key: &str, direction: &str) -> Result<Self> {
        let playlist_id = playlist_id.trim();
        if playlist_id.is_empty() {
            return Err(ReorderError::InvalidRequest("playlist id is required".into()));
        }
        if playlist_id.contains('/') || playlist_id.chars().any(char::is_whitespace) {
            return Err(ReorderError::InvalidRequest(format!("malformed playlist id {:?}", playlist_id)));
        }
        if sort_key.trim().is_empty() {
            return Err(ReorderError::InvalidRequest("sort criteria is required".into()));
        }
        if direction.trim().is_empty() {
            return Err(ReorderError::InvalidRequest("sort order is required".into()));
        }
        let direction: SortDirection = direction.parse().map_err(ReorderError::InvalidRequest)?;
        let key = match sort_key.parse::<SortKey>() {
            Ok(k) => k,
            Err(never) => match never {},
        };
        let cred = Credential::new(token)?;
        Ok(Self { cred, playlist_id: playlist_id.to_string(), key, direction })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_validation_happens_before_anything_else() {
        let bad = [
            ("tok", "", "name", "asc"),
            ("tok", "a/b", "name", "asc"),
            ("tok", "pl", "", "asc"),
            ("tok", "pl", "name", ""),
            ("tok", "pl", "name", "sideways"),
            ("", "pl", "name", "asc"),
        ];
        for (token, id, key, dir) in bad {
            let err = ReorderRequest::parse(token, id, key, dir).unwrap_err();
            assert!(matches!(err, ReorderError::InvalidRequest(_)), "{id:?} {key:?} {dir:?}");
        }
    }

    #[test]
    fn unknown_key_is_accepted() {
        let req = ReorderRequest::parse("tok", " pl ", "mood", "DESC").unwrap();
        assert_eq!(req.playlist_id, "pl");
        assert_eq!(req.key, SortKey::Unknown("mood".into()));
        assert_eq!(req.direction, SortDirection::Descending);
    }
}
