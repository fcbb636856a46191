use super::{Credential, Provider, MAX_ITEM_PAGE, MAX_PLAYLIST_PAGE, MAX_TRACK_LOOKUP, MAX_WRITE_BATCH};
use crate::error::{ReorderError, Result};
use crate::models::{Page, PlaylistItem, PlaylistSummary, Track, VersionToken};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::env;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Default Web API root; `SPOTIFY_API_BASE` overrides it (useful for tests).
pub fn default_api_base() -> String {
    env::var("SPOTIFY_API_BASE").unwrap_or_else(|_| "https://api.spotify.com/v1".into())
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Paging<T> {
    #[serde(default)]
    items: Vec<Option<T>>,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistEntry {
    #[serde(default)]
    added_at: Option<String>,
    #[serde(default)]
    track: Option<Track>,
}

#[derive(Debug, Deserialize)]
struct SeveralTracks {
    #[serde(default)]
    tracks: Vec<Option<Track>>,
}

#[derive(Debug, Deserialize)]
struct Snapshot {
    snapshot_id: String,
}

/// Spotify provider backed by the Spotify Web API.
/// Holds no credential or user state; every call carries its own bearer token.
#[derive(Clone)]
pub struct SpotifyProvider {
    client: Client,
    api_base: String,
}

impl SpotifyProvider {
    pub fn new(api_base: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    /// `{api_base}/playlists/{id}/tracks`, with the id escaped as a single path segment.
    fn playlist_tracks_url(&self, playlist_id: &str) -> Result<String> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| ReorderError::InvalidRequest(format!("bad api base {}: {}", self.api_base, e)))?;
        url.path_segments_mut()
            .map_err(|_| ReorderError::InvalidRequest(format!("api base {} cannot take a path", self.api_base)))?
            .pop_if_empty()
            .extend(["playlists", playlist_id, "tracks"]);
        Ok(url.to_string())
    }

    async fn get_json<T: DeserializeOwned>(&self, cred: &Credential, url: &str, query: &[(&str, String)]) -> Result<T> {
        let resp = self
            .client
            .get(url)
            .header(AUTHORIZATION, cred.bearer())
            .header(ACCEPT, "application/json")
            .query(query)
            .send()
            .await?;
        decode(check_status(resp).await?).await
    }
}

/// Map a non-2xx response onto the error kinds callers distinguish.
async fn check_status(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let retry_after = resp
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok());
    let body = resp.text().await.unwrap_or_default();
    let message = remote_message(&body)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());

    if status == StatusCode::UNAUTHORIZED {
        return Err(ReorderError::Unauthorized(message));
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        warn!("rate limited by remote service, retry_after={:?}", retry_after);
    }
    Err(ReorderError::RemoteService {
        status: status.as_u16(),
        message,
        retry_after: if status == StatusCode::TOO_MANY_REQUESTS { retry_after } else { None },
    })
}

/// Pull the human-readable message out of an error body. Regular API errors
/// nest it under `error.message`; auth errors use `error_description`.
fn remote_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    let j: serde_json::Value = match serde_json::from_str(trimmed) {
        Ok(v) => v,
        Err(_) => return Some(trimmed.to_string()),
    };
    j["error"]["message"]
        .as_str()
        .or_else(|| j["error_description"].as_str())
        .or_else(|| j["error"].as_str())
        .or_else(|| j["message"].as_str())
        .map(|s| s.to_string())
        .or_else(|| Some(trimmed.to_string()))
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let text = resp.text().await?;
    serde_json::from_str(&text).map_err(|e| ReorderError::Decode(e.to_string()))
}

fn check_limit(what: &str, requested: usize, ceiling: usize) -> Result<()> {
    if requested > ceiling {
        return Err(ReorderError::InvalidRequest(format!(
            "{} accepts at most {} entries per request, got {}",
            what, ceiling, requested
        )));
    }
    Ok(())
}

#[async_trait]
impl Provider for SpotifyProvider {
    fn name(&self) -> &str {
        "spotify"
    }

    async fn current_user_id(&self, cred: &Credential) -> Result<String> {
        let j: serde_json::Value = self.get_json(cred, &self.url("/me"), &[]).await?;
        j["id"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| ReorderError::Decode("no id in /me response".into()))
    }

    async fn list_playlists(&self, cred: &Credential, offset: u32, limit: u32) -> Result<Page<PlaylistSummary>> {
        check_limit("list playlists", limit as usize, MAX_PLAYLIST_PAGE as usize)?;
        let page: Paging<PlaylistSummary> = self
            .get_json(
                cred,
                &self.url("/me/playlists"),
                &[("offset", offset.to_string()), ("limit", limit.to_string())],
            )
            .await?;
        debug!("fetched {} playlists at offset {}", page.items.len(), offset);
        Ok(Page::new(page.items, page.next.is_some()))
    }

    async fn list_playlist_items(
        &self,
        cred: &Credential,
        playlist_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Page<PlaylistItem>> {
        check_limit("list playlist items", limit as usize, MAX_ITEM_PAGE as usize)?;
        let page: Paging<PlaylistEntry> = self
            .get_json(
                cred,
                &self.playlist_tracks_url(playlist_id)?,
                &[("offset", offset.to_string()), ("limit", limit.to_string())],
            )
            .await?;
        debug!(
            "fetched {} entries of playlist {} at offset {}",
            page.items.len(),
            playlist_id,
            offset
        );
        // An entry whose track is gone is a tombstone, same as a null entry.
        let items = page
            .items
            .into_iter()
            .map(|entry| {
                entry.and_then(|e| {
                    e.track.map(|track| PlaylistItem {
                        added_at: e.added_at.unwrap_or_default(),
                        track,
                    })
                })
            })
            .collect();
        Ok(Page::new(items, page.next.is_some()))
    }

    async fn get_tracks(&self, cred: &Credential, ids: &[String]) -> Result<Vec<Track>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        check_limit("get tracks", ids.len(), MAX_TRACK_LOOKUP)?;
        let several: SeveralTracks = self
            .get_json(cred, &self.url("/tracks"), &[("ids", ids.join(","))])
            .await?;
        Ok(several.tracks.into_iter().flatten().collect())
    }

    async fn replace_playlist_items(&self, cred: &Credential, playlist_id: &str, uris: &[String]) -> Result<VersionToken> {
        check_limit("replace playlist items", uris.len(), MAX_WRITE_BATCH)?;
        let resp = self
            .client
            .put(self.playlist_tracks_url(playlist_id)?)
            .header(AUTHORIZATION, cred.bearer())
            .json(&json!({ "uris": uris }))
            .send()
            .await?;
        let snap: Snapshot = decode(check_status(resp).await?).await?;
        Ok(VersionToken(snap.snapshot_id))
    }

    async fn append_playlist_items(&self, cred: &Credential, playlist_id: &str, uris: &[String]) -> Result<VersionToken> {
        check_limit("append playlist items", uris.len(), MAX_WRITE_BATCH)?;
        let resp = self
            .client
            .post(self.playlist_tracks_url(playlist_id)?)
            .header(AUTHORIZATION, cred.bearer())
            .json(&json!({ "uris": uris }))
            .send()
            .await?;
        let snap: Snapshot = decode(check_status(resp).await?).await?;
        Ok(VersionToken(snap.snapshot_id))
    }
}
