use super::{Credential, Provider, MAX_ITEM_PAGE, MAX_PLAYLIST_PAGE, MAX_TRACK_LOOKUP, MAX_WRITE_BATCH};
use crate::error::{ReorderError, Result};
use crate::models::{Page, PlaylistItem, PlaylistSummary, Track, VersionToken};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::info;

/// A call the mock received, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CurrentUser,
    ListPlaylists { offset: u32, limit: u32 },
    ListItems { playlist_id: String, offset: u32, limit: u32 },
    GetTracks { ids: Vec<String> },
    Replace { playlist_id: String, uris: Vec<String> },
    Append { playlist_id: String, uris: Vec<String> },
}

impl Call {
    pub fn is_write(&self) -> bool {
        matches!(self, Call::Replace { .. } | Call::Append { .. })
    }
}

#[derive(Default)]
struct State {
    entries: HashMap<String, Vec<Option<PlaylistItem>>>,
    /// Every item ever seeded, by uri, so rewrites keep full track data.
    library: HashMap<String, PlaylistItem>,
    calls: Vec<Call>,
    writes: usize,
}

/// In-memory provider for tests and dry runs. Serves playlists and tracks it
/// was seeded with, applies writes to its own copy, and records every call.
/// Version tokens are `snapshot-1`, `snapshot-2`, ... in write order.
pub struct MockProvider {
    user_id: String,
    playlists: Vec<Option<PlaylistSummary>>,
    catalog: HashMap<String, Track>,
    required_token: Option<Credential>,
    fail_write: Option<(usize, u16)>,
    fail_lookup: Option<u16>,
    state: Mutex<State>,
}

impl MockProvider {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            playlists: Vec::new(),
            catalog: HashMap::new(),
            required_token: None,
            fail_write: None,
            fail_lookup: None,
            state: Mutex::new(State::default()),
        }
    }

    pub fn with_playlists(mut self, playlists: Vec<PlaylistSummary>) -> Self {
        self.playlists = playlists.into_iter().map(Some).collect();
        self
    }

    pub fn with_playlist_items(self, playlist_id: &str, items: Vec<PlaylistItem>) -> Self {
        self.with_playlist_entries(playlist_id, items.into_iter().map(Some).collect())
    }

    /// Seed a playlist including tombstones (`None`).
    pub fn with_playlist_entries(self, playlist_id: &str, entries: Vec<Option<PlaylistItem>>) -> Self {
        {
            let mut state = self.lock();
            for item in entries.iter().flatten() {
                state.library.insert(item.track.uri.clone(), item.clone());
            }
            state.entries.insert(playlist_id.to_string(), entries);
        }
        self
    }

    /// Tracks answerable by metadata lookups, keyed by id.
    pub fn with_catalog(mut self, tracks: Vec<Track>) -> Self {
        for t in tracks {
            self.catalog.insert(t.id.clone(), t);
        }
        self
    }

    /// Reject every call whose credential differs from `token`.
    pub fn requiring_token(mut self, token: &str) -> Self {
        self.required_token = Credential::new(token).ok();
        self
    }

    /// Make the `nth` write call (0-based, replace and append counted together) fail with `status`.
    pub fn failing_write(mut self, nth: usize, status: u16) -> Self {
        self.fail_write = Some((nth, status));
        self
    }

    pub fn failing_track_lookup(mut self, status: u16) -> Self {
        self.fail_lookup = Some(status);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn write_calls(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_write).collect()
    }

    /// Current remote order of a playlist (tombstones skipped).
    pub fn playlist_uris(&self, playlist_id: &str) -> Vec<String> {
        self.lock()
            .entries
            .get(playlist_id)
            .map(|e| e.iter().flatten().map(|i| i.track.uri.clone()).collect())
            .unwrap_or_default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A poisoned lock only means another test thread panicked mid-call.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn authorize(&self, cred: &Credential) -> Result<()> {
        match &self.required_token {
            Some(expected) if expected != cred => Err(ReorderError::Unauthorized("Invalid access token".into())),
            _ => Ok(()),
        }
    }

    fn record(&self, call: Call) {
        self.lock().calls.push(call);
    }

    fn write(&self, playlist_id: &str, uris: &[String], replace: bool) -> Result<VersionToken> {
        let mut state = self.lock();
        let nth = state.writes;
        state.writes += 1;
        if let Some((fail_at, status)) = self.fail_write {
            if fail_at == nth {
                return Err(ReorderError::RemoteService {
                    status,
                    message: "injected write failure".into(),
                    retry_after: None,
                });
            }
        }
        let added: Vec<Option<PlaylistItem>> = uris
            .iter()
            .map(|u| {
                Some(state.library.get(u).cloned().unwrap_or_else(|| PlaylistItem {
                    added_at: String::new(),
                    track: Track { uri: u.clone(), ..Track::default() },
                }))
            })
            .collect();
        let entries = state.entries.entry(playlist_id.to_string()).or_default();
        if replace {
            *entries = added;
        } else {
            entries.extend(added);
        }
        Ok(VersionToken(format!("snapshot-{}", nth + 1)))
    }
}

fn window<T: Clone>(all: &[Option<T>], offset: u32, limit: u32) -> Page<T> {
    let start = (offset as usize).min(all.len());
    let end = (start + limit as usize).min(all.len());
    Page::new(all[start..end].to_vec(), end < all.len())
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn current_user_id(&self, cred: &Credential) -> Result<String> {
        self.record(Call::CurrentUser);
        self.authorize(cred)?;
        Ok(self.user_id.clone())
    }

    async fn list_playlists(&self, cred: &Credential, offset: u32, limit: u32) -> Result<Page<PlaylistSummary>> {
        self.record(Call::ListPlaylists { offset, limit });
        self.authorize(cred)?;
        if limit > MAX_PLAYLIST_PAGE {
            return Err(ReorderError::InvalidRequest(format!("limit {} over ceiling", limit)));
        }
        Ok(window(&self.playlists, offset, limit))
    }

    async fn list_playlist_items(
        &self,
        cred: &Credential,
        playlist_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Page<PlaylistItem>> {
        self.record(Call::ListItems { playlist_id: playlist_id.to_string(), offset, limit });
        self.authorize(cred)?;
        if limit > MAX_ITEM_PAGE {
            return Err(ReorderError::InvalidRequest(format!("limit {} over ceiling", limit)));
        }
        let state = self.lock();
        let entries = state.entries.get(playlist_id).ok_or_else(|| ReorderError::RemoteService {
            status: 404,
            message: "Not found.".into(),
            retry_after: None,
        })?;
        Ok(window(entries, offset, limit))
    }

    async fn get_tracks(&self, cred: &Credential, ids: &[String]) -> Result<Vec<Track>> {
        self.record(Call::GetTracks { ids: ids.to_vec() });
        self.authorize(cred)?;
        if ids.len() > MAX_TRACK_LOOKUP {
            return Err(ReorderError::InvalidRequest(format!("{} ids over ceiling", ids.len())));
        }
        if let Some(status) = self.fail_lookup {
            return Err(ReorderError::RemoteService {
                status,
                message: "injected lookup failure".into(),
                retry_after: None,
            });
        }
        Ok(ids.iter().filter_map(|id| self.catalog.get(id).cloned()).collect())
    }

    async fn replace_playlist_items(&self, cred: &Credential, playlist_id: &str, uris: &[String]) -> Result<VersionToken> {
        self.record(Call::Replace { playlist_id: playlist_id.to_string(), uris: uris.to_vec() });
        self.authorize(cred)?;
        if uris.len() > MAX_WRITE_BATCH {
            return Err(ReorderError::InvalidRequest(format!("{} uris over ceiling", uris.len())));
        }
        info!("MockProvider: replace {} -> {} tracks", playlist_id, uris.len());
        self.write(playlist_id, uris, true)
    }

    async fn append_playlist_items(&self, cred: &Credential, playlist_id: &str, uris: &[String]) -> Result<VersionToken> {
        self.record(Call::Append { playlist_id: playlist_id.to_string(), uris: uris.to_vec() });
        self.authorize(cred)?;
        if uris.len() > MAX_WRITE_BATCH {
            return Err(ReorderError::InvalidRequest(format!("{} uris over ceiling", uris.len())));
        }
        info!("MockProvider: append {} -> {} tracks", playlist_id, uris.len());
        self.write(playlist_id, uris, false)
    }
}
