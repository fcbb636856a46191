pub mod mock;
pub mod spotify;

use crate::error::{ReorderError, Result};
use crate::models::{Page, PlaylistItem, PlaylistSummary, Track, VersionToken};
use std::fmt;

/// Remote ceilings on list-valued request parameters.
pub const MAX_PLAYLIST_PAGE: u32 = 50;
pub const MAX_ITEM_PAGE: u32 = 100;
pub const MAX_TRACK_LOOKUP: usize = 50;
pub const MAX_WRITE_BATCH: usize = 100;

/// Bearer credential for a single request. Passed to every provider call;
/// never stored on the provider. Formatting only ever shows a short prefix.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        let token = token.trim();
        if token.is_empty() {
            return Err(ReorderError::InvalidRequest("access token is required".into()));
        }
        Ok(Self(token.to_string()))
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }

    pub fn redacted(&self) -> String {
        let prefix: String = self.0.chars().take(6).collect();
        format!("{}…", prefix)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential({})", self.redacted())
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

/// Provider trait: the remote capabilities the reorder pipeline needs.
/// Implementations: spotify::SpotifyProvider, mock::MockProvider.
#[async_trait::async_trait]
pub trait Provider: Send + Sync {
    /// Return the provider's name (for logging)
    fn name(&self) -> &str;

    /// Id of the user the credential belongs to.
    async fn current_user_id(&self, cred: &Credential) -> Result<String>;

    /// One page of the caller's playlists (limit <= MAX_PLAYLIST_PAGE).
    async fn list_playlists(&self, cred: &Credential, offset: u32, limit: u32) -> Result<Page<PlaylistSummary>>;

    /// One page of a playlist's entries (limit <= MAX_ITEM_PAGE).
    async fn list_playlist_items(
        &self,
        cred: &Credential,
        playlist_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Page<PlaylistItem>>;

    /// Full track metadata for up to MAX_TRACK_LOOKUP ids. Unknown ids are omitted.
    async fn get_tracks(&self, cred: &Credential, ids: &[String]) -> Result<Vec<Track>>;

    /// Replace the whole playlist with `uris` (batching done by caller).
    async fn replace_playlist_items(&self, cred: &Credential, playlist_id: &str, uris: &[String]) -> Result<VersionToken>;

    /// Append `uris` to the end of the playlist (batching done by caller).
    async fn append_playlist_items(&self, cred: &Credential, playlist_id: &str, uris: &[String]) -> Result<VersionToken>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_never_formats_in_full() {
        let cred = Credential::new("BQDsecretsecretsecret").unwrap();
        assert_eq!(format!("{}", cred), "BQDsec…");
        assert_eq!(format!("{:?}", cred), "Credential(BQDsec…)");
        assert_eq!(cred.bearer(), "Bearer BQDsecretsecretsecret");
    }

    #[test]
    fn blank_credential_is_invalid_request() {
        let err = Credential::new("   ").unwrap_err();
        assert!(matches!(err, ReorderError::InvalidRequest(_)));
    }
}
