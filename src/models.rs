use serde::{Deserialize, Deserializer};
use std::fmt;

/// Remote payloads send explicit `null` for fields that are absent on local
/// files; fold those into the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One entry of a playlist snapshot: a track plus the moment it was added.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlaylistItem {
    /// RFC 3339 timestamp as returned by the remote service.
    pub added_at: String,
    pub track: Track,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Track {
    /// Empty for local files, which the remote service cannot look up.
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub artists: Vec<Artist>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub album: Album,
    #[serde(default, deserialize_with = "null_as_default")]
    pub duration_ms: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub popularity: u8,
    #[serde(default, deserialize_with = "null_as_default")]
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Artist {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Album {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// `YYYY`, `YYYY-MM` or `YYYY-MM-DD`.
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub release_date_precision: Option<String>,
}

impl Album {
    pub fn has_release_date(&self) -> bool {
        self.release_date.as_deref().map_or(false, |d| !d.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Image {
    pub url: String,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub width: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Owner {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Track count and link, as embedded in a playlist listing.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct TrackSummary {
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub total: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct PlaylistSummary {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<Image>,
    #[serde(default, rename = "tracks")]
    pub track_summary: TrackSummary,
    #[serde(default, deserialize_with = "null_as_default")]
    pub external_urls: std::collections::BTreeMap<String, String>,
    #[serde(default)]
    pub uri: String,
    pub owner: Owner,
    #[serde(default)]
    pub collaborative: bool,
}

/// A single window of an offset-paged listing. `None` entries are
/// tombstones (deleted or unavailable underlying objects).
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<Option<T>>,
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<Option<T>>, has_more: bool) -> Self {
        Self { items, has_more }
    }
}

/// Opaque playlist-state fingerprint handed out by the remote service after a write.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct VersionToken(pub String);

impl VersionToken {
    /// Sentinel for an explicit clear; never produced by the remote service.
    pub const CLEARED: &'static str = "playlist_cleared";

    pub fn cleared() -> Self {
        Self(Self::CLEARED.to_string())
    }

    pub fn is_cleared(&self) -> bool {
        self.0 == Self::CLEARED
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl std::str::FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Ascending),
            "desc" | "descending" => Ok(SortDirection::Descending),
            other => Err(format!("unknown sort direction: {other:?}")),
        }
    }
}

/// Result of a completed reorder request.
#[derive(Debug, Clone, PartialEq)]
pub struct ReorderOutcome {
    pub version_token: VersionToken,
    pub item_count: usize,
}
