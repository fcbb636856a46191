//! Pure, stable ordering of playlist items by a single key.
//!
//! Missing values never drop an item; they take the default from this table:
//!
//! | key           | compared as                         | when missing          |
//! |---------------|-------------------------------------|-----------------------|
//! | `date_added`  | `added_at` instant                  | epoch                 |
//! | `release_date`| start of the `YYYY[-MM[-DD]]` period | epoch                 |
//! | `name`        | lowercased track name               | `""`                  |
//! | `artist_name` | lowercased first artist name        | `""`                  |
//! | `album_name`  | lowercased album name               | `""`                  |
//! | `duration_ms` | integer                             | `0`                   |
//! | `popularity`  | integer                             | `0`                   |

use crate::models::{PlaylistItem, SortDirection};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

static RELEASE_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})(?:-(\d{1,2})(?:-(\d{1,2}))?)?$").expect("static regex"));

/// Stand-in for a missing or unparseable date.
const EPOCH: i64 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortKey {
    DateAdded,
    ReleaseDate,
    Name,
    ArtistName,
    AlbumName,
    DurationMs,
    Popularity,
    /// Anything else. Sorting by it leaves the order untouched.
    Unknown(String),
}

impl SortKey {
    pub fn as_str(&self) -> &str {
        match self {
            SortKey::DateAdded => "date_added",
            SortKey::ReleaseDate => "release_date",
            SortKey::Name => "name",
            SortKey::ArtistName => "artist_name",
            SortKey::AlbumName => "album_name",
            SortKey::DurationMs => "duration_ms",
            SortKey::Popularity => "popularity",
            SortKey::Unknown(raw) => raw,
        }
    }

    pub fn needs_release_date(&self) -> bool {
        matches!(self, SortKey::ReleaseDate)
    }
}

impl FromStr for SortKey {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "date_added" | "dateAdded" => SortKey::DateAdded,
            "release_date" | "releaseDate" => SortKey::ReleaseDate,
            "name" => SortKey::Name,
            "artist_name" | "artistName" => SortKey::ArtistName,
            "album_name" | "albumName" => SortKey::AlbumName,
            "duration_ms" | "durationMs" => SortKey::DurationMs,
            "popularity" => SortKey::Popularity,
            other => SortKey::Unknown(other.to_string()),
        })
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived comparable value. Within one sort every item yields the same variant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum SortValue {
    /// Milliseconds since the epoch.
    Instant(i64),
    Text(String),
    Number(u64),
}

/// Parse a release date of year, month or day precision to the start of that period.
pub fn release_instant(raw: &str) -> Option<i64> {
    let caps = RELEASE_DATE.captures(raw.trim())?;
    let year: i32 = caps.get(1)?.as_str().parse().ok()?;
    let month: u32 = caps.get(2).map_or(Some(1), |m| m.as_str().parse().ok())?;
    let day: u32 = caps.get(3).map_or(Some(1), |d| d.as_str().parse().ok())?;
    let start = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(0, 0, 0)?;
    Some(Utc.from_utc_datetime(&start).timestamp_millis())
}

pub fn added_instant(raw: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(raw.trim()).ok().map(|d| d.timestamp_millis())
}

fn sort_value(item: &PlaylistItem, key: &SortKey) -> Option<SortValue> {
    let track = &item.track;
    let value = match key {
        SortKey::DateAdded => SortValue::Instant(added_instant(&item.added_at).unwrap_or(EPOCH)),
        SortKey::ReleaseDate => SortValue::Instant(
            track.album.release_date.as_deref().and_then(release_instant).unwrap_or(EPOCH),
        ),
        SortKey::Name => SortValue::Text(track.name.to_lowercase()),
        SortKey::ArtistName => SortValue::Text(
            track.artists.first().map(|a| a.name.to_lowercase()).unwrap_or_default(),
        ),
        SortKey::AlbumName => SortValue::Text(track.album.name.to_lowercase()),
        SortKey::DurationMs => SortValue::Number(track.duration_ms),
        SortKey::Popularity => SortValue::Number(u64::from(track.popularity)),
        SortKey::Unknown(_) => return None,
    };
    Some(value)
}

/// Reorder `items` by `key`. The sort is stable: equal values keep their
/// input order in both directions. An unknown key returns the input as-is.
pub fn sort_items(items: Vec<PlaylistItem>, key: &SortKey, direction: SortDirection) -> Vec<PlaylistItem> {
    if matches!(key, SortKey::Unknown(_)) {
        return items;
    }

    let mut keyed: Vec<(SortValue, PlaylistItem)> = items
        .into_iter()
        .map(|item| {
            let value = sort_value(&item, key).unwrap_or(SortValue::Instant(EPOCH));
            (value, item)
        })
        .collect();

    // slice::sort_by is stable; only the primary comparison is flipped.
    keyed.sort_by(|(a, _), (b, _)| match direction {
        SortDirection::Ascending => a.cmp(b),
        SortDirection::Descending => b.cmp(a),
    });

    keyed.into_iter().map(|(_, item)| item).collect()
}
