use playlist_reorder::api::mock::{Call, MockProvider};
use playlist_reorder::api::Credential;
use playlist_reorder::config::Limits;
use playlist_reorder::enrich::enrich;
use playlist_reorder::models::{Album, Artist, Owner, PlaylistItem, PlaylistSummary, Track, VersionToken};
use playlist_reorder::service::PlaylistService;
use playlist_reorder::sort::SortKey;
use playlist_reorder::ReorderError;
use std::sync::Arc;

fn track(id: &str, popularity: u8, release: Option<&str>) -> Track {
    Track {
        id: id.into(),
        name: format!("Song {}", id),
        artists: vec![Artist { name: "Artist".into() }],
        album: Album { name: format!("Album {}", id), release_date: release.map(String::from), release_date_precision: None },
        duration_ms: 180_000,
        popularity,
        uri: format!("spotify:track:{}", id),
    }
}

fn item(t: Track) -> PlaylistItem {
    PlaylistItem { added_at: "2022-02-02T10:00:00Z".into(), track: t }
}

fn service(mock: Arc<MockProvider>) -> PlaylistService {
    PlaylistService::new(mock, Limits::default())
}

fn summary(id: &str, owner: &str, collaborative: bool) -> PlaylistSummary {
    PlaylistSummary {
        id: id.into(),
        name: format!("List {}", id),
        owner: Owner { id: owner.into(), display_name: None },
        collaborative,
        ..PlaylistSummary::default()
    }
}

#[tokio::test]
async fn popularity_descending_over_two_pages() {
    // 120 items, popularity cycles 0..10 so every value is shared by 12 tracks.
    let items: Vec<PlaylistItem> = (0..120).map(|i| item(track(&format!("{:03}", i), (i % 10) as u8, None))).collect();
    let mock = Arc::new(MockProvider::new("me").with_playlist_items("pl", items.clone()));

    let out = service(mock.clone()).reorder_playlist("tok", "pl", "popularity", "desc").await.unwrap();
    assert_eq!(out.item_count, 120);
    assert_eq!(out.version_token, VersionToken("snapshot-2".into()));

    let reads: Vec<Call> = mock.calls().into_iter().filter(|c| matches!(c, Call::ListItems { .. })).collect();
    assert_eq!(
        reads,
        vec![
            Call::ListItems { playlist_id: "pl".into(), offset: 0, limit: 100 },
            Call::ListItems { playlist_id: "pl".into(), offset: 100, limit: 100 },
        ]
    );

    let writes = mock.write_calls();
    assert_eq!(writes.len(), 2);
    assert!(matches!(&writes[0], Call::Replace { uris, .. } if uris.len() == 100));
    assert!(matches!(&writes[1], Call::Append { uris, .. } if uris.len() == 20));

    let mut expected = items;
    // Stable: equal popularity keeps original order.
    expected.sort_by(|a, b| b.track.popularity.cmp(&a.track.popularity));
    let expected: Vec<String> = expected.into_iter().map(|i| i.track.uri).collect();
    assert_eq!(mock.playlist_uris("pl"), expected);
    assert_eq!(expected[0], "spotify:track:009");
    assert_eq!(expected[1], "spotify:track:019");
}

#[tokio::test]
async fn release_date_sort_fetches_missing_dates_once() {
    let items = vec![
        item(track("b", 0, Some("2020"))),
        item(track("a", 0, None)),
        item(track("c", 0, Some("2020-06"))),
        item(track("a", 0, None)),
        item(track("x", 0, None)),
    ];
    let mock = Arc::new(
        MockProvider::new("me")
            .with_playlist_items("pl", items)
            .with_catalog(vec![track("a", 0, Some("2019"))]),
    );

    service(mock.clone()).reorder_playlist("tok", "pl", "release_date", "asc").await.unwrap();

    let lookups: Vec<Call> = mock.calls().into_iter().filter(|c| matches!(c, Call::GetTracks { .. })).collect();
    assert_eq!(lookups, vec![Call::GetTracks { ids: vec!["a".into(), "x".into()] }]);
    // x stays undated and sorts as the epoch; both copies of a got 2019.
    assert_eq!(
        mock.playlist_uris("pl"),
        vec!["spotify:track:x", "spotify:track:a", "spotify:track:a", "spotify:track:b", "spotify:track:c"]
    );
}

#[tokio::test]
async fn metadata_lookups_are_batched_by_fifty() {
    let items: Vec<PlaylistItem> = (0..120).map(|i| item(track(&format!("t{}", i), 0, None))).collect();
    let mock = Arc::new(MockProvider::new("me").with_playlist_items("pl", items));
    service(mock.clone()).reorder_playlist("tok", "pl", "releaseDate", "asc").await.unwrap();

    let sizes: Vec<usize> = mock
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            Call::GetTracks { ids } => Some(ids.len()),
            _ => None,
        })
        .collect();
    assert_eq!(sizes, vec![50, 50, 20]);
}

#[tokio::test]
async fn enrichment_twice_equals_once() {
    let items = vec![item(track("a", 0, None)), item(track("b", 0, Some("2001-02-03")))];
    let mock = MockProvider::new("me").with_catalog(vec![Track {
        album: Album { name: String::new(), release_date: Some("1999".into()), release_date_precision: Some("year".into()) },
        ..track("a", 0, None)
    }]);
    let cred = Credential::new("tok").unwrap();

    let once = enrich(&mock, &cred, items, &SortKey::ReleaseDate, 50).await.unwrap();
    let twice = enrich(&mock, &cred, once.clone(), &SortKey::ReleaseDate, 50).await.unwrap();
    assert_eq!(once, twice);
    assert_eq!(once[0].track.album.name, "Album a");
    assert_eq!(once[0].track.album.release_date.as_deref(), Some("1999"));
    // Second pass found nothing to look up.
    assert_eq!(mock.calls().len(), 1);
}

#[tokio::test]
async fn enrichment_is_skipped_for_other_keys() {
    let items = vec![item(track("a", 0, None))];
    let mock = Arc::new(MockProvider::new("me").with_playlist_items("pl", items));
    service(mock.clone()).reorder_playlist("tok", "pl", "name", "asc").await.unwrap();
    assert!(!mock.calls().iter().any(|c| matches!(c, Call::GetTracks { .. })));
}

#[tokio::test]
async fn failed_lookup_aborts_before_any_write() {
    let items = vec![item(track("a", 0, None)), item(track("b", 0, Some("2000")))];
    let mock = Arc::new(MockProvider::new("me").with_playlist_items("pl", items).failing_track_lookup(500));
    let err = service(mock.clone()).reorder_playlist("tok", "pl", "release_date", "asc").await.unwrap_err();
    assert!(matches!(err, ReorderError::RemoteService { status: 500, .. }));
    assert!(mock.write_calls().is_empty());
    assert_eq!(mock.playlist_uris("pl"), vec!["spotify:track:a", "spotify:track:b"]);
}

#[tokio::test]
async fn tombstones_are_dropped_from_the_rewrite() {
    let entries = vec![Some(item(track("b", 1, None))), None, Some(item(track("a", 2, None)))];
    let mock = Arc::new(MockProvider::new("me").with_playlist_entries("pl", entries));
    let out = service(mock.clone()).reorder_playlist("tok", "pl", "popularity", "asc").await.unwrap();
    assert_eq!(out.item_count, 2);
    assert_eq!(mock.playlist_uris("pl"), vec!["spotify:track:b", "spotify:track:a"]);
}

#[tokio::test]
async fn unknown_key_rewrites_current_order() {
    let items = vec![item(track("c", 0, None)), item(track("a", 0, None)), item(track("b", 0, None))];
    let mock = Arc::new(MockProvider::new("me").with_playlist_items("pl", items));
    let out = service(mock.clone()).reorder_playlist("tok", "pl", "vibes", "asc").await.unwrap();
    assert_eq!(out.item_count, 3);
    assert_eq!(mock.playlist_uris("pl"), vec!["spotify:track:c", "spotify:track:a", "spotify:track:b"]);
}

#[tokio::test]
async fn empty_playlist_is_reported_distinctly() {
    let mock = Arc::new(MockProvider::new("me").with_playlist_items("pl", Vec::new()));
    let err = service(mock.clone()).reorder_playlist("tok", "pl", "name", "asc").await.unwrap_err();
    assert!(matches!(err, ReorderError::NotFoundOrEmpty(ref id) if id == "pl"));
    assert_eq!(err.status_code(), 404);
    assert!(mock.write_calls().is_empty());
}

#[tokio::test]
async fn invalid_input_makes_no_remote_call() {
    let mock = Arc::new(MockProvider::new("me").with_playlist_items("pl", vec![item(track("a", 0, None))]));
    let err = service(mock.clone()).reorder_playlist("tok", "pl", "name", "upward").await.unwrap_err();
    assert!(matches!(err, ReorderError::InvalidRequest(_)));
    let err = service(mock.clone()).reorder_playlist("", "pl", "name", "asc").await.unwrap_err();
    assert!(matches!(err, ReorderError::InvalidRequest(_)));
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn rejected_credential_surfaces_unauthorized() {
    let mock = Arc::new(
        MockProvider::new("me")
            .with_playlist_items("pl", vec![item(track("a", 0, None))])
            .requiring_token("good"),
    );
    let err = service(mock).reorder_playlist("stale", "pl", "name", "asc").await.unwrap_err();
    assert!(matches!(err, ReorderError::Unauthorized(ref m) if m == "Invalid access token"));
}

#[tokio::test]
async fn partial_write_failure_keeps_committed_batches() {
    let items: Vec<PlaylistItem> = (0..150).map(|i| item(track(&format!("{:03}", i), 0, None))).collect();
    let mock = Arc::new(MockProvider::new("me").with_playlist_items("pl", items).failing_write(1, 429));
    let err = service(mock.clone()).reorder_playlist("tok", "pl", "name", "desc").await.unwrap_err();
    assert_eq!(err.committed_items(), Some(100));
    assert_eq!(mock.playlist_uris("pl").len(), 100);
    assert_eq!(mock.playlist_uris("pl")[0], "spotify:track:149");
}

#[tokio::test]
async fn editable_playlists_keep_owned_and_collaborative() {
    let mut lists = Vec::new();
    for i in 0..120 {
        let (owner, collab) = match i % 3 {
            0 => ("me", false),
            1 => ("someone", true),
            _ => ("someone", false),
        };
        lists.push(summary(&format!("p{}", i), owner, collab));
    }
    let mock = Arc::new(MockProvider::new("me").with_playlists(lists));
    let editable = service(mock.clone()).editable_playlists("tok").await.unwrap();
    assert_eq!(editable.len(), 80);
    assert_eq!(editable[0].id, "p0");
    assert_eq!(editable[1].id, "p1");
    assert_eq!(editable[2].id, "p3");

    let pages: Vec<Call> = mock.calls().into_iter().filter(|c| matches!(c, Call::ListPlaylists { .. })).collect();
    assert_eq!(
        pages,
        vec![
            Call::ListPlaylists { offset: 0, limit: 50 },
            Call::ListPlaylists { offset: 50, limit: 50 },
            Call::ListPlaylists { offset: 100, limit: 50 },
        ]
    );
}

#[tokio::test]
async fn preview_sorts_without_writing() {
    let items = vec![item(track("b", 0, None)), item(track("a", 0, None))];
    let mock = Arc::new(MockProvider::new("me").with_playlist_items("pl", items));
    let sorted = service(mock.clone()).preview_order("tok", "pl", "name", "asc").await.unwrap();
    assert_eq!(sorted[0].track.id, "a");
    assert!(mock.write_calls().is_empty());
}

#[tokio::test]
async fn concurrent_reorders_of_different_playlists_do_not_interact() {
    let a: Vec<PlaylistItem> = (0..30).map(|i| item(track(&format!("a{:02}", i), i as u8, None))).collect();
    let b: Vec<PlaylistItem> = (0..30).map(|i| item(track(&format!("b{:02}", i), i as u8, None))).collect();
    let mock = Arc::new(MockProvider::new("me").with_playlist_items("A", a).with_playlist_items("B", b));
    let svc = service(mock.clone());

    let (ra, rb) = tokio::join!(
        svc.reorder_playlist("tok", "A", "popularity", "desc"),
        svc.reorder_playlist("tok", "B", "popularity", "asc"),
    );
    assert_eq!(ra.unwrap().item_count, 30);
    assert_eq!(rb.unwrap().item_count, 30);
    assert_eq!(mock.playlist_uris("A")[0], "spotify:track:a29");
    assert_eq!(mock.playlist_uris("B")[0], "spotify:track:b00");
}
