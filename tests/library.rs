//! Content Store Integration Tests
//!
//! Exercises the store against both storage backends: persistence across
//! store instances, id assignment, updates, deletes, reordering and the
//! query view over the persisted collection.

use chrono::{Duration, TimeZone, Utc};
use learnshelf::library::schema::CONTENT_KEY;
use learnshelf::library::{
    query, BlobDir, ContentId, ContentItem, ContentStore, ContentType, Draft, FilterSpec,
    Payload, SortSpec,
};
use learnshelf::storage::{FileStorage, MemoryStorage, Storage};
use tempfile::TempDir;

fn article(title: &str, category: &str) -> Draft {
    Draft::new(
        title,
        category,
        Payload::Article {
            content: format!("notes on {}", title),
        },
    )
}

fn video(title: &str, external_id: &str) -> Draft {
    Draft::new(
        title,
        "videos",
        Payload::Video {
            external_id: external_id.to_string(),
        },
    )
}

fn titles(items: &[ContentItem]) -> Vec<&str> {
    items.iter().map(|i| i.title.as_str()).collect()
}

#[test]
fn test_created_items_survive_reopen() {
    let temp = TempDir::new().unwrap();

    let created = {
        let mut store = ContentStore::new(FileStorage::open(temp.path()).unwrap());
        let a = store.create(article("Ownership", "rust")).unwrap();
        let b = store.create(video("Intro", "dQw4w9WgXcQ")).unwrap();
        vec![a, b]
    };

    let store = ContentStore::new(FileStorage::open(temp.path()).unwrap());
    let loaded = store.load_all();

    assert_eq!(loaded, created);
    assert_ne!(loaded[0].id, loaded[1].id);
    assert!(loaded.iter().all(|i| !i.favorite));
}

#[test]
fn test_update_keeps_identity_and_position() {
    let mut store = ContentStore::new(MemoryStorage::new());
    let first = store.create(article("First", "a")).unwrap();
    let second = store.create(article("Second", "a")).unwrap();
    store.toggle_favorite(second.id).unwrap();

    let updated = store
        .update(second.id, article("Second, revised", "b"))
        .unwrap();

    assert_eq!(updated.id, second.id);
    assert_eq!(updated.created_at, second.created_at);
    assert_eq!(updated.content_type(), ContentType::Article);
    assert!(updated.favorite);
    assert_eq!(updated.category, "b");

    let loaded = store.load_all();
    assert_eq!(titles(&loaded), vec!["First", "Second, revised"]);
    assert_eq!(loaded[0], first);
}

#[test]
fn test_stale_ids_report_not_found() {
    let mut store = ContentStore::new(MemoryStorage::new());
    let item = store.create(article("Gone soon", "misc")).unwrap();

    store.delete(item.id).unwrap();
    assert!(store.load_all().is_empty());

    assert!(store.delete(item.id).unwrap_err().is_not_found());
    assert!(store.get(item.id).unwrap_err().is_not_found());
    assert!(store
        .update(item.id, article("Gone soon", "misc"))
        .unwrap_err()
        .is_not_found());
}

#[test]
fn test_delete_middle_item_keeps_order() {
    let mut store = ContentStore::new(MemoryStorage::new());
    let a = store.create(article("A", "c")).unwrap();
    let b = store.create(article("B", "c")).unwrap();
    let c = store.create(article("C", "c")).unwrap();

    let removed = store.delete(b.id).unwrap();
    assert_eq!(removed, b);

    let loaded = store.load_all();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded, vec![a, c]);
}

#[test]
fn test_delete_unknown_id_leaves_collection_untouched() {
    let temp = TempDir::new().unwrap();
    let mut store = ContentStore::new(FileStorage::open(temp.path()).unwrap());
    let a = store.create(article("A", "c")).unwrap();
    let b = store.create(article("B", "c")).unwrap();
    let before = store.storage().get(CONTENT_KEY).unwrap().unwrap();

    let unknown = ContentId::new(a.id.get().max(b.id.get()) + 1000);
    assert!(store.delete(unknown).unwrap_err().is_not_found());

    let after = store.storage().get(CONTENT_KEY).unwrap().unwrap();
    assert_eq!(after, before);
    assert_eq!(store.load_all(), vec![a, b]);
}

#[test]
fn test_undecodable_bytes_read_as_empty_and_recover() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join(CONTENT_KEY), [0xff, 0xfe, 0x00]).unwrap();

    let mut store = ContentStore::new(FileStorage::open(temp.path()).unwrap());
    assert!(store.load_all().is_empty());

    let item = store.create(article("Fresh start", "c")).unwrap();
    assert_eq!(store.load_all(), vec![item.clone()]);
    assert!(store.toggle_favorite(item.id).unwrap().favorite);
}

#[test]
fn test_reorder_persists_without_sorting() {
    let temp = TempDir::new().unwrap();
    let mut store = ContentStore::new(FileStorage::open(temp.path()).unwrap());

    let a = store.create(article("A", "c")).unwrap();
    let b = store.create(article("B", "c")).unwrap();
    store.toggle_favorite(b.id).unwrap();

    store.reorder(&[b.id, a.id]).unwrap();

    let reopened = ContentStore::new(FileStorage::open(temp.path()).unwrap());
    assert_eq!(titles(&reopened.load_all()), vec!["B", "A"]);
}

#[test]
fn test_query_view_over_stored_collection() {
    let t1 = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let raw = serde_json::json!([
        {"id": 1, "type": "article", "title": "A", "category": "c", "favorite": false,
         "createdAt": t1.to_rfc3339(), "content": "x"},
        {"id": 2, "type": "article", "title": "B", "category": "c", "favorite": true,
         "createdAt": (t1 + Duration::hours(1)).to_rfc3339(), "content": "y"}
    ]);
    let store = ContentStore::new(MemoryStorage::new().with_entry(CONTENT_KEY, raw.to_string()));

    let by_favorite = store.view(&FilterSpec::new(), SortSpec::FavoriteFirst);
    assert_eq!(titles(&by_favorite), vec!["B", "A"]);

    let searched = store.view(&FilterSpec::new().with_search("a"), SortSpec::Newest);
    assert_eq!(titles(&searched), vec!["A"]);

    // Viewing never rewrites the stored order
    let before = store.load_all();
    let once = query::view(&before, &FilterSpec::new(), SortSpec::Oldest);
    let twice = query::view(&once, &FilterSpec::new(), SortSpec::Oldest);
    assert_eq!(once, twice);
    assert_eq!(store.load_all(), before);
}

#[test]
fn test_legacy_collection_migrates_on_write() {
    let temp = TempDir::new().unwrap();
    let mut storage = FileStorage::open(temp.path()).unwrap();
    storage
        .set(
            CONTENT_KEY,
            r#"[{"id":1700000000000,"videoId":"dQw4w9WgXcQ","isPlaylist":false},
                {"id":"1700000000001","videoId":"PLabc123","isPlaylist":true,"title":"Course"}]"#,
        )
        .unwrap();

    let mut store = ContentStore::new(storage);
    let loaded = store.load_all();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].content_type(), ContentType::Video);
    assert_eq!(loaded[0].title, "Untitled Video");
    assert_eq!(loaded[0].category, "Uncategorized");
    assert_eq!(loaded[0].created_at.timestamp_millis(), 1_700_000_000_000);
    assert_eq!(loaded[1].content_type(), ContentType::Playlist);
    assert_eq!(loaded[1].id, ContentId::new(1_700_000_000_001));

    // Any write stores the rich shape
    store.toggle_favorite(loaded[1].id).unwrap();
    let stored = store.storage().get(CONTENT_KEY).unwrap().unwrap();
    assert!(stored.contains(r#""type":"playlist""#));
    assert!(stored.contains(r#""externalId":"PLabc123""#));
    assert!(!stored.contains("videoId"));
}

#[test]
fn test_deleting_last_reference_removes_blob_file() {
    let temp = TempDir::new().unwrap();
    let blobs = temp.path().join("blobs");
    std::fs::create_dir_all(&blobs).unwrap();
    std::fs::write(blobs.join("0011223344556677.pdf"), b"%PDF-1.4").unwrap();

    let mut store = ContentStore::new(FileStorage::open(temp.path().join("storage")).unwrap())
        .with_releaser(BlobDir::new(&blobs));

    let pdf = |title: &str| {
        Draft::new(
            title,
            "papers",
            Payload::Pdf {
                data: "blob:0011223344556677.pdf".to_string(),
            },
        )
    };
    let a = store.create(pdf("copy one")).unwrap();
    let b = store.create(pdf("copy two")).unwrap();

    store.delete(a.id).unwrap();
    assert!(blobs.join("0011223344556677.pdf").exists());

    store.delete(b.id).unwrap();
    assert!(!blobs.join("0011223344556677.pdf").exists());
}
