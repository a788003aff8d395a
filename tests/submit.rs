//! Form Submission Integration Tests
//!
//! Raw form values through validation, file reading and the store, the same
//! path the CLI takes for `add` and `edit`.

use learnshelf::library::validate::field;
use learnshelf::library::{
    prefill, BlobDir, ContentStore, ContentType, DataUrlReader, EditingContext, Payload,
    RawFields, SchemaVariant, Validator,
};
use learnshelf::storage::MemoryStorage;
use tempfile::TempDir;

#[tokio::test]
async fn test_pdf_inline_submission() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("Rust Book.pdf");
    std::fs::write(&file, b"%PDF-1.4 tiny").unwrap();

    let ctx = EditingContext::create(ContentType::Pdf);
    let fields = RawFields::new()
        .with(field::FILE, file.display().to_string())
        .with(field::CATEGORY, "books");

    let draft = Validator::default()
        .validate(&ctx, &fields)
        .unwrap()
        .materialize(&DataUrlReader)
        .await
        .unwrap();

    let mut store = ContentStore::new(MemoryStorage::new());
    let item = store.submit(&ctx, draft).unwrap();

    assert_eq!(item.title, "Rust Book.pdf");
    match &item.payload {
        Payload::Pdf { data } => assert!(data.starts_with("data:application/pdf;base64,")),
        other => panic!("unexpected payload: {:?}", other),
    }
}

#[tokio::test]
async fn test_pdf_blob_replaced_on_edit() {
    let temp = TempDir::new().unwrap();
    let blobs = BlobDir::new(temp.path().join("blobs"));

    let first = temp.path().join("v1.pdf");
    let second = temp.path().join("v2.pdf");
    std::fs::write(&first, b"%PDF first").unwrap();
    std::fs::write(&second, b"%PDF second").unwrap();

    let mut store = ContentStore::new(MemoryStorage::new()).with_releaser(blobs.clone());
    let validator = Validator::default();

    let ctx = EditingContext::create(ContentType::Pdf);
    let fields = RawFields::new()
        .with(field::FILE, first.display().to_string())
        .with(field::TITLE, "Design notes")
        .with(field::CATEGORY, "docs");
    let draft = validator
        .validate(&ctx, &fields)
        .unwrap()
        .materialize(&blobs)
        .await
        .unwrap();
    let item = store.submit(&ctx, draft).unwrap();
    let old_ref = item.payload.transient_reference().unwrap().to_string();
    assert!(blobs.resolve(&old_ref).unwrap().exists());

    // Editing a PDF always needs a file
    let (edit_ctx, mut edit_fields) = prefill(&item);
    let errors = validator.validate(&edit_ctx, &edit_fields).unwrap_err();
    assert!(errors.get(field::FILE).is_some());

    edit_fields.set(field::FILE, second.display().to_string());
    let draft = validator
        .validate(&edit_ctx, &edit_fields)
        .unwrap()
        .materialize(&blobs)
        .await
        .unwrap();
    let updated = store.submit(&edit_ctx, draft).unwrap();

    assert_eq!(updated.id, item.id);
    assert_eq!(updated.title, "Design notes");
    assert!(!blobs.resolve(&old_ref).unwrap().exists());
    let new_ref = updated.payload.transient_reference().unwrap();
    assert!(blobs.resolve(new_ref).unwrap().exists());
}

#[tokio::test]
async fn test_video_edit_round_trip() {
    let mut store = ContentStore::new(MemoryStorage::new());
    let validator = Validator::new(SchemaVariant::Minimal);

    let ctx = EditingContext::create(ContentType::Video);
    let fields = RawFields::new().with(field::URL, "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
    let draft = validator
        .validate(&ctx, &fields)
        .unwrap()
        .materialize(&DataUrlReader)
        .await
        .unwrap();
    let item = store.submit(&ctx, draft).unwrap();
    assert_eq!(item.category, "Uncategorized");
    assert_eq!(
        item.embed_url().as_deref(),
        Some("https://www.youtube.com/embed/dQw4w9WgXcQ")
    );

    // A playlist URL cannot replace a video
    let (edit_ctx, mut edit_fields) = prefill(&item);
    edit_fields.set(field::URL, "https://www.youtube.com/playlist?list=PLx0sYbCqOb8TBPRdmBHs5Iftvv9TPboYG");
    assert!(validator.validate(&edit_ctx, &edit_fields).is_err());

    edit_fields.set(field::URL, "https://youtu.be/9bZkp7q19f0");
    edit_fields.set(field::TITLE, "Renamed");
    let draft = validator
        .validate(&edit_ctx, &edit_fields)
        .unwrap()
        .materialize(&DataUrlReader)
        .await
        .unwrap();
    let updated = store.submit(&edit_ctx, draft).unwrap();

    assert_eq!(updated.id, item.id);
    assert_eq!(updated.created_at, item.created_at);
    assert_eq!(updated.payload.external_id(), Some("9bZkp7q19f0"));
    assert_eq!(store.load_all().len(), 1);
}

#[tokio::test]
async fn test_stale_blob_edit_releases_new_file() {
    let temp = TempDir::new().unwrap();
    let blobs = BlobDir::new(temp.path().join("blobs"));
    let original = temp.path().join("draft.pdf");
    let replacement = temp.path().join("final.pdf");
    std::fs::write(&original, b"%PDF draft").unwrap();
    std::fs::write(&replacement, b"%PDF final").unwrap();

    let mut store = ContentStore::new(MemoryStorage::new()).with_releaser(blobs.clone());
    let validator = Validator::default();

    let ctx = EditingContext::create(ContentType::Pdf);
    let fields = RawFields::new()
        .with(field::FILE, original.display().to_string())
        .with(field::CATEGORY, "docs");
    let draft = validator
        .validate(&ctx, &fields)
        .unwrap()
        .materialize(&blobs)
        .await
        .unwrap();
    let item = store.submit(&ctx, draft).unwrap();

    // The form was opened before the item was deleted elsewhere
    let (edit_ctx, mut edit_fields) = prefill(&item);
    store.delete(item.id).unwrap();

    edit_fields.set(field::FILE, replacement.display().to_string());
    let draft = validator
        .validate(&edit_ctx, &edit_fields)
        .unwrap()
        .materialize(&blobs)
        .await
        .unwrap();
    let new_ref = draft.payload.transient_reference().unwrap().to_string();
    assert!(blobs.resolve(&new_ref).unwrap().exists());

    let err = store.submit(&edit_ctx, draft).unwrap_err();
    assert!(err.is_not_found());
    assert!(!blobs.resolve(&new_ref).unwrap().exists());
    assert!(store.load_all().is_empty());
    assert_eq!(std::fs::read_dir(blobs.dir()).unwrap().count(), 0);
}
