use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;

use dog_attach::{
    AttachConfig, AttachError, Attacher, Backend, ByteStream, FileId, FileSystemBackend,
    FileUpload, MemoryUpload,
};

async fn read_all(mut stream: ByteStream) -> Vec<u8> {
    let mut out = Vec::new();
    while let Some(chunk) = stream.next().await {
        out.extend_from_slice(&chunk.expect("stream chunk"));
    }
    out
}

/// A1. Uploaded Bytes Round-Trip Exactly
#[tokio::test]
async fn test_upload_round_trips_exactly() {
    let root = tempfile::tempdir().unwrap();
    let backend = FileSystemBackend::new(root.path());

    let mut source = MemoryUpload::new(&b"hello world"[..]);
    let id = backend.upload(&mut source).await.unwrap();

    let data = read_all(backend.get(&id).await.unwrap()).await;
    assert_eq!(data, b"hello world");
    assert_eq!(backend.size(&id).await.unwrap(), 11);
    assert!(backend.exists(&id).await.unwrap());
}

/// A2. Absent Ids Fail With NotFound
#[tokio::test]
async fn test_absent_ids_are_not_found() {
    let root = tempfile::tempdir().unwrap();
    let backend = FileSystemBackend::new(root.path());
    let missing = FileId::from_string("missing".to_string());

    assert!(matches!(
        backend.get(&missing).await,
        Err(AttachError::NotFound { .. })
    ));
    assert!(matches!(
        backend.size(&missing).await.unwrap_err(),
        AttachError::NotFound { .. }
    ));
    assert!(!backend.exists(&missing).await.unwrap());
}

/// A3. Delete Is Idempotent
#[tokio::test]
async fn test_delete_is_idempotent() {
    let root = tempfile::tempdir().unwrap();
    let backend = FileSystemBackend::new(root.path());

    let mut source = MemoryUpload::new(&b"hello"[..]);
    let id = backend.upload(&mut source).await.unwrap();

    backend.delete(&id).await.unwrap();
    assert!(!backend.exists(&id).await.unwrap());
    backend.delete(&id).await.unwrap();
}

/// A4. Uploads Leave No Scratch Files Behind
#[tokio::test]
async fn test_uploads_leave_no_scratch_files() {
    let root = tempfile::tempdir().unwrap();
    let backend = FileSystemBackend::new(root.path());

    let mut source = MemoryUpload::new(&b"hello"[..]);
    backend.upload(&mut source).await.unwrap();

    let mut leftovers = std::fs::read_dir(root.path().join("tmp")).unwrap();
    assert!(leftovers.next().is_none(), "scratch area must be empty");
}

/// A5. Local Tiers Issue No Presigned Urls
#[tokio::test]
async fn test_fs_backend_has_no_presigned_urls() {
    let root = tempfile::tempdir().unwrap();
    let backend = FileSystemBackend::new(root.path());

    let mut source = MemoryUpload::new(&b"hello"[..]);
    let id = backend.upload(&mut source).await.unwrap();

    let url = backend
        .presigned_url(&id, Duration::from_secs(3600))
        .await
        .unwrap();
    assert_eq!(url, None);
}

/// B1. File Uploads Flow Through The Whole Lifecycle
#[tokio::test]
async fn test_file_upload_lifecycle_on_disk() {
    let uploads = tempfile::tempdir().unwrap();
    let upload_path = uploads.path().join("report.pdf");
    tokio::fs::write(&upload_path, b"%PDF-1.4 pretend")
        .await
        .unwrap();

    let cache_root = tempfile::tempdir().unwrap();
    let store_root = tempfile::tempdir().unwrap();
    let cache = FileSystemBackend::new(cache_root.path());
    let store = FileSystemBackend::new(store_root.path());

    let mut attacher = Attacher::new(
        "report",
        Arc::new(cache),
        Arc::new(store),
        AttachConfig::new(),
    );

    let source = FileUpload::open(&upload_path).await.unwrap();
    let cached = attacher.accept(source).await.unwrap();
    assert_eq!(cached.filename.as_deref(), Some("report.pdf"));
    assert_eq!(cached.content_type.as_deref(), Some("application/pdf"));
    assert_eq!(cached.size, 16);

    let stored = attacher.promote().await.unwrap();
    assert!(attacher.state().is_stored());
    assert!(!cache_root.path().join(cached.id.as_str()).exists());

    let store = FileSystemBackend::new(store_root.path());
    let data = read_all(store.get(&stored.id).await.unwrap()).await;
    assert_eq!(data, b"%PDF-1.4 pretend");
}
