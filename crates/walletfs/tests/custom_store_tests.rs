//! Tests for custom store implementations
//!
//! These tests verify that everything needed to implement a custom
//! MetadataStore or ContentStore is exported, and that store failures reach
//! callers as BackendUnavailable.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use walletfs::{
    CanonicalPath, ContentId, ContentStore, Deleted, Error, FsEngine, Identity,
    InMemoryContentStore, InMemoryMetadataStore, Metadata, MetadataStore, RecordingNotifier,
    StoreError, StoreResult, async_trait,
};

fn me() -> Identity {
    Identity::new("0xABC").unwrap()
}

/// Metadata store whose calls can be made to fail on demand.
#[derive(Default)]
struct FlakyStore {
    inner: InMemoryMetadataStore,
    down: AtomicBool,
    fail_upsert: AtomicBool,
    fail_list_of: Mutex<Option<CanonicalPath>>,
}

impl FlakyStore {
    fn check(&self) -> StoreResult<()> {
        if self.down.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl MetadataStore for FlakyStore {
    async fn find(
        &self,
        path: &CanonicalPath,
        identity: &Identity,
    ) -> StoreResult<Option<Metadata>> {
        self.check()?;
        self.inner.find(path, identity).await
    }

    async fn list(
        &self,
        prefix: &CanonicalPath,
        identity: &Identity,
    ) -> StoreResult<Vec<Metadata>> {
        self.check()?;
        if self.fail_list_of.lock().unwrap().as_ref() == Some(prefix) {
            return Err(StoreError::Unavailable("list timed out".into()));
        }
        self.inner.list(prefix, identity).await
    }

    async fn upsert(&self, entry: Metadata) -> StoreResult<()> {
        self.check()?;
        if self.fail_upsert.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("read-only replica".into()));
        }
        self.inner.upsert(entry).await
    }

    async fn insert_new(&self, entry: Metadata) -> StoreResult<bool> {
        self.check()?;
        if self.fail_upsert.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("read-only replica".into()));
        }
        self.inner.insert_new(entry).await
    }

    async fn remove(&self, path: &CanonicalPath, identity: &Identity) -> StoreResult<()> {
        self.check()?;
        self.inner.remove(path, identity).await
    }
}

/// Metadata store that yields to the runtime before every call, so
/// concurrent engine requests interleave between their reads and writes.
#[derive(Default)]
struct YieldingStore {
    inner: InMemoryMetadataStore,
}

#[async_trait]
impl MetadataStore for YieldingStore {
    async fn find(
        &self,
        path: &CanonicalPath,
        identity: &Identity,
    ) -> StoreResult<Option<Metadata>> {
        tokio::task::yield_now().await;
        self.inner.find(path, identity).await
    }

    async fn list(
        &self,
        prefix: &CanonicalPath,
        identity: &Identity,
    ) -> StoreResult<Vec<Metadata>> {
        tokio::task::yield_now().await;
        self.inner.list(prefix, identity).await
    }

    async fn upsert(&self, entry: Metadata) -> StoreResult<()> {
        tokio::task::yield_now().await;
        self.inner.upsert(entry).await
    }

    async fn insert_new(&self, entry: Metadata) -> StoreResult<bool> {
        tokio::task::yield_now().await;
        self.inner.insert_new(entry).await
    }

    async fn remove(&self, path: &CanonicalPath, identity: &Identity) -> StoreResult<()> {
        tokio::task::yield_now().await;
        self.inner.remove(path, identity).await
    }
}

/// Content store that loses blobs and cannot release them.
#[derive(Default)]
struct LossyContent {
    inner: InMemoryContentStore,
    lose_reads: AtomicBool,
}

#[async_trait]
impl ContentStore for LossyContent {
    async fn put(&self, bytes: &[u8]) -> StoreResult<ContentId> {
        self.inner.put(bytes).await
    }

    async fn get(&self, id: &ContentId) -> StoreResult<Vec<u8>> {
        if self.lose_reads.load(Ordering::SeqCst) {
            return Err(StoreError::MissingContent(id.to_string()));
        }
        self.inner.get(id).await
    }

    async fn release(&self, _id: &ContentId) -> StoreResult<()> {
        Err(StoreError::Unavailable("gc disabled".into()))
    }
}

#[tokio::test]
async fn unreachable_store_is_backend_unavailable() {
    let store = Arc::new(FlakyStore::default());
    let engine = FsEngine::builder().metadata(store.clone()).build();
    let me = me();
    engine.write("~/a.txt", b"a", &me, None).await.unwrap();

    store.down.store(true, Ordering::SeqCst);
    let err = engine.stat("~/a.txt", &me).await.unwrap_err();
    assert!(matches!(err, Error::BackendUnavailable(_)), "got {err:?}");
    assert_eq!(err.status_code(), 503);

    let err = engine.list("~", &me).await.unwrap_err();
    assert!(matches!(err, Error::BackendUnavailable(_)), "got {err:?}");

    store.down.store(false, Ordering::SeqCst);
    assert_eq!(engine.stat("~/a.txt", &me).await.unwrap().size, 1);
}

#[tokio::test]
async fn failed_upsert_emits_no_event() {
    let store = Arc::new(FlakyStore::default());
    let notifier = Arc::new(RecordingNotifier::new());
    let engine = FsEngine::builder()
        .metadata(store.clone())
        .notifier(notifier.clone())
        .build();
    let me = me();
    engine.mkdir("~/Documents", &me).await.unwrap();
    notifier.take();

    store.fail_upsert.store(true, Ordering::SeqCst);
    let err = engine
        .write("~/Documents/a.txt", b"a", &me, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::BackendUnavailable(_)), "got {err:?}");
    assert!(notifier.take().is_empty());

    store.fail_upsert.store(false, Ordering::SeqCst);
    let written = engine
        .write("~/Documents/a.txt", b"a", &me, None)
        .await
        .unwrap();
    assert!(written.created);
}

#[tokio::test]
async fn failed_emptiness_probe_reads_as_empty() {
    let store = Arc::new(FlakyStore::default());
    let engine = FsEngine::builder().metadata(store.clone()).build();
    let me = me();
    engine
        .write("~/Projects/a.txt", b"a", &me, None)
        .await
        .unwrap();

    *store.fail_list_of.lock().unwrap() = Some(CanonicalPath::normalize("/0xABC/Projects"));
    let listing = engine.list("~", &me).await.unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].name, "Projects");
    assert!(listing[0].is_empty);
}

#[tokio::test]
async fn lost_blob_is_backend_unavailable() {
    let content = Arc::new(LossyContent::default());
    let engine = FsEngine::builder().content(content.clone()).build();
    let me = me();
    engine.write("~/a.txt", b"a", &me, None).await.unwrap();

    content.lose_reads.store(true, Ordering::SeqCst);
    let err = engine.read("~/a.txt", &me, None).await.unwrap_err();
    assert!(matches!(err, Error::BackendUnavailable(_)), "got {err:?}");
}

#[tokio::test]
async fn failed_release_does_not_fail_overwrite() {
    let content = Arc::new(LossyContent::default());
    let engine = FsEngine::builder().content(content.clone()).build();
    let me = me();
    engine.write("~/a.txt", b"one", &me, None).await.unwrap();
    let written = engine.write("~/a.txt", b"two", &me, None).await.unwrap();
    assert_eq!(written.entry.size, 3);
    assert_eq!(engine.read("~/a.txt", &me, None).await.unwrap().bytes, b"two");
}

#[tokio::test]
async fn rows_without_committed_content() {
    let metadata = Arc::new(InMemoryMetadataStore::new());
    let engine = FsEngine::builder().metadata(metadata.clone()).build();
    let me = me();

    let now = 1_700_000_000_000;
    let pending = Metadata {
        is_dir: false,
        size: 10,
        ..Metadata::directory(CanonicalPath::normalize("/0xABC/pending.bin"), me.clone(), now)
    };
    let empty = Metadata {
        is_dir: false,
        ..Metadata::directory(CanonicalPath::normalize("/0xABC/empty.txt"), me.clone(), now)
    };
    metadata.upsert(pending).await.unwrap();
    metadata.upsert(empty).await.unwrap();

    let err = engine.read("~/pending.bin", &me, None).await.unwrap_err();
    assert!(matches!(err, Error::BackendUnavailable(_)), "got {err:?}");

    let read = engine.read("~/empty.txt", &me, None).await.unwrap();
    assert!(read.bytes.is_empty());
    assert_eq!(read.media_type, "text/plain");
}

// =============================================================================
// Overlapping requests
// =============================================================================

#[tokio::test]
async fn overlapping_deletes_of_same_named_files_keep_both() {
    let engine = FsEngine::builder()
        .metadata(Arc::new(YieldingStore::default()))
        .build();
    let me = me();
    engine
        .write("~/Desktop/notes.txt", b"desk", &me, None)
        .await
        .unwrap();
    engine
        .write("~/Documents/notes.txt", b"docs", &me, None)
        .await
        .unwrap();

    let (a, b) = tokio::join!(
        engine.delete("~/Desktop/notes.txt", &me),
        engine.delete("~/Documents/notes.txt", &me)
    );
    assert!(matches!(a.unwrap(), Deleted::Trashed(_)));
    assert!(matches!(b.unwrap(), Deleted::Trashed(_)));

    let trash = engine.list("~/Trash", &me).await.unwrap();
    assert_eq!(trash.len(), 2, "{trash:?}");
    assert!(trash.iter().any(|e| e.name == "notes.txt"));

    let mut contents = Vec::new();
    for entry in &trash {
        let read = engine.read(entry.path.as_str(), &me, None).await.unwrap();
        contents.push(read.bytes);
    }
    contents.sort();
    assert_eq!(contents, vec![b"desk".to_vec(), b"docs".to_vec()]);
}

#[tokio::test]
async fn overlapping_renames_to_one_name_conflict() {
    let engine = FsEngine::builder()
        .metadata(Arc::new(YieldingStore::default()))
        .build();
    let me = me();
    engine.write("~/a.txt", b"a", &me, None).await.unwrap();
    engine.write("~/b.txt", b"b", &me, None).await.unwrap();

    let (a, b) = tokio::join!(
        engine.rename("~/a.txt", "c.txt", &me),
        engine.rename("~/b.txt", "c.txt", &me)
    );
    let (won, lost) = match (a, b) {
        (Ok(won), Err(lost)) | (Err(lost), Ok(won)) => (won, lost),
        other => panic!("expected one winner, got {other:?}"),
    };
    assert!(matches!(lost, Error::Conflict(_)), "got {lost:?}");

    let kept = engine.read("~/c.txt", &me, None).await.unwrap().bytes;
    let loser = if won.from.as_str() == "/0xABC/a.txt" {
        assert_eq!(kept, b"a");
        "~/b.txt"
    } else {
        assert_eq!(kept, b"b");
        "~/a.txt"
    };
    assert!(engine.stat(loser, &me).await.is_ok());
}
