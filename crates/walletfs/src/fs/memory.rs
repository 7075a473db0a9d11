//! In-memory store adapters.
//!
//! [`InMemoryMetadataStore`] keeps the table in a `BTreeMap` keyed by
//! (identity, path). [`InMemoryContentStore`] keeps blobs by SHA-256 with a
//! reference count, so releasing one of two identical files keeps the blob.
//!
//! Every `put` takes a reference. A write that dies between `put` and the
//! metadata upsert leaves a reference no row owns, so after a retry the blob
//! outlives the last row that points at it.

// RwLock.read()/write().unwrap() only panics on lock poisoning (prior panic
// while holding lock). This is intentional - corrupted state should not propagate.
#![allow(clippy::unwrap_used)]

use async_trait::async_trait;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use super::store::{
    ContentId, ContentStore, Metadata, MetadataStore, RowKey, StoreError, StoreResult, prefix_rows,
    row_key,
};
use crate::identity::Identity;
use crate::path::CanonicalPath;

/// In-memory metadata table.
#[derive(Default)]
pub struct InMemoryMetadataStore {
    rows: RwLock<BTreeMap<RowKey, Metadata>>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows across all identities.
    pub fn len(&self) -> usize {
        self.rows.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn find(
        &self,
        path: &CanonicalPath,
        identity: &Identity,
    ) -> StoreResult<Option<Metadata>> {
        let rows = self.rows.read().unwrap();
        Ok(rows.get(&row_key(path, identity)).cloned())
    }

    async fn list(
        &self,
        prefix: &CanonicalPath,
        identity: &Identity,
    ) -> StoreResult<Vec<Metadata>> {
        let rows = self.rows.read().unwrap();
        Ok(prefix_rows(&rows, prefix, identity))
    }

    async fn upsert(&self, entry: Metadata) -> StoreResult<()> {
        let mut rows = self.rows.write().unwrap();
        rows.insert(row_key(&entry.path, &entry.identity), entry);
        Ok(())
    }

    async fn insert_new(&self, entry: Metadata) -> StoreResult<bool> {
        let mut rows = self.rows.write().unwrap();
        match rows.entry(row_key(&entry.path, &entry.identity)) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(entry);
                Ok(true)
            }
        }
    }

    async fn remove(&self, path: &CanonicalPath, identity: &Identity) -> StoreResult<()> {
        let mut rows = self.rows.write().unwrap();
        rows.remove(&row_key(path, identity));
        Ok(())
    }
}

struct Blob {
    bytes: Vec<u8>,
    refs: usize,
}

/// In-memory content-addressed blob store.
#[derive(Default)]
pub struct InMemoryContentStore {
    blobs: RwLock<HashMap<ContentId, Blob>>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct blobs held.
    pub fn blob_count(&self) -> usize {
        self.blobs.read().unwrap().len()
    }

    pub fn contains(&self, id: &ContentId) -> bool {
        self.blobs.read().unwrap().contains_key(id)
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn put(&self, bytes: &[u8]) -> StoreResult<ContentId> {
        let id = ContentId::sha256(bytes);
        let mut blobs = self.blobs.write().unwrap();
        blobs
            .entry(id.clone())
            .and_modify(|blob| blob.refs += 1)
            .or_insert_with(|| Blob {
                bytes: bytes.to_vec(),
                refs: 1,
            });
        Ok(id)
    }

    async fn get(&self, id: &ContentId) -> StoreResult<Vec<u8>> {
        let blobs = self.blobs.read().unwrap();
        blobs
            .get(id)
            .map(|blob| blob.bytes.clone())
            .ok_or_else(|| StoreError::MissingContent(id.to_string()))
    }

    async fn release(&self, id: &ContentId) -> StoreResult<()> {
        let mut blobs = self.blobs.write().unwrap();
        if let Some(blob) = blobs.get_mut(id) {
            blob.refs = blob.refs.saturating_sub(1);
            if blob.refs == 0 {
                blobs.remove(id);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> Identity {
        Identity::new("0xABC").unwrap()
    }

    fn dir(path: &str) -> Metadata {
        Metadata::directory(CanonicalPath::normalize(path), id(), 1)
    }

    fn file(path: &str) -> Metadata {
        Metadata {
            is_dir: false,
            size: 3,
            ..dir(path)
        }
    }

    #[tokio::test]
    async fn find_is_exact() {
        let store = InMemoryMetadataStore::new();
        store.upsert(dir("/0xABC/Desktop")).await.unwrap();

        let p = CanonicalPath::normalize("/0xABC/Desktop");
        assert!(store.find(&p, &id()).await.unwrap().is_some());
        let lower = CanonicalPath::normalize("/0xABC/desktop");
        assert!(store.find(&lower, &id()).await.unwrap().is_none());
        let other = Identity::new("0xDEF").unwrap();
        assert!(store.find(&p, &other).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_is_a_textual_prefix_query() {
        let store = InMemoryMetadataStore::new();
        for row in [
            file("/0xABC/Desktop/b.txt"),
            dir("/0xABC/Desktop"),
            dir("/0xABC/Desktop2"),
            dir("/0xABC/Desktop/sub"),
            file("/0xABC/Documents/x"),
        ] {
            store.upsert(row).await.unwrap();
        }

        let rows = store
            .list(&CanonicalPath::normalize("/0xABC/Desktop"), &id())
            .await
            .unwrap();
        let paths: Vec<&str> = rows.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "/0xABC/Desktop",
                "/0xABC/Desktop/sub",
                "/0xABC/Desktop2",
                "/0xABC/Desktop/b.txt"
            ]
        );
    }

    #[tokio::test]
    async fn upsert_replaces_and_remove_is_lenient() {
        let store = InMemoryMetadataStore::new();
        store.upsert(file("/0xABC/a")).await.unwrap();
        store
            .upsert(Metadata {
                size: 10,
                ..file("/0xABC/a")
            })
            .await
            .unwrap();
        assert_eq!(store.len(), 1);
        let p = CanonicalPath::normalize("/0xABC/a");
        assert_eq!(store.find(&p, &id()).await.unwrap().unwrap().size, 10);

        store.remove(&p, &id()).await.unwrap();
        store.remove(&p, &id()).await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn insert_new_never_replaces() {
        let store = InMemoryMetadataStore::new();
        assert!(store.insert_new(file("/0xABC/a")).await.unwrap());
        let bigger = Metadata {
            size: 10,
            ..file("/0xABC/a")
        };
        assert!(!store.insert_new(bigger).await.unwrap());

        let p = CanonicalPath::normalize("/0xABC/a");
        assert_eq!(store.find(&p, &id()).await.unwrap().unwrap().size, 3);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn unmatched_put_keeps_blob_alive() {
        let store = InMemoryContentStore::new();
        // Interrupted write, then its retry: two puts, one row to release.
        let id = store.put(b"bytes").await.unwrap();
        store.put(b"bytes").await.unwrap();
        store.release(&id).await.unwrap();
        assert!(store.contains(&id));
    }

    #[tokio::test]
    async fn content_is_deduplicated_and_refcounted() {
        let store = InMemoryContentStore::new();
        let a = store.put(b"same").await.unwrap();
        let b = store.put(b"same").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(store.blob_count(), 1);

        store.release(&a).await.unwrap();
        assert_eq!(store.get(&a).await.unwrap(), b"same");
        store.release(&a).await.unwrap();
        assert!(!store.contains(&a));
        assert!(matches!(
            store.get(&a).await,
            Err(StoreError::MissingContent(_))
        ));
    }
}
