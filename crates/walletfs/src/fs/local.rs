//! Persistent store adapters on the local disk.
//!
//! Layout under a node's data directory:
//!
//! ```text
//! <root>/
//! ├── metadata.json          JsonMetadataStore
//! └── blobs/
//!     └── ab/
//!         └── sha256-ab12…   LocalContentStore, one file per blob
//! ```
//!
//! Both write through a temporary file and rename it into place, so a crash
//! mid-write leaves the previous state readable.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

use super::store::{
    ContentId, ContentStore, Metadata, MetadataStore, RowKey, StoreError, StoreResult, prefix_rows,
    row_key,
};
use crate::identity::Identity;
use crate::path::CanonicalPath;

/// Blob store keeping one file per SHA-256 content id.
///
/// Blobs are never deleted: `release` keeps the default no-op, since several
/// metadata rows may share a blob and this store cannot see them.
pub struct LocalContentStore {
    root: PathBuf,
}

impl LocalContentStore {
    /// Open (creating if needed) a blob directory.
    pub async fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, id: &ContentId) -> StoreResult<PathBuf> {
        let hex = id
            .as_str()
            .strip_prefix("sha256-")
            .filter(|h| h.len() == 64 && h.chars().all(|c| c.is_ascii_hexdigit()))
            .ok_or_else(|| StoreError::MissingContent(id.to_string()))?;
        Ok(self.root.join(&hex[..2]).join(id.as_str()))
    }
}

#[async_trait]
impl ContentStore for LocalContentStore {
    async fn put(&self, bytes: &[u8]) -> StoreResult<ContentId> {
        let id = ContentId::sha256(bytes);
        let path = self.blob_path(&id)?;
        if tokio::fs::try_exists(&path).await? {
            return Ok(id);
        }
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        write_atomic(&path, bytes).await?;
        Ok(id)
    }

    async fn get(&self, id: &ContentId) -> StoreResult<Vec<u8>> {
        let path = self.blob_path(id)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::MissingContent(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Metadata table persisted as a JSON array of rows.
///
/// The whole table is held in memory and rewritten on every mutation, which
/// suits a single-node personal store.
pub struct JsonMetadataStore {
    file: PathBuf,
    rows: RwLock<BTreeMap<RowKey, Metadata>>,
}

impl JsonMetadataStore {
    /// Load `file`, or start empty if it does not exist yet.
    pub async fn open(file: impl Into<PathBuf>) -> StoreResult<Self> {
        let file = file.into();
        let rows = match tokio::fs::read(&file).await {
            Ok(bytes) => {
                let list: Vec<Metadata> = serde_json::from_slice(&bytes)
                    .map_err(|e| StoreError::Corrupt(format!("{}: {}", file.display(), e)))?;
                list.into_iter()
                    .map(|row| (row_key(&row.path, &row.identity), row))
                    .collect()
            }
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            file,
            rows: RwLock::new(rows),
        })
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    async fn persist(&self, rows: &BTreeMap<RowKey, Metadata>) -> StoreResult<()> {
        let list: Vec<&Metadata> = rows.values().collect();
        let json = serde_json::to_vec_pretty(&list)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        if let Some(dir) = self.file.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        write_atomic(&self.file, &json).await
    }
}

#[async_trait]
impl MetadataStore for JsonMetadataStore {
    async fn find(
        &self,
        path: &CanonicalPath,
        identity: &Identity,
    ) -> StoreResult<Option<Metadata>> {
        let rows = self.rows.read().await;
        Ok(rows.get(&row_key(path, identity)).cloned())
    }

    async fn list(
        &self,
        prefix: &CanonicalPath,
        identity: &Identity,
    ) -> StoreResult<Vec<Metadata>> {
        let rows = self.rows.read().await;
        Ok(prefix_rows(&rows, prefix, identity))
    }

    async fn upsert(&self, entry: Metadata) -> StoreResult<()> {
        // Writers hold the lock across persist so the file matches memory.
        let mut rows = self.rows.write().await;
        let key = row_key(&entry.path, &entry.identity);
        let previous = rows.insert(key.clone(), entry);
        if let Err(e) = self.persist(&rows).await {
            match previous {
                Some(row) => rows.insert(key, row),
                None => rows.remove(&key),
            };
            return Err(e);
        }
        Ok(())
    }

    async fn insert_new(&self, entry: Metadata) -> StoreResult<bool> {
        let mut rows = self.rows.write().await;
        let key = row_key(&entry.path, &entry.identity);
        if rows.contains_key(&key) {
            return Ok(false);
        }
        rows.insert(key.clone(), entry);
        if let Err(e) = self.persist(&rows).await {
            rows.remove(&key);
            return Err(e);
        }
        Ok(true)
    }

    async fn remove(&self, path: &CanonicalPath, identity: &Identity) -> StoreResult<()> {
        let mut rows = self.rows.write().await;
        let key = row_key(path, identity);
        let Some(previous) = rows.remove(&key) else {
            return Ok(());
        };
        if let Err(e) = self.persist(&rows).await {
            rows.insert(key, previous);
            return Err(e);
        }
        Ok(())
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".partial");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
