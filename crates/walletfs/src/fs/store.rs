//! Store adapter traits.
//!
//! # Query contract
//!
//! [`MetadataStore`] is deliberately thin:
//!
//! | Operation | Contract |
//! |-----------|----------|
//! | `find` | exact match on (path, identity), case-sensitive |
//! | `list` | every entry whose path starts with the prefix, directories first, then by path |
//! | `upsert` | insert or replace the row for (path, identity) |
//! | `insert_new` | insert only if no row exists for (path, identity); atomic |
//! | `remove` | delete the row; absent rows are not an error |
//!
//! `list` is a plain prefix query (`LIKE 'prefix%'` in SQL). It returns the
//! prefix entry itself, all descendants and textual siblings such as
//! `Desktop2` for `Desktop`; the engine filters.
//!
//! `insert_new` is the one conditional write (`INSERT ... ON CONFLICT DO
//! NOTHING` in SQL). The engine claims every move and Trash destination with
//! it.
//!
//! [`ContentStore`] is content-addressed: `put` of the same bytes yields the
//! same [`ContentId`], so a retried write does not duplicate data.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::identity::Identity;
use crate::path::CanonicalPath;

/// Unix time in milliseconds.
pub type Timestamp = i64;

/// Result type for store adapters.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors reported by store adapters.
///
/// The engine converts all of them into
/// [`Error::BackendUnavailable`](crate::Error::BackendUnavailable).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store cannot be reached or refused the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A content id has no blob behind it.
    #[error("content missing: {0}")]
    MissingContent(String),

    /// Persisted state could not be decoded.
    #[error("store corrupted: {0}")]
    Corrupt(String),

    /// I/O error from a local store.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Identifier of a blob in the content store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Content id derived from the SHA-256 of `bytes`.
    pub fn sha256(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
        Self(format!("sha256-{hex}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One row of the metadata table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub path: CanonicalPath,
    pub identity: Identity,
    /// Present only for files with committed bytes.
    pub content_ref: Option<ContentId>,
    /// Byte length; 0 for directories.
    pub size: u64,
    pub media_type: Option<String>,
    pub is_dir: bool,
    pub is_public: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Metadata {
    /// A fresh directory row.
    pub fn directory(path: CanonicalPath, identity: Identity, now: Timestamp) -> Self {
        Self {
            path,
            identity,
            content_ref: None,
            size: 0,
            media_type: None,
            is_dir: true,
            is_public: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Base name of the entry.
    pub fn name(&self) -> &str {
        self.path.file_name().unwrap_or_default()
    }
}

/// Table of entries keyed by (canonical path, identity).
///
/// Implement this to put the filesystem on top of an existing database.
/// Implementations must be safe to call concurrently; the engine keeps no
/// state of its own between calls.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Exact, case-sensitive lookup.
    async fn find(&self, path: &CanonicalPath, identity: &Identity)
    -> StoreResult<Option<Metadata>>;

    /// All entries whose path starts with `prefix`, directories first, then
    /// ascending by path.
    async fn list(&self, prefix: &CanonicalPath, identity: &Identity)
    -> StoreResult<Vec<Metadata>>;

    /// Insert or replace the row for (`entry.path`, `entry.identity`).
    async fn upsert(&self, entry: Metadata) -> StoreResult<()>;

    /// Insert `entry` only if (`entry.path`, `entry.identity`) has no row.
    ///
    /// Returns `false`, leaving the existing row untouched, when it does.
    /// The check and the insert must be a single atomic step.
    async fn insert_new(&self, entry: Metadata) -> StoreResult<bool>;

    /// Delete the row for (path, identity). Missing rows are ignored.
    async fn remove(&self, path: &CanonicalPath, identity: &Identity) -> StoreResult<()>;
}

/// Content-addressed blob storage.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store `bytes`, returning their content id.
    async fn put(&self, bytes: &[u8]) -> StoreResult<ContentId>;

    /// Fetch the bytes behind `id`.
    async fn get(&self, id: &ContentId) -> StoreResult<Vec<u8>>;

    /// Drop one reference to `id`. Stores without garbage collection can
    /// keep the default no-op.
    async fn release(&self, _id: &ContentId) -> StoreResult<()> {
        Ok(())
    }
}

/// Map key used by the built-in metadata stores: (identity, path).
pub(crate) type RowKey = (String, String);

pub(crate) fn row_key(path: &CanonicalPath, identity: &Identity) -> RowKey {
    (identity.as_str().to_string(), path.as_str().to_string())
}

/// Rows of `identity` whose path starts with `prefix`, in listing order.
pub(crate) fn prefix_rows(
    rows: &std::collections::BTreeMap<RowKey, Metadata>,
    prefix: &CanonicalPath,
    identity: &Identity,
) -> Vec<Metadata> {
    let mut found: Vec<Metadata> = rows
        .range(row_key(prefix, identity)..)
        .take_while(|((owner, path), _)| {
            owner == identity.as_str() && path.starts_with(prefix.as_str())
        })
        .map(|(_, row)| row.clone())
        .collect();
    sort_listing(&mut found);
    found
}

/// Order rows the way `MetadataStore::list` promises.
pub(crate) fn sort_listing(entries: &mut [Metadata]) {
    entries.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.path.cmp(&b.path)));
}
