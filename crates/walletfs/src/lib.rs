//! Walletfs - per-wallet hierarchical filesystem over content-addressed storage
//!
//! Every wallet identity owns the namespace `/{identity}`. Entries are rows in
//! a metadata store keyed by `(path, identity)`; file bytes live in a
//! content-addressed store and rows carry the returned content id. Clients
//! address entries either by path (`~/Desktop/notes.txt`, `Desktop/notes.txt`,
//! `/0xabc/desktop/NOTES.txt`) or by the path-derived identifier
//! `uuid--0xABC-Desktop-notes.txt`.
//!
//! # Example
//!
//! ```rust
//! use walletfs::{Deleted, FsEngine, Identity};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let engine = FsEngine::new();
//!     let me = Identity::new("0xABC")?;
//!
//!     engine.write("/0xABC/Desktop/notes.txt", b"hi", &me, None).await?;
//!     let read = engine.read("uuid--0xABC-Desktop-notes.txt", &me, None).await?;
//!     assert_eq!(read.bytes, b"hi");
//!
//!     let deleted = engine.delete("~/Desktop/notes.txt", &me).await?;
//!     assert!(matches!(deleted, Deleted::Trashed(_)));
//!     assert!(engine.stat("~/Desktop/notes.txt", &me).await.is_err());
//!     Ok(())
//! }
//! ```
//!
//! # Custom stores
//!
//! Storage is injected through [`MetadataStore`] and [`ContentStore`]. The
//! defaults are in-memory; [`JsonMetadataStore`] and [`LocalContentStore`]
//! persist under a directory.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use walletfs::{FsEngine, JsonMetadataStore, LocalContentStore};
//!
//! # async fn open() -> walletfs::Result<()> {
//! let engine = FsEngine::builder()
//!     .metadata(Arc::new(JsonMetadataStore::open("/var/lib/walletfs/metadata.json").await?))
//!     .content(Arc::new(LocalContentStore::open("/var/lib/walletfs/blobs").await?))
//!     .build();
//! # let _ = engine;
//! # Ok(())
//! # }
//! ```

pub mod codec;
mod config;
mod engine;
mod error;
mod events;
mod fs;
mod identity;
mod logging_impl;
mod lookup;
pub mod media;
mod path;
mod range;
mod resolver;

pub use async_trait::async_trait;
pub use config::{EngineConfig, OwnerPolicy};
pub use engine::{
    Deleted, FsEngine, FsEngineBuilder, ListEntry, Locator, Moved, ReadOutput, Stat, Written,
};
pub use error::{Error, Result};
pub use events::{
    BroadcastNotifier, EventItem, EventNotifier, FsEvent, NullNotifier, RecordingNotifier,
    ScopedEvent, iso8601,
};
pub use fs::{
    ContentId, ContentStore, DEFAULT_MAX_FILENAME_LENGTH, DEFAULT_MAX_PATH_DEPTH,
    DEFAULT_MAX_PATH_LENGTH, FsUsage, InMemoryContentStore, InMemoryMetadataStore,
    JsonMetadataStore, LocalContentStore, Metadata, MetadataStore, PathLimitExceeded, PathLimits,
    StoreError, StoreResult, Timestamp,
};
pub use identity::{DESKTOP_DIR, Identity, TRASH_DIR};
pub use logging_impl::{LogConfig, sanitize_for_log};
pub use lookup::{CaseResolver, Lookup, Resolution};
pub use path::CanonicalPath;
pub use range::ByteRange;
pub use resolver::{PathResolver, ResolveRules};
