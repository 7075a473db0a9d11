//! Storage adapters for walletfs
//!
//! The engine talks to two external collaborators through async traits:
//! - [`MetadataStore`]: the table of entries keyed by (path, identity)
//! - [`ContentStore`]: content-addressed blobs (`put` returns the id)
//!
//! Built-in implementations:
//! - `InMemoryMetadataStore` / `InMemoryContentStore`: process-local, used
//!   by default and in tests
//! - `JsonMetadataStore` / `LocalContentStore`: persisted under a directory,
//!   used by the CLI

mod limits;
mod local;
mod memory;
mod store;

pub use limits::{
    DEFAULT_MAX_FILENAME_LENGTH, DEFAULT_MAX_PATH_DEPTH, DEFAULT_MAX_PATH_LENGTH, FsUsage,
    PathLimitExceeded, PathLimits,
};
pub use local::{JsonMetadataStore, LocalContentStore};
pub use memory::{InMemoryContentStore, InMemoryMetadataStore};
pub use store::{
    ContentId, ContentStore, Metadata, MetadataStore, StoreError, StoreResult, Timestamp,
};
