//! Error types for walletfs
//!
//! Every engine operation fails with one of a small set of categories so that
//! transport layers can map them onto status codes without string matching:
//! - Human-readable messages, safe to return to the requesting client
//! - Store failures never leak through as their own type; they surface as
//!   [`Error::BackendUnavailable`]
//! - Codec and path resolution never fail, so they have no variants here

use crate::fs::{PathLimitExceeded, StoreError};
use thiserror::Error;

/// Result type alias using walletfs's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Walletfs error types.
#[derive(Error, Debug)]
pub enum Error {
    /// No live entry at the requested path or identifier.
    #[error("not found: {0}")]
    NotFound(String),

    /// The target is occupied: a file where a directory was asked for, an
    /// existing move destination, or a name differing only by case from a
    /// live sibling.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The path or name cannot be used: outside the identity's namespace,
    /// a protected directory, a reserved character, or a path limit.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// A file operation was aimed at a directory.
    #[error("is a directory: {0}")]
    IsDirectory(String),

    /// The requested byte range cannot be served for this object.
    #[error("range not satisfiable: {range} (size {size})")]
    InvalidRange { range: String, size: u64 },

    /// The metadata or content store could not complete the request.
    #[error("storage backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The identity is missing, malformed or not allowed on this node.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
}

impl Error {
    /// Create a range error for an object of `size` bytes.
    pub fn invalid_range(range: impl Into<String>, size: u64) -> Self {
        Self::InvalidRange {
            range: range.into(),
            size,
        }
    }

    /// True for [`Error::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// HTTP status a transport layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::InvalidPath(_) | Self::IsDirectory(_) => 400,
            Self::InvalidRange { .. } => 416,
            Self::BackendUnavailable(_) => 503,
            Self::Unauthorized(_) => 401,
        }
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        Self::BackendUnavailable(err.to_string())
    }
}

impl From<PathLimitExceeded> for Error {
    fn from(err: PathLimitExceeded) -> Self {
        Self::InvalidPath(err.to_string())
    }
}
