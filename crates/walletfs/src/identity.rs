//! Wallet identities and the namespaces they root.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::path::CanonicalPath;

/// Name of the per-identity trash directory.
pub const TRASH_DIR: &str = "Trash";

/// Name of the per-identity desktop directory.
pub const DESKTOP_DIR: &str = "Desktop";

/// Strings a broken client sends in place of an identity.
const PLACEHOLDERS: &[&str] = &["null", "undefined"];

/// An opaque identity (wallet address) rooting the namespace `/{identity}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    /// Validate and wrap an identity.
    ///
    /// Fails with [`Error::Unauthorized`] for empty strings, placeholder
    /// values, or anything that could not be a single path segment.
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::Unauthorized("missing identity".into()));
        }
        if PLACEHOLDERS.iter().any(|p| trimmed.eq_ignore_ascii_case(p)) {
            return Err(Error::Unauthorized(format!(
                "placeholder identity '{trimmed}'"
            )));
        }
        if trimmed == "." || trimmed == ".." || trimmed == "~" {
            return Err(Error::Unauthorized("malformed identity".into()));
        }
        if trimmed
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_control() || c.is_whitespace())
        {
            return Err(Error::Unauthorized("malformed identity".into()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `/{identity}`
    pub fn root(&self) -> CanonicalPath {
        CanonicalPath::root().join(&self.0)
    }

    /// `/{identity}/Trash`
    pub fn trash(&self) -> CanonicalPath {
        self.root().join(TRASH_DIR)
    }

    /// `/{identity}/Desktop`
    pub fn desktop(&self) -> CanonicalPath {
        self.root().join(DESKTOP_DIR)
    }

    /// True when `segment` names this identity, ignoring ASCII case.
    pub fn matches_segment(&self, segment: &str) -> bool {
        self.0.eq_ignore_ascii_case(segment)
    }

    /// True when `path` is the identity root or lies below it.
    pub fn owns(&self, path: &CanonicalPath) -> bool {
        path.is_within(&self.root())
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Identity {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Identity> for String {
    fn from(id: Identity) -> Self {
        id.0
    }
}

impl std::str::FromStr for Identity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}
