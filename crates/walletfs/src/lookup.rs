//! Case-insensitive lookup and identifier recovery.
//!
//! Paths typed by people and identifiers decoded from URLs often miss the
//! stored casing or lost their hyphens to the codec. [`CaseResolver`] finds
//! the stored entry anyway:
//!
//! - [`CaseResolver::find`]: exact match, then a walk from the namespace root
//!   matching one segment at a time ignoring case (exact-case siblings win)
//! - [`CaseResolver::resolve_identifier`]: a cheap stage on the decoded
//!   candidate path, then a structural scan comparing every entry's encoded
//!   identifier with the requested one, which recovers names containing `-`
//!
//! Store failures during the fallbacks are logged and read as "not found".
//! Only the first exact lookup reports them.

use crate::codec;
use crate::error::{Error, Result};
use crate::fs::{Metadata, MetadataStore, StoreResult};
use crate::identity::Identity;
use crate::path::CanonicalPath;

/// Outcome of looking up a path the engine may present as a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// A row from the metadata store.
    Stored(Metadata),
    /// A directory that has no row but is navigable: `/` or a path inside
    /// the identity's namespace.
    Synthesized(CanonicalPath),
}

impl Lookup {
    pub fn path(&self) -> &CanonicalPath {
        match self {
            Self::Stored(row) => &row.path,
            Self::Synthesized(path) => path,
        }
    }

    pub fn is_dir(&self) -> bool {
        match self {
            Self::Stored(row) => row.is_dir,
            Self::Synthesized(_) => true,
        }
    }
}

/// Outcome of resolving an external identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(Metadata),
    /// Several live entries encode to the same identifier.
    Ambiguous(Vec<CanonicalPath>),
}

/// Lookups against one identity's rows.
pub struct CaseResolver<'a> {
    store: &'a dyn MetadataStore,
    identity: &'a Identity,
}

impl<'a> CaseResolver<'a> {
    pub fn new(store: &'a dyn MetadataStore, identity: &'a Identity) -> Self {
        Self { store, identity }
    }

    /// Direct children of `dir`, in listing order.
    pub async fn children(&self, dir: &CanonicalPath) -> StoreResult<Vec<Metadata>> {
        let rows = self.store.list(dir, self.identity).await?;
        Ok(rows.into_iter().filter(|row| row.path.is_child_of(dir)).collect())
    }

    /// Exact lookup, then case-insensitive walk.
    pub async fn find(&self, path: &CanonicalPath) -> Result<Option<Metadata>> {
        if let Some(row) = self.store.find(path, self.identity).await? {
            return Ok(Some(row));
        }
        Ok(self.find_case_insensitive(path).await)
    }

    /// Walk `path` from the namespace root ignoring case.
    pub async fn find_case_insensitive(&self, path: &CanonicalPath) -> Option<Metadata> {
        match self.walk(path).await {
            Ok(found) => found,
            Err(e) => {
                tracing::debug!(error = %e, "case-insensitive walk failed");
                None
            }
        }
    }

    async fn walk(&self, path: &CanonicalPath) -> StoreResult<Option<Metadata>> {
        let segments: Vec<&str> = path.segments().collect();
        let Some((first, rest)) = segments.split_first() else {
            return Ok(None);
        };
        if !self.identity.matches_segment(first) {
            return Ok(None);
        }
        let mut current = self.identity.root();
        if rest.is_empty() {
            return self.store.find(&current, self.identity).await;
        }

        let mut found = None;
        for (i, segment) in rest.iter().enumerate() {
            let children = self.children(&current).await?;
            let Some(next) = pick_child(children, segment) else {
                return Ok(None);
            };
            if i + 1 < rest.len() && !next.is_dir {
                return Ok(None);
            }
            current = next.path.clone();
            found = Some(next);
        }
        Ok(found)
    }

    /// Resolve an external identifier to a stored entry.
    ///
    /// Fails with [`Error::NotFound`] when no entry matches.
    pub async fn resolve_identifier(&self, id: &str) -> Result<Resolution> {
        let candidate = codec::decode(id);

        if let Some(row) = self.store.find(&candidate, self.identity).await? {
            return Ok(Resolution::Resolved(row));
        }
        if let Some(row) = self.find_case_insensitive(&candidate).await {
            tracing::debug!("identifier resolved by case-insensitive walk");
            return Ok(Resolution::Resolved(row));
        }
        if let Some(row) = self.probe_parent(&candidate).await {
            tracing::debug!("identifier resolved from its apparent parent");
            return Ok(Resolution::Resolved(row));
        }

        let mut matches = self.structural_matches(id).await;
        match matches.len() {
            0 => Err(Error::NotFound(format!("no entry for identifier {}", id))),
            1 => Ok(Resolution::Resolved(matches.remove(0))),
            n => {
                tracing::warn!(candidates = n, "identifier is ambiguous");
                Ok(Resolution::Ambiguous(
                    matches.into_iter().map(|row| row.path).collect(),
                ))
            }
        }
    }

    /// List the candidate's apparent parent (even if that directory has no
    /// row) and match the last segment by name.
    async fn probe_parent(&self, candidate: &CanonicalPath) -> Option<Metadata> {
        let (parent, name) = (candidate.parent()?, candidate.file_name()?);
        if !self.identity.owns(&parent) {
            return None;
        }
        match self.children(&parent).await {
            Ok(children) => pick_child(children, name),
            Err(e) => {
                tracing::debug!(error = %e, "parent probe failed");
                None
            }
        }
    }

    /// Every live entry in the namespace whose identifier equals `id`,
    /// ignoring case.
    async fn structural_matches(&self, id: &str) -> Vec<Metadata> {
        let root = self.identity.root();
        let rows = match self.store.list(&root, self.identity).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(error = %e, "structural identifier scan failed");
                return Vec::new();
            }
        };
        rows.into_iter()
            .filter(|row| row.path.is_within(&root))
            .filter(|row| codec::same_identifier(&codec::encode(&row.path), id))
            .collect()
    }
}

/// Child named `segment`: exact case first, else the first case-insensitive
/// match in listing order.
fn pick_child(children: Vec<Metadata>, segment: &str) -> Option<Metadata> {
    let wanted = segment.to_lowercase();
    let mut fallback = None;
    for child in children {
        if child.name() == segment {
            return Some(child);
        }
        if fallback.is_none() && child.name().to_lowercase() == wanted {
            fallback = Some(child);
        }
    }
    fallback
}
