//! Delete and Trash.
//!
//! Deleting outside `/{identity}/Trash` moves the entry into Trash; deleting
//! inside it removes the entry and its subtree for good. Names inside Trash
//! never collide: an incoming entry whose name is taken gets ` ({unix-ms})`
//! inserted before its extension.

use serde::Serialize;
use std::collections::HashSet;

use super::FsEngine;
use super::mutate::Moved;
use super::read::Stat;
use crate::error::{Error, Result};
use crate::events::FsEvent;
use crate::fs::{ContentId, Metadata};
use crate::identity::Identity;
use crate::path::CanonicalPath;

/// Claims of a Trash name before giving up on a contended folder.
const TRASH_CLAIM_ATTEMPTS: usize = 16;

/// Result of [`FsEngine::delete`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Deleted {
    /// Moved into Trash; recoverable by moving it back out.
    Trashed(Moved),
    /// Removed permanently, `removed` rows including descendants.
    Purged { path: CanonicalPath, removed: usize },
}

impl FsEngine {
    /// Delete the entry at `raw`.
    ///
    /// `/`, the identity root and the Trash directory itself are protected.
    pub async fn delete(&self, raw: &str, identity: &Identity) -> Result<Deleted> {
        self.authorize(identity)?;
        if !crate::codec::is_identifier(raw) {
            self.check_movable(&self.resolve_path(raw, identity), identity)?;
        }
        let row = self.locate_stored(raw, identity).await?;
        self.check_movable(&row.path, identity)?;

        if row.path.is_strictly_within(&identity.trash()) {
            let path = row.path.clone();
            let removed = self.purge(row, identity).await?;
            return Ok(Deleted::Purged { path, removed });
        }
        Ok(Deleted::Trashed(self.trash_entry(row, identity).await?))
    }

    /// Move the entry at `raw` to `/{identity}/Trash/{basename}`.
    pub async fn move_to_trash(&self, raw: &str, identity: &Identity) -> Result<Moved> {
        self.authorize(identity)?;
        let row = self.locate_stored(raw, identity).await?;
        self.check_movable(&row.path, identity)?;
        if row.path.is_within(&identity.trash()) {
            return Err(Error::InvalidPath(format!(
                "already in Trash: {}",
                self.config.log.path(&row.path, identity)
            )));
        }
        self.trash_entry(row, identity).await
    }

    async fn trash_entry(&self, row: Metadata, identity: &Identity) -> Result<Moved> {
        self.trash_into(row, &identity.trash(), identity).await
    }

    /// Move `row` into `dir` (Trash or a folder below it) under a free name.
    ///
    /// The name is picked from a listing, then claimed. Losing the claim to
    /// an overlapping request re-reads the listing and picks again.
    pub(super) async fn trash_into(
        &self,
        row: Metadata,
        dir: &CanonicalPath,
        identity: &Identity,
    ) -> Result<Moved> {
        self.ensure_dir_chain(dir, identity).await?;
        let mut moved = None;
        for _ in 0..TRASH_CLAIM_ATTEMPTS {
            let name = self.trash_name(dir, row.name(), identity).await?;
            moved = self.relocate(&row, &dir.join(&name), identity).await?;
            if moved.is_some() {
                break;
            }
            tracing::debug!(name = %self.config.log.value(&name), "trash name taken, retrying");
        }
        let Some(moved) = moved else {
            return Err(Error::Conflict(format!(
                "no free name in {} after {} attempts",
                self.config.log.path(dir, identity),
                TRASH_CLAIM_ATTEMPTS
            )));
        };

        tracing::info!(
            from = %self.config.log.path(&row.path, identity),
            to = %self.config.log.path(&moved.path, identity),
            "moved to trash"
        );
        self.notify(identity, FsEvent::removed(&row.path)).await;
        self.notify(identity, FsEvent::added(&moved)).await;
        Ok(Moved {
            from: row.path,
            entry: Stat::from_row(&moved),
        })
    }

    /// Free name for `basename` inside `dir`, compared ignoring case.
    async fn trash_name(
        &self,
        dir: &CanonicalPath,
        basename: &str,
        identity: &Identity,
    ) -> Result<String> {
        let taken: HashSet<String> = self
            .cases(identity)
            .children(dir)
            .await?
            .iter()
            .map(|row| row.name().to_lowercase())
            .collect();
        if !taken.contains(&basename.to_lowercase()) {
            return Ok(basename.to_string());
        }

        let (stem, ext) = split_extension(basename);
        let mut stamp = Self::now();
        loop {
            let candidate = format!("{} ({}){}", stem, stamp, ext);
            if !taken.contains(&candidate.to_lowercase()) {
                tracing::debug!(
                    name = %self.config.log.value(&candidate),
                    "trash name disambiguated"
                );
                return Ok(candidate);
            }
            stamp += 1;
        }
    }

    /// Remove `row` and everything below it. Returns the number of rows
    /// removed.
    async fn purge(&self, row: Metadata, identity: &Identity) -> Result<usize> {
        let mut doomed: Vec<Metadata> = if row.is_dir {
            self.metadata
                .list(&row.path, identity)
                .await?
                .into_iter()
                .filter(|child| child.path.is_strictly_within(&row.path))
                .collect()
        } else {
            Vec::new()
        };
        doomed.sort_by_key(|child| std::cmp::Reverse(child.path.depth()));
        doomed.push(row);

        for entry in &doomed {
            self.metadata.remove(&entry.path, identity).await?;
            if let Some(id) = &entry.content_ref {
                self.release_content(id).await;
            }
        }

        let Some(target) = doomed.last() else {
            return Ok(0);
        };
        tracing::info!(
            path = %self.config.log.path(&target.path, identity),
            removed = doomed.len(),
            "purged"
        );
        self.notify(identity, FsEvent::removed(&target.path)).await;
        Ok(doomed.len())
    }

    /// Drop a content reference. Failures only cost storage, so they are
    /// logged and swallowed.
    pub(super) async fn release_content(&self, id: &ContentId) {
        if let Err(e) = self.content.release(id).await {
            tracing::warn!(content = %id, error = %e, "content release failed");
        }
    }
}

/// Split `name` before its last `.`, unless the dot leads the name.
///
/// `report.final.pdf` → (`report.final`, `.pdf`); `.bashrc` → (`.bashrc`, ``).
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}
