//! Write side: write, mkdir, move, rename.

use serde::Serialize;

use super::FsEngine;
use super::read::Stat;
use crate::codec;
use crate::error::{Error, Result};
use crate::events::FsEvent;
use crate::fs::Metadata;
use crate::identity::Identity;
use crate::lookup::Lookup;
use crate::media::guess_media_type;
use crate::path::CanonicalPath;

#[cfg(feature = "failpoints")]
use fail::fail_point;

/// Result of write and mkdir.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Written {
    pub entry: Stat,
    /// False when the entry already existed (overwrite, or mkdir no-op).
    pub created: bool,
}

/// Result of move, rename and move-to-trash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Moved {
    pub from: CanonicalPath,
    pub entry: Stat,
}

/// Where a move lands, before the final name is known.
enum Destination {
    /// Into this directory, keeping (or replacing) the basename.
    Into(CanonicalPath),
    /// Exactly this path.
    At(CanonicalPath),
}

impl FsEngine {
    /// Store `bytes` at `raw`, creating or overwriting a file.
    ///
    /// Missing parent directories are created. `media_type` wins over the
    /// extension table when given.
    pub async fn write(
        &self,
        raw: &str,
        bytes: &[u8],
        identity: &Identity,
        media_type: Option<&str>,
    ) -> Result<Written> {
        self.authorize(identity)?;
        let path = self.target_path(raw, identity).await?;
        self.check_creatable(&path, identity)?;
        if path == identity.root() {
            return Err(Error::IsDirectory(path.to_string()));
        }

        let existing = self.metadata.find(&path, identity).await?;
        match &existing {
            Some(row) if row.is_dir => return Err(Error::IsDirectory(path.to_string())),
            Some(_) => {}
            None => self.check_case_unique(&path, identity, None).await?,
        }
        if let Some(parent) = path.parent() {
            self.ensure_dir_chain(&parent, identity).await?;
        }

        let content_ref = self.content.put(bytes).await?;

        #[cfg(feature = "failpoints")]
        fail_point!("engine::write::after_put", |_| {
            Err(Error::BackendUnavailable(
                "metadata store went away after content put".into(),
            ))
        });

        let now = Self::now();
        let media_type = media_type
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .or_else(|| guess_media_type(path.file_name().unwrap_or_default()).map(str::to_string))
            .or_else(|| existing.as_ref().and_then(|row| row.media_type.clone()));
        let row = Metadata {
            path: path.clone(),
            identity: identity.clone(),
            content_ref: Some(content_ref),
            size: bytes.len() as u64,
            media_type,
            is_dir: false,
            is_public: existing.as_ref().is_some_and(|row| row.is_public),
            created_at: existing.as_ref().map_or(now, |row| row.created_at),
            updated_at: existing.as_ref().map_or(now, |row| row.updated_at.max(now)),
        };
        self.metadata.upsert(row.clone()).await?;

        if let Some(old) = existing.as_ref().and_then(|row| row.content_ref.as_ref()) {
            self.release_content(old).await;
        }

        let created = existing.is_none();
        tracing::info!(
            path = %self.config.log.path(&path, identity),
            size = row.size,
            created,
            "write"
        );
        let event = if created {
            FsEvent::added(&row)
        } else {
            FsEvent::updated(&row)
        };
        self.notify(identity, event).await;

        Ok(Written {
            entry: Stat::from_row(&row),
            created,
        })
    }

    /// Create the directory at `raw` and any missing ancestors.
    ///
    /// An existing directory is returned unchanged with no event; an existing
    /// file is Conflict.
    pub async fn mkdir(&self, raw: &str, identity: &Identity) -> Result<Written> {
        self.authorize(identity)?;
        let path = self.target_path(raw, identity).await?;
        self.check_creatable(&path, identity)?;

        if let Some(row) = self.metadata.find(&path, identity).await? {
            if row.is_dir {
                return Ok(Written {
                    entry: Stat::from_row(&row),
                    created: false,
                });
            }
            return Err(Error::Conflict(format!("path exists as a file: {}", path)));
        }

        self.ensure_dir_chain(&path, identity).await?;
        let row = self
            .metadata
            .find(&path, identity)
            .await?
            .ok_or_else(|| Error::BackendUnavailable(format!("directory vanished: {}", path)))?;
        tracing::info!(path = %self.config.log.path(&path, identity), "mkdir");
        Ok(Written {
            entry: Stat::from_row(&row),
            created: true,
        })
    }

    /// Move the entry at `from` to `to`.
    ///
    /// An existing directory at `to`, or a `to` ending in `/`, receives the
    /// entry under its basename (or `new_name`); otherwise `to` is the full new
    /// path. Destinations inside Trash keep the original basename and
    /// disambiguate collisions; anywhere else an occupied destination is
    /// Conflict.
    pub async fn move_entry(
        &self,
        from: &str,
        to: &str,
        identity: &Identity,
        new_name: Option<&str>,
    ) -> Result<Moved> {
        self.authorize(identity)?;
        let new_name = self.explicit_name(new_name)?;

        // Resolve the source path textually first: the destination check
        // below must run even when the source is already gone.
        let source = match self.locate(from, identity).await {
            Ok(Lookup::Stored(row)) => Some(row),
            Ok(Lookup::Synthesized(_)) | Err(Error::NotFound(_)) => None,
            Err(e) => return Err(e),
        };
        let source_path = match &source {
            Some(row) => row.path.clone(),
            None if codec::is_identifier(from) => {
                return Err(Error::NotFound(self.config.log.value(from)));
            }
            None => self.resolve_path(from, identity),
        };
        self.check_movable(&source_path, identity)?;
        let basename = source_path
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| Error::InvalidPath("cannot move /".into()))?;

        let destination = self.destination(to, identity).await?;
        let trash = identity.trash();
        let into_trash = match &destination {
            Destination::Into(dir) | Destination::At(dir) => dir.is_within(&trash),
        };

        if into_trash {
            let dir = match destination {
                Destination::Into(dir) => dir,
                // A full path inside Trash still only names the folder; the
                // entry keeps its own name there.
                Destination::At(path) => match self.metadata.find(&path, identity).await? {
                    Some(row) if !row.is_dir => path.parent().unwrap_or_else(|| trash.clone()),
                    _ => path,
                },
            };
            let Some(row) = source else {
                return Err(Error::NotFound(source_path.to_string()));
            };
            if dir.is_within(&row.path) {
                return Err(Error::InvalidPath(
                    "cannot move a directory into itself".into(),
                ));
            }
            self.check_creatable(&dir, identity)?;
            return self.trash_into(row, &dir, identity).await;
        }

        let final_path = match destination {
            Destination::Into(dir) => dir.join(new_name.unwrap_or(&basename)),
            Destination::At(path) => match new_name {
                Some(name) => path
                    .parent()
                    .unwrap_or_else(CanonicalPath::root)
                    .join(name),
                None => path,
            },
        };
        self.check_creatable(&final_path, identity)?;
        if final_path == identity.root() || final_path == trash {
            return Err(Error::InvalidPath(format!(
                "cannot replace {}",
                self.config.log.path(&final_path, identity)
            )));
        }
        if self.metadata.find(&final_path, identity).await?.is_some() {
            return Err(taken(&final_path));
        }

        let Some(source) = source else {
            return Err(Error::NotFound(source_path.to_string()));
        };
        if source.is_dir && final_path.is_within(&source.path) {
            return Err(Error::InvalidPath(
                "cannot move a directory into itself".into(),
            ));
        }
        self.check_case_unique(&final_path, identity, Some(&source.path))
            .await?;
        if let Some(parent) = final_path.parent() {
            self.ensure_dir_chain(&parent, identity).await?;
        }

        let moved = self
            .relocate(&source, &final_path, identity)
            .await?
            .ok_or_else(|| taken(&final_path))?;
        tracing::info!(
            from = %self.config.log.path(&source.path, identity),
            to = %self.config.log.path(&moved.path, identity),
            "move"
        );
        self.notify(identity, FsEvent::moved(&source.path, &moved))
            .await;
        Ok(Moved {
            from: source.path,
            entry: Stat::from_row(&moved),
        })
    }

    /// Rename the entry at `raw` within its parent directory.
    pub async fn rename(&self, raw: &str, new_name: &str, identity: &Identity) -> Result<Moved> {
        self.authorize(identity)?;
        let name = self.config.limits.validate_name(new_name)?;
        if codec::is_identifier(name) {
            return Err(Error::InvalidPath(
                "new name must be a name, not an identifier".into(),
            ));
        }
        let source = self.locate_stored(raw, identity).await?;
        self.check_movable(&source.path, identity)?;

        let parent = source
            .path
            .parent()
            .ok_or_else(|| Error::InvalidPath("cannot rename /".into()))?;
        let final_path = parent.join(name);
        self.check_creatable(&final_path, identity)?;
        if self.metadata.find(&final_path, identity).await?.is_some() {
            return Err(taken(&final_path));
        }
        self.check_case_unique(&final_path, identity, Some(&source.path))
            .await?;

        let renamed = self
            .relocate(&source, &final_path, identity)
            .await?
            .ok_or_else(|| taken(&final_path))?;
        tracing::info!(
            from = %self.config.log.path(&source.path, identity),
            to = %self.config.log.path(&renamed.path, identity),
            "rename"
        );
        self.notify(identity, FsEvent::renamed(&source.path, &renamed))
            .await;
        Ok(Moved {
            from: source.path,
            entry: Stat::from_row(&renamed),
        })
    }

    /// A `newName` worth honoring: blank values and identifiers that
    /// clients send by mistake are ignored, anything else is validated.
    fn explicit_name<'a>(&self, new_name: Option<&'a str>) -> Result<Option<&'a str>> {
        let Some(name) = new_name.map(str::trim).filter(|n| !n.is_empty()) else {
            return Ok(None);
        };
        if codec::is_identifier(name) {
            tracing::debug!("ignoring identifier passed as new name");
            return Ok(None);
        }
        Ok(Some(self.config.limits.validate_name(name)?))
    }

    /// Entries that may never move or be deleted.
    pub(super) fn check_movable(&self, path: &CanonicalPath, identity: &Identity) -> Result<()> {
        if path.is_root() || *path == identity.root() || *path == identity.trash() {
            return Err(Error::InvalidPath(format!(
                "{} is protected",
                self.config.log.path(path, identity)
            )));
        }
        self.check_namespace(path, identity)
    }

    async fn destination(&self, to: &str, identity: &Identity) -> Result<Destination> {
        let wants_dir = to.trim_end().ends_with('/');
        let lookup = match self.locate(to, identity).await {
            Ok(found) => Some(found),
            Err(Error::NotFound(_)) if !codec::is_identifier(to) => None,
            Err(e) => return Err(e),
        };
        Ok(match lookup {
            Some(found) if found.is_dir() => Destination::Into(found.path().clone()),
            Some(found) if wants_dir => {
                return Err(Error::Conflict(format!(
                    "destination is a file: {}",
                    found.path()
                )));
            }
            Some(found) => Destination::At(found.path().clone()),
            None => {
                let path = self.canonicalize(&self.resolve_path(to, identity), identity).await?;
                if wants_dir {
                    Destination::Into(path)
                } else {
                    Destination::At(path)
                }
            }
        })
    }

    /// Re-key `source` (and its subtree) to `target`. Content refs, sizes and
    /// creation times are carried over.
    ///
    /// The target row is claimed with `insert_new` before anything else
    /// changes; `None` means another request holds it and nothing moved.
    pub(super) async fn relocate(
        &self,
        source: &Metadata,
        target: &CanonicalPath,
        identity: &Identity,
    ) -> Result<Option<Metadata>> {
        let now = Self::now();
        let descendants: Vec<Metadata> = if source.is_dir {
            self.metadata
                .list(&source.path, identity)
                .await?
                .into_iter()
                .filter(|row| row.path.is_strictly_within(&source.path))
                .collect()
        } else {
            Vec::new()
        };

        let moved = Metadata {
            path: target.clone(),
            updated_at: source.updated_at.max(now),
            ..source.clone()
        };
        if !self.metadata.insert_new(moved.clone()).await? {
            return Ok(None);
        }
        for row in &descendants {
            if let Some(path) = row.path.rebase(&source.path, target) {
                self.metadata
                    .upsert(Metadata {
                        path,
                        ..row.clone()
                    })
                    .await?;
            }
        }

        let mut stale: Vec<&CanonicalPath> = descendants.iter().map(|row| &row.path).collect();
        stale.sort_by_key(|path| std::cmp::Reverse(path.depth()));
        for path in stale {
            self.metadata.remove(path, identity).await?;
        }
        self.metadata.remove(&source.path, identity).await?;
        Ok(Some(moved))
    }
}

fn taken(path: &CanonicalPath) -> Error {
    Error::Conflict(format!("destination already exists: {}", path))
}
