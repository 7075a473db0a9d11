//! Read side: stat, list, read, usage.

use serde::Serialize;

use super::FsEngine;
use crate::codec;
use crate::error::{Error, Result};
use crate::events::iso8601;
use crate::fs::{FsUsage, Metadata, Timestamp};
use crate::identity::Identity;
use crate::lookup::Lookup;
use crate::media::{DEFAULT_MEDIA_TYPE, guess_media_type};
use crate::path::CanonicalPath;
use crate::range::ByteRange;

#[cfg(feature = "failpoints")]
use fail::fail_point;

/// Name of the synthetic Trash shortcut shown on the Desktop.
const TRASH_SHORTCUT: &str = ".Trash";

/// Entry descriptor returned by stat, write and mkdir. Timestamps are Unix ms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stat {
    pub uid: String,
    pub uuid: String,
    pub name: String,
    pub path: CanonicalPath,
    pub is_dir: bool,
    pub size: u64,
    pub created: Timestamp,
    pub modified: Timestamp,
    pub media_type: Option<String>,
    pub is_public: bool,
    /// True when no row backs this directory.
    pub synthesized: bool,
}

impl Stat {
    pub(crate) fn from_row(row: &Metadata) -> Self {
        let uid = codec::encode(&row.path);
        Self {
            uuid: uid.clone(),
            uid,
            name: display_name(&row.path),
            path: row.path.clone(),
            is_dir: row.is_dir,
            size: row.size,
            created: row.created_at,
            modified: row.updated_at,
            media_type: row.media_type.clone(),
            is_public: row.is_public,
            synthesized: false,
        }
    }

    fn synthesized(path: &CanonicalPath, now: Timestamp) -> Self {
        let uid = codec::encode(path);
        Self {
            uuid: uid.clone(),
            uid,
            name: display_name(path),
            path: path.clone(),
            is_dir: true,
            size: 0,
            created: now,
            modified: now,
            media_type: None,
            is_public: false,
            synthesized: true,
        }
    }
}

/// One row of a directory listing. Timestamps are ISO-8601.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListEntry {
    pub uid: String,
    pub uuid: String,
    pub name: String,
    pub path: CanonicalPath,
    pub is_dir: bool,
    /// Directories only: no entries below it.
    pub is_empty: bool,
    pub size: u64,
    pub created: String,
    pub modified: String,
    /// `None` for directories.
    pub media_type: Option<String>,
    pub is_public: bool,
}

impl ListEntry {
    fn from_row(row: &Metadata, is_empty: bool) -> Self {
        let uid = codec::encode(&row.path);
        let media_type = if row.is_dir {
            None
        } else {
            Some(
                row.media_type
                    .clone()
                    .unwrap_or_else(|| DEFAULT_MEDIA_TYPE.to_string()),
            )
        };
        Self {
            uuid: uid.clone(),
            uid,
            name: row.name().to_string(),
            path: row.path.clone(),
            is_dir: row.is_dir,
            is_empty: row.is_dir && is_empty,
            size: row.size,
            created: iso8601(row.created_at),
            modified: iso8601(row.updated_at),
            media_type,
            is_public: row.is_public,
        }
    }

    fn synthetic_dir(name: &str, path: &CanonicalPath, now: Timestamp) -> Self {
        let uid = codec::encode(path);
        Self {
            uuid: uid.clone(),
            uid,
            name: name.to_string(),
            path: path.clone(),
            is_dir: true,
            is_empty: true,
            size: 0,
            created: iso8601(now),
            modified: iso8601(now),
            media_type: None,
            is_public: false,
        }
    }
}

/// Bytes returned by [`FsEngine::read`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOutput {
    pub path: CanonicalPath,
    pub bytes: Vec<u8>,
    /// Size of the whole object.
    pub total_size: u64,
    /// Inclusive bounds served, for range reads.
    pub range: Option<(u64, u64)>,
    pub media_type: String,
}

impl ReadOutput {
    pub fn is_partial(&self) -> bool {
        self.range.is_some()
    }

    /// 206 for range reads, 200 otherwise.
    pub fn status(&self) -> u16 {
        if self.is_partial() { 206 } else { 200 }
    }

    /// `bytes S-E/TOTAL` for range reads.
    pub fn content_range(&self) -> Option<String> {
        self.range
            .map(|(start, end)| format!("bytes {}-{}/{}", start, end, self.total_size))
    }
}

fn display_name(path: &CanonicalPath) -> String {
    path.file_name().unwrap_or("/").to_string()
}

impl FsEngine {
    /// Describe the entry at `raw` (path or identifier).
    ///
    /// `/`, the identity root, its well-known folders and directories implied
    /// by stored rows are answered with a synthesized directory when they
    /// have no row.
    pub async fn stat(&self, raw: &str, identity: &Identity) -> Result<Stat> {
        self.authorize(identity)?;
        let stat = match self.locate(raw, identity).await? {
            Lookup::Stored(row) => Stat::from_row(&row),
            Lookup::Synthesized(path) => Stat::synthesized(&path, Self::now()),
        };
        tracing::debug!(
            path = %self.config.log.path(&stat.path, identity),
            synthesized = stat.synthesized,
            "stat"
        );
        Ok(stat)
    }

    /// Immediate children of the directory at `raw`, directories first.
    pub async fn list(&self, raw: &str, identity: &Identity) -> Result<Vec<ListEntry>> {
        self.authorize(identity)?;
        let dir = match self.locate(raw, identity).await? {
            Lookup::Stored(row) if !row.is_dir => {
                return Err(Error::InvalidPath(format!("not a directory: {}", row.path)));
            }
            found => found.path().clone(),
        };

        let children = self.cases(identity).children(&dir).await?;
        let mut entries = Vec::with_capacity(children.len() + 1);
        for child in &children {
            let is_empty = child.is_dir && self.probe_empty(&child.path, identity).await;
            entries.push(ListEntry::from_row(child, is_empty));
        }

        if dir.is_root() && !children.iter().any(|c| c.path == identity.root()) {
            entries.push(ListEntry::synthetic_dir(
                identity.as_str(),
                &identity.root(),
                Self::now(),
            ));
        }

        if dir == identity.desktop()
            && !children.iter().any(|c| c.name() == TRASH_SHORTCUT)
            && self.metadata.find(&identity.trash(), identity).await?.is_none()
        {
            entries.push(ListEntry::synthetic_dir(
                TRASH_SHORTCUT,
                &identity.trash(),
                Self::now(),
            ));
        }

        tracing::debug!(
            path = %self.config.log.path(&dir, identity),
            entries = entries.len(),
            "list"
        );
        Ok(entries)
    }

    /// True when nothing is stored below `dir`. A failed probe reads as
    /// empty so the listing itself still succeeds.
    async fn probe_empty(&self, dir: &CanonicalPath, identity: &Identity) -> bool {
        #[cfg(feature = "failpoints")]
        fail_point!("engine::list::probe_empty", |_| {
            tracing::warn!("emptiness probe failed: injected");
            true
        });

        match self.metadata.list(dir, identity).await {
            Ok(rows) => !rows.iter().any(|row| row.path.is_strictly_within(dir)),
            Err(e) => {
                tracing::warn!(
                    path = %self.config.log.path(dir, identity),
                    error = %e,
                    "emptiness probe failed"
                );
                true
            }
        }
    }

    /// Bytes of the file at `raw`, optionally a byte range of them.
    pub async fn read(
        &self,
        raw: &str,
        identity: &Identity,
        range: Option<ByteRange>,
    ) -> Result<ReadOutput> {
        self.authorize(identity)?;
        let row = match self.locate(raw, identity).await? {
            Lookup::Stored(row) if !row.is_dir => row,
            found => return Err(Error::IsDirectory(found.path().to_string())),
        };

        let bytes = match &row.content_ref {
            Some(id) => self.content.get(id).await?,
            None if row.size == 0 => Vec::new(),
            None => {
                return Err(Error::BackendUnavailable(format!(
                    "no committed content for {}",
                    row.path
                )));
            }
        };
        let total_size = bytes.len() as u64;
        let media_type = row
            .media_type
            .clone()
            .or_else(|| guess_media_type(row.name()).map(str::to_string))
            .unwrap_or_else(|| DEFAULT_MEDIA_TYPE.to_string());

        let (bytes, range) = match range {
            None => (bytes, None),
            Some(requested) => {
                let (start, end) = requested.resolve(total_size)?;
                let slice = bytes[start as usize..=end as usize].to_vec();
                (slice, Some((start, end)))
            }
        };

        tracing::debug!(
            path = %self.config.log.path(&row.path, identity),
            bytes = bytes.len(),
            partial = range.is_some(),
            "read"
        );
        Ok(ReadOutput {
            path: row.path,
            bytes,
            total_size,
            range,
            media_type,
        })
    }

    /// Bytes and entry counts stored under the identity's namespace.
    pub async fn usage(&self, identity: &Identity) -> Result<FsUsage> {
        self.authorize(identity)?;
        let root = identity.root();
        let rows = self.metadata.list(&root, identity).await?;
        let usage = rows
            .iter()
            .filter(|row| row.path.is_within(&root))
            .fold(FsUsage::default(), |mut usage, row| {
                if row.is_dir {
                    usage.dir_count += 1;
                } else {
                    usage.file_count += 1;
                    usage.total_bytes += row.size;
                }
                usage
            });
        Ok(usage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_range_header() {
        let out = ReadOutput {
            path: CanonicalPath::normalize("/0xABC/a"),
            bytes: b"ell".to_vec(),
            total_size: 5,
            range: Some((1, 3)),
            media_type: DEFAULT_MEDIA_TYPE.into(),
        };
        assert!(out.is_partial());
        assert_eq!(out.status(), 206);
        assert_eq!(out.content_range().as_deref(), Some("bytes 1-3/5"));
    }

    #[test]
    fn root_display_name() {
        assert_eq!(display_name(&CanonicalPath::root()), "/");
        assert_eq!(display_name(&CanonicalPath::normalize("/0xABC")), "0xABC");
    }
}
