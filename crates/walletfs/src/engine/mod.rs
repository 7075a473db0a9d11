//! Filesystem engine.
//!
//! [`FsEngine`] is the only type callers need: it resolves client paths and
//! identifiers, looks entries up, and performs mutations against the injected
//! stores. It holds no state between calls besides its handles and config, so
//! one engine can serve every identity concurrently.
//!
//! Writes follow one order: content `put`, then metadata `upsert`, then the
//! event. A write interrupted between the first two steps is repaired by
//! running it again.

mod mutate;
mod read;
mod trash;

pub use mutate::{Moved, Written};
pub use read::{ListEntry, ReadOutput, Stat};
pub use trash::Deleted;

use chrono::Utc;
use std::sync::Arc;

use crate::codec;
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::events::{EventNotifier, FsEvent, NullNotifier};
use crate::fs::{
    ContentStore, InMemoryContentStore, InMemoryMetadataStore, Metadata, MetadataStore,
    PathLimits, Timestamp,
};
use crate::identity::Identity;
use crate::lookup::{CaseResolver, Lookup, Resolution};
use crate::path::CanonicalPath;
use crate::resolver::PathResolver;

/// How a client addressed an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locator<'a> {
    /// A path in any form the resolver accepts.
    Path(&'a str),
    /// An external identifier (`uuid-...`).
    Id(&'a str),
}

impl<'a> Locator<'a> {
    /// Classify raw client input.
    ///
    /// ```
    /// use walletfs::Locator;
    ///
    /// assert_eq!(Locator::parse("uuid--0xABC-Desktop"), Locator::Id("uuid--0xABC-Desktop"));
    /// assert_eq!(Locator::parse("~/Desktop"), Locator::Path("~/Desktop"));
    /// ```
    pub fn parse(raw: &'a str) -> Self {
        if codec::is_identifier(raw) {
            Self::Id(raw.trim())
        } else {
            Self::Path(raw)
        }
    }
}

/// Per-identity filesystem over a metadata store and a content store.
///
/// Every operation takes the raw path (or identifier) exactly as the client
/// sent it plus the identity the transport authenticated.
///
/// # Example
///
/// ```rust
/// use walletfs::{FsEngine, Identity};
///
/// # tokio_test::block_on(async {
/// let engine = FsEngine::new();
/// let me = Identity::new("0xABC").unwrap();
///
/// engine.write("~/Desktop/notes.txt", b"hi", &me, None).await.unwrap();
/// let stat = engine.stat("Desktop/notes.txt", &me).await.unwrap();
/// assert_eq!(stat.size, 2);
/// assert_eq!(stat.uid, "uuid--0xABC-Desktop-notes.txt");
/// # });
/// ```
pub struct FsEngine {
    metadata: Arc<dyn MetadataStore>,
    content: Arc<dyn ContentStore>,
    notifier: Arc<dyn EventNotifier>,
    config: EngineConfig,
}

impl Default for FsEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FsEngine {
    /// Engine over fresh in-memory stores, default config, no notifications.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a new FsEngineBuilder for customized configuration.
    pub fn builder() -> FsEngineBuilder {
        FsEngineBuilder::default()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Canonical path for a raw client path. Pure; never fails.
    pub fn resolve_path(&self, raw: &str, identity: &Identity) -> CanonicalPath {
        PathResolver::new(identity, &self.config.resolve).resolve(raw)
    }

    fn cases<'a>(&'a self, identity: &'a Identity) -> CaseResolver<'a> {
        CaseResolver::new(self.metadata.as_ref(), identity)
    }

    fn now() -> Timestamp {
        Utc::now().timestamp_millis()
    }

    fn authorize(&self, identity: &Identity) -> Result<()> {
        self.config.owner.authorize(identity)
    }

    async fn notify(&self, identity: &Identity, event: FsEvent) {
        self.notifier.notify(identity, event).await;
    }

    /// Find what `raw` refers to.
    ///
    /// Paths outside the namespace (other than `/`) are InvalidPath. Missing
    /// entries are synthesized when they are navigable directories, else
    /// NotFound.
    async fn locate(&self, raw: &str, identity: &Identity) -> Result<Lookup> {
        match Locator::parse(raw) {
            Locator::Path(raw) => {
                let path = self.resolve_path(raw, identity);
                self.lookup_path(&path, identity).await
            }
            Locator::Id(id) => match self.cases(identity).resolve_identifier(id).await {
                Ok(Resolution::Resolved(row)) => Ok(Lookup::Stored(row)),
                Ok(Resolution::Ambiguous(paths)) => Err(Error::InvalidPath(format!(
                    "identifier matches {} entries; address it by path",
                    paths.len()
                ))),
                // Unstored identifiers still reach the directories a path
                // would synthesize; foreign namespaces stay NotFound.
                Err(Error::NotFound(msg)) => {
                    let candidate = self.resolve_path(codec::decode(id).as_str(), identity);
                    if !candidate.is_root() && !identity.owns(&candidate) {
                        return Err(Error::NotFound(msg));
                    }
                    match self.lookup_path(&candidate, identity).await {
                        Err(Error::NotFound(_)) => Err(Error::NotFound(msg)),
                        found => found,
                    }
                }
                Err(e) => Err(e),
            },
        }
    }

    async fn lookup_path(&self, path: &CanonicalPath, identity: &Identity) -> Result<Lookup> {
        if path.is_root() {
            return Ok(Lookup::Synthesized(path.clone()));
        }
        self.check_namespace(path, identity)?;
        if let Some(row) = self.cases(identity).find(path).await? {
            return Ok(Lookup::Stored(row));
        }
        if self.is_navigable(path, identity).await? {
            return Ok(Lookup::Synthesized(path.clone()));
        }
        Err(Error::NotFound(path.to_string()))
    }

    /// A stored entry, never a synthesized directory.
    async fn locate_stored(&self, raw: &str, identity: &Identity) -> Result<Metadata> {
        match self.locate(raw, identity).await? {
            Lookup::Stored(row) => Ok(row),
            Lookup::Synthesized(path) => Err(Error::NotFound(path.to_string())),
        }
    }

    /// Missing directories that still answer to stat and list: the identity
    /// root, its well-known folders, and any path with stored rows below it.
    async fn is_navigable(&self, path: &CanonicalPath, identity: &Identity) -> Result<bool> {
        if *path == identity.root() || self.is_well_known(path, identity) {
            return Ok(true);
        }
        let rows = self.metadata.list(path, identity).await?;
        Ok(rows.iter().any(|row| row.path.is_strictly_within(path)))
    }

    fn is_well_known(&self, path: &CanonicalPath, identity: &Identity) -> bool {
        path.parent().as_ref() == Some(&identity.root())
            && path
                .file_name()
                .is_some_and(|name| self.config.resolve.well_known.iter().any(|w| w == name))
    }

    fn check_namespace(&self, path: &CanonicalPath, identity: &Identity) -> Result<()> {
        if identity.owns(path) {
            Ok(())
        } else {
            Err(Error::InvalidPath(format!(
                "{} is outside the namespace of {}",
                self.config.log.value(path.as_str()),
                self.config.log.identity(identity)
            )))
        }
    }

    /// Paths new entries may be created at: inside the namespace, within
    /// limits. The identity root itself counts.
    fn check_creatable(&self, path: &CanonicalPath, identity: &Identity) -> Result<()> {
        self.check_namespace(path, identity)?;
        self.config.limits.validate_path(path)?;
        Ok(())
    }

    /// Map the longest existing prefix of `path` onto its stored casing.
    ///
    /// `/0xABC/desktop/new.txt` becomes `/0xABC/Desktop/new.txt` when
    /// `Desktop` exists, so creations land next to the entries the client
    /// meant.
    async fn canonicalize(
        &self,
        path: &CanonicalPath,
        identity: &Identity,
    ) -> Result<CanonicalPath> {
        let resolver = self.cases(identity);
        let mut tail: Vec<String> = Vec::new();
        let mut current = path.clone();
        let base = loop {
            if current.is_root() || current == identity.root() {
                break current;
            }
            if let Some(row) = resolver.find(&current).await? {
                break row.path;
            }
            let (Some(parent), Some(name)) = (current.parent(), current.file_name()) else {
                break current;
            };
            tail.push(name.to_string());
            current = parent;
        };
        Ok(tail.iter().rev().fold(base, |dir, name| dir.join(name)))
    }

    /// Resolve a creation target: an identifier for an existing entry, or a
    /// path mapped onto stored casing.
    async fn target_path(&self, raw: &str, identity: &Identity) -> Result<CanonicalPath> {
        let path = match Locator::parse(raw) {
            Locator::Path(raw) => self.resolve_path(raw, identity),
            Locator::Id(id) => match self.cases(identity).resolve_identifier(id).await {
                Ok(Resolution::Resolved(row)) => return Ok(row.path),
                Ok(Resolution::Ambiguous(paths)) => {
                    return Err(Error::InvalidPath(format!(
                        "identifier matches {} entries; address it by path",
                        paths.len()
                    )));
                }
                Err(Error::NotFound(_)) => {
                    self.resolve_path(codec::decode(id).as_str(), identity)
                }
                Err(e) => return Err(e),
            },
        };
        self.check_namespace(&path, identity)?;
        self.canonicalize(&path, identity).await
    }

    /// Materialize `dir` and its missing ancestors down from the identity
    /// root.
    async fn ensure_dir_chain(&self, dir: &CanonicalPath, identity: &Identity) -> Result<()> {
        let root = identity.root();
        let mut chain = vec![dir.clone()];
        let mut current = dir.clone();
        while current != root {
            match current.parent() {
                Some(parent) if !parent.is_root() => {
                    chain.push(parent.clone());
                    current = parent;
                }
                _ => break,
            }
        }

        for path in chain.into_iter().rev() {
            match self.metadata.find(&path, identity).await? {
                Some(row) if row.is_dir => {}
                Some(_) => {
                    return Err(Error::Conflict(format!("path exists as a file: {}", path)));
                }
                None => {
                    self.check_case_unique(&path, identity, None).await?;
                    let row = Metadata::directory(path, identity.clone(), Self::now());
                    self.metadata.upsert(row.clone()).await?;
                    tracing::debug!(
                        path = %self.config.log.path(&row.path, identity),
                        "materialized directory"
                    );
                    self.notify(identity, FsEvent::added(&row)).await;
                }
            }
        }
        Ok(())
    }

    /// Conflict when a live sibling's name equals `path`'s ignoring case.
    ///
    /// `except` is skipped, so an entry can be renamed to a different casing
    /// of its own name.
    async fn check_case_unique(
        &self,
        path: &CanonicalPath,
        identity: &Identity,
        except: Option<&CanonicalPath>,
    ) -> Result<()> {
        let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
            return Ok(());
        };
        let wanted = name.to_lowercase();
        for sibling in self.cases(identity).children(&parent).await? {
            if sibling.path == *path || Some(&sibling.path) == except {
                continue;
            }
            if sibling.name().to_lowercase() == wanted {
                return Err(Error::Conflict(format!(
                    "'{}' differs only by case from existing '{}'",
                    self.config.log.value(name),
                    self.config.log.value(sibling.name())
                )));
            }
        }
        Ok(())
    }
}

/// Builder for customized engine configuration.
#[derive(Default)]
pub struct FsEngineBuilder {
    metadata: Option<Arc<dyn MetadataStore>>,
    content: Option<Arc<dyn ContentStore>>,
    notifier: Option<Arc<dyn EventNotifier>>,
    config: EngineConfig,
}

impl FsEngineBuilder {
    /// Set the metadata store. Default: [`InMemoryMetadataStore`].
    pub fn metadata(mut self, store: Arc<dyn MetadataStore>) -> Self {
        self.metadata = Some(store);
        self
    }

    /// Set the content store. Default: [`InMemoryContentStore`].
    pub fn content(mut self, store: Arc<dyn ContentStore>) -> Self {
        self.content = Some(store);
        self
    }

    /// Set the event notifier. Default: [`NullNotifier`].
    pub fn notifier(mut self, notifier: Arc<dyn EventNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set path limits.
    pub fn limits(mut self, limits: PathLimits) -> Self {
        self.config.limits = limits;
        self
    }

    /// Build the engine.
    pub fn build(self) -> FsEngine {
        FsEngine {
            metadata: self
                .metadata
                .unwrap_or_else(|| Arc::new(InMemoryMetadataStore::new())),
            content: self
                .content
                .unwrap_or_else(|| Arc::new(InMemoryContentStore::new())),
            notifier: self.notifier.unwrap_or_else(|| Arc::new(NullNotifier)),
            config: self.config,
        }
    }
}
