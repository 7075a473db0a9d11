//! Change notifications.
//!
//! The engine reports every committed mutation to an [`EventNotifier`] after
//! the metadata store accepted it. Events are scoped to the identity whose
//! namespace changed so a transport can route them to that wallet's room.
//!
//! Wire names follow the live-update protocol: `item.added`, `item.updated`,
//! `item.removed`, `item.moved`, `item.renamed`.

// Mutex.lock().unwrap() only panics on lock poisoning (prior panic while
// holding lock). This is intentional - corrupted state should not propagate.
#![allow(clippy::unwrap_used)]

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::sync::Mutex;
use tokio::sync::broadcast;

use crate::codec;
use crate::fs::{Metadata, Timestamp};
use crate::identity::Identity;
use crate::path::CanonicalPath;

/// Entry snapshot carried by events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventItem {
    pub uid: String,
    pub name: String,
    pub path: CanonicalPath,
    pub dirpath: CanonicalPath,
    pub size: u64,
    pub is_dir: bool,
    pub media_type: Option<String>,
    /// ISO-8601
    pub created: String,
    /// ISO-8601
    pub modified: String,
}

impl From<&Metadata> for EventItem {
    fn from(row: &Metadata) -> Self {
        Self {
            uid: codec::encode(&row.path),
            name: row.name().to_string(),
            path: row.path.clone(),
            dirpath: row.path.parent().unwrap_or_else(CanonicalPath::root),
            size: row.size,
            is_dir: row.is_dir,
            media_type: row.media_type.clone(),
            created: iso8601(row.created_at),
            modified: iso8601(row.updated_at),
        }
    }
}

/// A committed mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum FsEvent {
    #[serde(rename = "item.added")]
    Added(EventItem),
    #[serde(rename = "item.updated")]
    Updated(EventItem),
    #[serde(rename = "item.removed")]
    Removed { uid: String, path: CanonicalPath },
    #[serde(rename = "item.moved")]
    Moved {
        old_uid: String,
        old_path: CanonicalPath,
        item: EventItem,
    },
    #[serde(rename = "item.renamed")]
    Renamed {
        old_uid: String,
        old_path: CanonicalPath,
        item: EventItem,
    },
}

impl FsEvent {
    pub fn added(row: &Metadata) -> Self {
        Self::Added(row.into())
    }

    pub fn updated(row: &Metadata) -> Self {
        Self::Updated(row.into())
    }

    pub fn removed(path: &CanonicalPath) -> Self {
        Self::Removed {
            uid: codec::encode(path),
            path: path.clone(),
        }
    }

    pub fn moved(old_path: &CanonicalPath, row: &Metadata) -> Self {
        Self::Moved {
            old_uid: codec::encode(old_path),
            old_path: old_path.clone(),
            item: row.into(),
        }
    }

    pub fn renamed(old_path: &CanonicalPath, row: &Metadata) -> Self {
        Self::Renamed {
            old_uid: codec::encode(old_path),
            old_path: old_path.clone(),
            item: row.into(),
        }
    }

    /// Wire name, e.g. `item.added`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Added(_) => "item.added",
            Self::Updated(_) => "item.updated",
            Self::Removed { .. } => "item.removed",
            Self::Moved { .. } => "item.moved",
            Self::Renamed { .. } => "item.renamed",
        }
    }

    /// Path the event is about after the mutation.
    pub fn path(&self) -> &CanonicalPath {
        match self {
            Self::Added(item) | Self::Updated(item) => &item.path,
            Self::Removed { path, .. } => path,
            Self::Moved { item, .. } | Self::Renamed { item, .. } => &item.path,
        }
    }
}

/// An event together with the identity whose namespace changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopedEvent {
    pub identity: Identity,
    #[serde(flatten)]
    pub event: FsEvent,
}

/// Receives committed mutations.
///
/// Notification is fire-and-forget: the mutation has already happened, so a
/// notifier that cannot deliver must drop the event rather than fail.
#[async_trait]
pub trait EventNotifier: Send + Sync {
    async fn notify(&self, identity: &Identity, event: FsEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

#[async_trait]
impl EventNotifier for NullNotifier {
    async fn notify(&self, _identity: &Identity, _event: FsEvent) {}
}

/// Fans events out over a `tokio::sync::broadcast` channel.
///
/// ```
/// use walletfs::{BroadcastNotifier, FsEngine, Identity};
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let notifier = Arc::new(BroadcastNotifier::new(64));
/// let mut events = notifier.subscribe();
/// let engine = FsEngine::builder().notifier(notifier.clone()).build();
///
/// let me = Identity::new("0xABC").unwrap();
/// engine.mkdir("~/Documents", &me).await.unwrap();
/// let first = events.recv().await.unwrap();
/// assert_eq!(first.identity, me);
/// # });
/// ```
#[derive(Debug)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<ScopedEvent>,
}

impl BroadcastNotifier {
    /// New channel buffering up to `capacity` events per slow receiver.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ScopedEvent> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl EventNotifier for BroadcastNotifier {
    async fn notify(&self, identity: &Identity, event: FsEvent) {
        let scoped = ScopedEvent {
            identity: identity.clone(),
            event,
        };
        // No receivers is not an error.
        let _ = self.tx.send(scoped);
    }
}

/// Keeps events in memory, for tests and diagnostics.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<ScopedEvent>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain recorded events.
    pub fn take(&self) -> Vec<ScopedEvent> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }

    /// Wire names of recorded events, without draining.
    pub fn names(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.event.name())
            .collect()
    }
}

#[async_trait]
impl EventNotifier for RecordingNotifier {
    async fn notify(&self, identity: &Identity, event: FsEvent) {
        self.events.lock().unwrap().push(ScopedEvent {
            identity: identity.clone(),
            event,
        });
    }
}

/// Format Unix milliseconds as ISO-8601 (`2024-01-02T03:04:05.678Z`).
pub fn iso8601(ms: Timestamp) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}
