//! One-shot migration of remote annotations into the local mirror.
//!
//! The annotations feed is only a bootstrap: the first time it becomes
//! ready, the remote records are copied into the client-local mirror and
//! the feed is stopped for good. From then on the mirror evolves on its
//! own.
//!
//! ```text
//! Pending --ready--> ReadyOnce --copy + stop--> Stopped
//! ```

use crate::feeds::{ErrorSink, FeedDescriptor, FeedHandle, FeedKey, FeedTransport};
use crate::mirror::LocalMirror;
use crate::replica::Replica;
use crate::types::Annotation;
use parking_lot::RwLock;
use std::sync::Arc;

/// Suffix of the placeholder entry kept for the shape being typed.
const PLACEHOLDER_SUFFIX: &str = "-fake";

/// Source of the text shape currently being edited.
pub trait ActiveShapeSource: Send + Sync {
    fn active_text_shape_id(&self) -> Option<String>;
}

/// In-memory active shape tracker.
#[derive(Debug, Default)]
pub struct ActiveTextShape {
    id: RwLock<Option<String>>,
}

impl ActiveTextShape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, id: Option<String>) {
        *self.id.write() = id;
    }
}

impl ActiveShapeSource for ActiveTextShape {
    fn active_text_shape_id(&self) -> Option<String> {
        self.id.read().clone()
    }
}

/// Lifecycle of the migration feed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MigrationState {
    /// Feed started, waiting for its first ready signal.
    Pending,
    /// Ready observed; the copy is running.
    ReadyOnce,
    /// Copy done and feed stopped. Terminal.
    Stopped,
}

/// What a migration did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MigrationSummary {
    /// Stale mirror entries removed before copying.
    pub removed: usize,
    /// Remote records inserted into the mirror.
    pub copied: usize,
    /// Inserts that failed and were ignored.
    pub skipped: usize,
}

/// Copy the remote annotations into the mirror.
///
/// Mirror entries other than the active shape's placeholder are removed
/// first. The active shape itself is not copied. Failed inserts are
/// counted and otherwise ignored.
pub fn migrate(
    shapes: &dyn ActiveShapeSource,
    replica: &dyn Replica,
    mirror: &dyn LocalMirror,
) -> MigrationSummary {
    let active = shapes.active_text_shape_id();
    let placeholder = active.as_ref().map(|id| format!("{}{}", id, PLACEHOLDER_SUFFIX));

    let removed = mirror.remove_where(&|a: &Annotation| Some(&a.id) != placeholder.as_ref());

    let mut summary = MigrationSummary {
        removed,
        ..Default::default()
    };
    for annotation in replica.annotations_except(active.as_deref()) {
        match mirror.insert(annotation) {
            Ok(()) => summary.copied += 1,
            Err(e) => {
                tracing::trace!(error = %e, "ignoring failed mirror insert");
                summary.skipped += 1;
            }
        }
    }
    summary
}

/// The migration feed and its state machine.
#[derive(Debug)]
pub struct MigrationFeed {
    name: String,
    state: MigrationState,
    handle: Option<FeedHandle>,
}

impl MigrationFeed {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: MigrationState::Pending,
            handle: None,
        }
    }

    pub fn state(&self) -> MigrationState {
        self.state
    }

    /// Start or reuse the feed. Returns `None` once the migration is done.
    pub fn request(
        &mut self,
        transport: &dyn FeedTransport,
        sink: &Arc<dyn ErrorSink>,
    ) -> Option<FeedHandle> {
        if self.state != MigrationState::Pending {
            return None;
        }

        let descriptor = FeedDescriptor::new(FeedKey::named(self.name.as_str()), Arc::clone(sink));
        let handle = transport.subscribe(descriptor);
        self.handle = Some(handle.clone());
        Some(handle)
    }

    /// Run the migration if the feed has become ready while pending.
    ///
    /// Returns the summary on the call that performed the migration and
    /// `None` on every other call.
    pub fn poll(
        &mut self,
        shapes: &dyn ActiveShapeSource,
        replica: &dyn Replica,
        mirror: &dyn LocalMirror,
    ) -> Option<MigrationSummary> {
        if self.state != MigrationState::Pending {
            return None;
        }
        let handle = self.handle.as_ref().filter(|h| h.is_ready())?.clone();

        self.state = MigrationState::ReadyOnce;
        let summary = migrate(shapes, replica, mirror);

        handle.stop();
        self.handle = None;
        self.state = MigrationState::Stopped;

        tracing::info!(
            feed = %self.name,
            removed = summary.removed,
            copied = summary.copied,
            skipped = summary.skipped,
            "annotation migration complete"
        );
        Some(summary)
    }
}
