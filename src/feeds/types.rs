//! Feed types: keys, descriptors, handles and transport events.

use crate::error::FeedError;
use crate::types::Role;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Unique identifier for a started feed.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeedId(pub u64);

impl fmt::Debug for FeedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FeedId({})", self.0)
    }
}

impl fmt::Display for FeedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Extra parameters a feed is started with.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FeedParams {
    #[default]
    None,
    /// Role of the current actor.
    Role(Role),
    /// Chat room ids whose messages should be delivered.
    ChatIds(Vec<String>),
}

/// Identity of a feed as seen by the transport: starting two feeds with
/// equal keys yields the same underlying feed.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeedKey {
    pub name: String,
    pub params: FeedParams,
}

impl FeedKey {
    /// A feed with no extra parameters.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: FeedParams::None,
        }
    }

    pub fn with_role(name: impl Into<String>, role: Role) -> Self {
        Self {
            name: name.into(),
            params: FeedParams::Role(role),
        }
    }

    pub fn with_chat_ids(name: impl Into<String>, chat_ids: Vec<String>) -> Self {
        Self {
            name: name.into(),
            params: FeedParams::ChatIds(chat_ids),
        }
    }
}

impl fmt::Display for FeedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.params {
            FeedParams::None => write!(f, "{}", self.name),
            FeedParams::Role(role) => write!(f, "{}({})", self.name, role),
            FeedParams::ChatIds(ids) => write!(f, "{}([{}])", self.name, ids.join(",")),
        }
    }
}

/// Callback receiving feed-level failures.
pub trait ErrorSink: Send + Sync {
    fn on_error(&self, feed: &FeedKey, error: &FeedError);
}

/// Everything the transport needs to start a feed.
#[derive(Clone)]
pub struct FeedDescriptor {
    pub key: FeedKey,
    pub sink: Arc<dyn ErrorSink>,
}

impl FeedDescriptor {
    pub fn new(key: FeedKey, sink: Arc<dyn ErrorSink>) -> Self {
        Self { key, sink }
    }
}

impl fmt::Debug for FeedDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedDescriptor")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// Readiness state shared between a transport and the handles it issued.
#[derive(Debug, Default)]
pub struct FeedState {
    ready: AtomicBool,
    stopped: AtomicBool,
}

impl FeedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::SeqCst);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Returns true on the first call only.
    pub(crate) fn mark_stopped(&self) -> bool {
        !self.stopped.swap(true, Ordering::SeqCst)
    }
}

/// Transport side of `FeedHandle::stop`.
pub trait FeedControl: Send + Sync {
    fn stop(&self, id: FeedId);
}

/// Handle to a started feed.
///
/// Cloning a handle does not start anything; all clones observe the same
/// feed.
#[derive(Clone)]
pub struct FeedHandle {
    id: FeedId,
    key: FeedKey,
    state: Arc<FeedState>,
    control: Arc<dyn FeedControl>,
}

impl FeedHandle {
    pub fn new(
        id: FeedId,
        key: FeedKey,
        state: Arc<FeedState>,
        control: Arc<dyn FeedControl>,
    ) -> Self {
        Self {
            id,
            key,
            state,
            control,
        }
    }

    pub fn id(&self) -> FeedId {
        self.id
    }

    pub fn key(&self) -> &FeedKey {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.key.name
    }

    /// Whether the initial data set of this feed has arrived.
    pub fn is_ready(&self) -> bool {
        self.state.is_ready()
    }

    pub fn is_stopped(&self) -> bool {
        self.state.is_stopped()
    }

    /// Stop the feed. Later calls are no-ops.
    pub fn stop(&self) {
        if self.state.mark_stopped() {
            self.control.stop(self.id);
        }
    }
}

impl fmt::Debug for FeedHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedHandle")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("ready", &self.is_ready())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

/// Lifecycle events published by a transport.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedEvent {
    /// Initial data for the feed has arrived.
    Ready { id: FeedId, key: FeedKey },

    /// The feed failed; the error was also delivered to its sink.
    Failed {
        id: FeedId,
        key: FeedKey,
        error: FeedError,
    },

    /// The feed is gone.
    Stopped {
        id: FeedId,
        key: FeedKey,
        reason: StopReason,
    },
}

/// Why a feed was stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// `stop()` was called on a handle.
    Explicit,
    /// No evaluation pass requested it any more.
    Unreferenced,
}

/// Starts or reuses named feeds.
pub trait FeedTransport: Send + Sync {
    /// Start a feed, or return the live feed with an equal key.
    fn subscribe(&self, descriptor: FeedDescriptor) -> FeedHandle;

    /// Called before an evaluation pass requests its feeds.
    fn begin_pass(&self) {}

    /// Called after an evaluation pass; feeds it did not request may be
    /// released.
    fn end_pass(&self) {}
}
