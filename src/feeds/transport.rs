//! In-process feed transport.

use crate::error::{CoordinatorError, FeedError, Result};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::types::{
    ErrorSink, FeedControl, FeedDescriptor, FeedEvent, FeedHandle, FeedId, FeedKey, FeedState,
    FeedTransport, StopReason,
};

/// Default per-listener event buffer.
const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Internal feed state.
struct Feed {
    id: FeedId,
    state: Arc<FeedState>,
    /// Sink of the most recent subscriber.
    sink: Arc<dyn ErrorSink>,
    /// Requested during the current pass.
    requested: bool,
}

struct Inner {
    /// Live feeds by key.
    feeds: RwLock<HashMap<FeedKey, Feed>>,
    /// Counter for generating feed IDs.
    next_id: AtomicU64,
    /// One bounded sender per `events()` receiver.
    listeners: RwLock<Vec<Sender<FeedEvent>>>,
    /// Max buffered events per listener before events are dropped.
    buffer_size: usize,
}

impl Inner {
    /// Send to every listener. Full buffers drop the event; disconnected
    /// listeners are removed.
    fn publish(&self, event: FeedEvent) {
        self.listeners
            .write()
            .retain(|listener| match listener.try_send(event.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    tracing::trace!(?event, "listener buffer full, dropping event");
                    true
                }
                Err(TrySendError::Disconnected(_)) => false,
            });
    }
}

impl FeedControl for Inner {
    fn stop(&self, id: FeedId) {
        let removed = {
            let mut feeds = self.feeds.write();
            let key = feeds
                .iter()
                .find(|(_, feed)| feed.id == id)
                .map(|(key, _)| key.clone());
            key.and_then(|key| feeds.remove(&key).map(|feed| (key, feed)))
        };

        if let Some((key, feed)) = removed {
            feed.state.mark_stopped();
            tracing::debug!(feed = %key, id = %id, "feed stopped");
            self.publish(FeedEvent::Stopped {
                id,
                key,
                reason: StopReason::Explicit,
            });
        }
    }
}

/// Transport keeping every feed in memory.
///
/// The owner drives feeds by calling [`LocalTransport::mark_ready`] and
/// [`LocalTransport::fail`]; lifecycle changes are published on the
/// channel returned by [`LocalTransport::events`].
#[derive(Clone)]
pub struct LocalTransport {
    inner: Arc<Inner>,
}

impl LocalTransport {
    /// Create a new transport.
    pub fn new() -> Self {
        Self::with_buffer_size(DEFAULT_BUFFER_SIZE)
    }

    /// Create a new transport with a custom per-listener event buffer.
    pub fn with_buffer_size(buffer_size: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                feeds: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                listeners: RwLock::new(Vec::new()),
                buffer_size: buffer_size.max(1),
            }),
        }
    }

    /// New receiver for lifecycle events.
    ///
    /// Each receiver gets every event published after this call. A receiver
    /// that is not drained keeps at most the configured buffer size; later
    /// events are dropped for it.
    pub fn events(&self) -> Receiver<FeedEvent> {
        let (sender, receiver) = bounded(self.inner.buffer_size);
        self.inner.listeners.write().push(sender);
        receiver
    }

    /// Number of live feeds.
    pub fn feed_count(&self) -> usize {
        self.inner.feeds.read().len()
    }

    pub fn contains(&self, key: &FeedKey) -> bool {
        self.inner.feeds.read().contains_key(key)
    }

    /// Keys of all live feeds, in no particular order.
    pub fn keys(&self) -> Vec<FeedKey> {
        self.inner.feeds.read().keys().cloned().collect()
    }

    /// Mark a feed's initial data as delivered.
    pub fn mark_ready(&self, key: &FeedKey) -> Result<FeedId> {
        let id = {
            let feeds = self.inner.feeds.read();
            let feed = feeds
                .get(key)
                .ok_or_else(|| CoordinatorError::FeedNotFound(key.to_string()))?;
            feed.state.mark_ready();
            feed.id
        };

        self.inner.publish(FeedEvent::Ready {
            id,
            key: key.clone(),
        });
        Ok(id)
    }

    /// Mark every live feed as ready.
    pub fn mark_all_ready(&self) {
        for key in self.keys() {
            let _ = self.mark_ready(&key);
        }
    }

    /// Report a failure for a feed to its error sink.
    pub fn fail(&self, key: &FeedKey, error: FeedError) -> Result<FeedId> {
        let (id, sink) = {
            let feeds = self.inner.feeds.read();
            let feed = feeds
                .get(key)
                .ok_or_else(|| CoordinatorError::FeedNotFound(key.to_string()))?;
            (feed.id, Arc::clone(&feed.sink))
        };

        // Sinks may re-enter the transport; call them without holding the lock.
        sink.on_error(key, &error);

        self.inner.publish(FeedEvent::Failed {
            id,
            key: key.clone(),
            error,
        });
        Ok(id)
    }

    /// Drop feeds that were not requested since the last `begin_pass`.
    pub fn collect_unreferenced(&self) -> usize {
        let released: Vec<(FeedKey, Feed)> = {
            let mut feeds = self.inner.feeds.write();
            let keys: Vec<FeedKey> = feeds
                .iter()
                .filter(|(_, feed)| !feed.requested)
                .map(|(key, _)| key.clone())
                .collect();
            keys.into_iter()
                .filter_map(|key| feeds.remove(&key).map(|feed| (key, feed)))
                .collect()
        };

        let count = released.len();
        for (key, feed) in released {
            feed.state.mark_stopped();
            let id = feed.id;
            tracing::debug!(feed = %key, id = %id, "releasing unreferenced feed");
            self.inner.publish(FeedEvent::Stopped {
                id,
                key,
                reason: StopReason::Unreferenced,
            });
        }
        count
    }
}

impl FeedTransport for LocalTransport {
    fn subscribe(&self, descriptor: FeedDescriptor) -> FeedHandle {
        let control: Arc<dyn FeedControl> = self.inner.clone();
        let mut feeds = self.inner.feeds.write();

        if let Some(feed) = feeds.get_mut(&descriptor.key) {
            feed.sink = descriptor.sink;
            feed.requested = true;
            return FeedHandle::new(feed.id, descriptor.key, Arc::clone(&feed.state), control);
        }

        let id = FeedId(self.inner.next_id.fetch_add(1, Ordering::SeqCst));
        let state = Arc::new(FeedState::new());
        tracing::debug!(feed = %descriptor.key, id = %id, "starting feed");

        feeds.insert(
            descriptor.key.clone(),
            Feed {
                id,
                state: Arc::clone(&state),
                sink: descriptor.sink,
                requested: true,
            },
        );

        FeedHandle::new(id, descriptor.key, state, control)
    }

    fn begin_pass(&self) {
        for feed in self.inner.feeds.write().values_mut() {
            feed.requested = false;
        }
    }

    fn end_pass(&self) {
        self.collect_unreferenced();
    }
}

impl Default for LocalTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        errors: Mutex<Vec<(FeedKey, FeedError)>>,
    }

    impl ErrorSink for RecordingSink {
        fn on_error(&self, feed: &FeedKey, error: &FeedError) {
            self.errors.lock().push((feed.clone(), error.clone()));
        }
    }

    fn descriptor(name: &str, sink: &Arc<RecordingSink>) -> FeedDescriptor {
        FeedDescriptor::new(FeedKey::named(name), sink.clone())
    }

    #[test]
    fn test_subscribe_deduplicates_by_key() {
        let transport = LocalTransport::new();
        let sink = Arc::new(RecordingSink::default());

        let first = transport.subscribe(descriptor("users", &sink));
        let second = transport.subscribe(descriptor("users", &sink));

        assert_eq!(first.id(), second.id());
        assert_eq!(transport.feed_count(), 1);
    }

    #[test]
    fn test_ready_is_visible_through_handles() {
        let transport = LocalTransport::new();
        let sink = Arc::new(RecordingSink::default());
        let handle = transport.subscribe(descriptor("polls", &sink));
        let events = transport.events();

        assert!(!handle.is_ready());
        transport.mark_ready(handle.key()).unwrap();
        assert!(handle.is_ready());

        let event = events.try_recv().unwrap();
        assert!(matches!(event, FeedEvent::Ready { id, .. } if id == handle.id()));
    }

    #[test]
    fn test_fail_reaches_latest_sink() {
        let transport = LocalTransport::new();
        let old_sink = Arc::new(RecordingSink::default());
        let new_sink = Arc::new(RecordingSink::default());

        transport.subscribe(descriptor("note", &old_sink));
        transport.subscribe(descriptor("note", &new_sink));
        transport
            .fail(&FeedKey::named("note"), FeedError::new("403"))
            .unwrap();

        assert!(old_sink.errors.lock().is_empty());
        assert_eq!(new_sink.errors.lock()[0].1.error, "403");
    }

    #[test]
    fn test_stop_removes_feed_and_resubscribe_starts_fresh() {
        let transport = LocalTransport::new();
        let sink = Arc::new(RecordingSink::default());
        let handle = transport.subscribe(descriptor("annotations", &sink));
        transport.mark_ready(handle.key()).unwrap();

        handle.stop();
        handle.stop();
        assert_eq!(transport.feed_count(), 0);

        let again = transport.subscribe(descriptor("annotations", &sink));
        assert_ne!(again.id(), handle.id());
        assert!(!again.is_ready());
    }

    #[test]
    fn test_unreferenced_feeds_are_collected() {
        let transport = LocalTransport::new();
        let sink = Arc::new(RecordingSink::default());
        transport.subscribe(descriptor("users", &sink));
        transport.subscribe(descriptor("polls", &sink));

        transport.begin_pass();
        transport.subscribe(descriptor("users", &sink));
        assert_eq!(transport.collect_unreferenced(), 1);

        assert!(transport.contains(&FeedKey::named("users")));
        assert!(!transport.contains(&FeedKey::named("polls")));
    }

    #[test]
    fn test_released_handles_observe_stop() {
        let transport = LocalTransport::new();
        let sink = Arc::new(RecordingSink::default());
        let users = transport.subscribe(descriptor("users", &sink));
        let polls = transport.subscribe(descriptor("polls", &sink));

        transport.begin_pass();
        transport.subscribe(descriptor("users", &sink));
        transport.end_pass();

        assert!(!users.is_stopped());
        assert!(polls.is_stopped());

        // Stopping an already released handle is a no-op.
        let events = transport.events();
        polls.stop();
        assert!(events.try_recv().is_err());
        assert_eq!(transport.feed_count(), 1);
    }

    #[test]
    fn test_undrained_listener_is_bounded() {
        let transport = LocalTransport::with_buffer_size(8);
        let sink = Arc::new(RecordingSink::default());
        let idle = transport.events();

        for round in 0..200 {
            let name = format!("feed-{}", round % 3);
            transport.begin_pass();
            let handle = transport.subscribe(descriptor(&name, &sink));
            transport.mark_ready(handle.key()).unwrap();
            transport.end_pass();
        }

        assert_eq!(idle.len(), 8);

        // A fresh listener still receives events.
        let fresh = transport.events();
        transport.mark_ready(&FeedKey::named("feed-1")).unwrap();
        assert!(matches!(fresh.try_recv(), Ok(FeedEvent::Ready { .. })));
    }

    #[test]
    fn test_dropped_listener_is_pruned() {
        let transport = LocalTransport::new();
        let sink = Arc::new(RecordingSink::default());
        let handle = transport.subscribe(descriptor("users", &sink));

        drop(transport.events());
        let kept = transport.events();
        transport.mark_ready(handle.key()).unwrap();

        assert_eq!(transport.inner.listeners.read().len(), 1);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_unknown_feed() {
        let transport = LocalTransport::new();
        let result = transport.mark_ready(&FeedKey::named("nope"));
        assert!(matches!(result, Err(CoordinatorError::FeedNotFound(_))));
    }
}
