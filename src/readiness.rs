//! Aggregate readiness and the shared error escalation sink.

use crate::coordinator::Invalidation;
use crate::error::FeedError;
use crate::feeds::{ErrorSink, FeedHandle, FeedKey};
use crate::session::SessionFlags;
use crossbeam_channel::Sender;
use std::sync::Arc;

/// Log code attached to every escalated feed failure.
pub const SUBSCRIPTION_ERROR_LOG_CODE: &str = "startup_client_subscription_error";

/// True iff every handle reports ready. An empty set is ready.
pub fn all_ready(handles: &[FeedHandle]) -> bool {
    handles.iter().all(FeedHandle::is_ready)
}

/// Fold handles into one readiness signal. A recorded error forces the
/// result to true so the host stops waiting and shows the error.
pub fn aggregate(handles: &[FeedHandle], session: &SessionFlags) -> bool {
    session.has_error() || all_ready(handles)
}

/// Error sink shared by every feed of the coordinator.
pub struct ErrorEscalation {
    session: Arc<SessionFlags>,
    notify: Option<Sender<Invalidation>>,
}

impl ErrorEscalation {
    pub fn new(session: Arc<SessionFlags>) -> Self {
        Self {
            session,
            notify: None,
        }
    }

    /// Also send `Invalidation::Error` after each escalation.
    pub fn with_notifier(mut self, notify: Sender<Invalidation>) -> Self {
        self.notify = Some(notify);
        self
    }
}

impl ErrorSink for ErrorEscalation {
    fn on_error(&self, feed: &FeedKey, error: &FeedError) {
        tracing::error!(
            log_code = SUBSCRIPTION_ERROR_LOG_CODE,
            feed = %feed.name,
            params = ?feed.params,
            error = ?error,
            "Error while subscribing to collections"
        );
        self.session.set_error(error.error.clone());

        if let Some(notify) = &self.notify {
            // Nobody listening means the loop has already stopped.
            let _ = notify.send(Invalidation::Error(error.error.clone()));
        }
    }
}
