//! Feeds: named, independently-progressing data subscriptions.
//!
//! A [`FeedTransport`] starts feeds from [`FeedDescriptor`]s and hands back
//! [`FeedHandle`]s exposing readiness and stop. Transports deduplicate by
//! [`FeedKey`], so requesting the same feed on every evaluation pass is
//! cheap and keeps it alive.
//!
//! # Example
//!
//! ```ignore
//! let transport = LocalTransport::new();
//! let handle = transport.subscribe(FeedDescriptor::new(FeedKey::named("users"), sink));
//!
//! transport.mark_ready(handle.key())?;
//! assert!(handle.is_ready());
//! ```

mod transport;
mod types;

pub use transport::LocalTransport;
pub use types::{
    ErrorSink, FeedControl, FeedDescriptor, FeedEvent, FeedHandle, FeedId, FeedKey, FeedParams,
    FeedState, FeedTransport, StopReason,
};
