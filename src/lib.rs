//! # Feed Coordinator
//!
//! Starts the set of data feeds a client session needs and reduces their
//! readiness to a single signal.
//!
//! ## Core Concepts
//!
//! - **Feeds**: Named subscriptions that become ready independently
//! - **Conditional filter**: Configuration and settings decide which feeds exist
//! - **Dependent feeds**: Role and chat-room feeds built from replicated data
//! - **Migration**: A feed used once to seed a local mirror, then stopped
//! - **Escalation**: Any feed failure sets one session-wide error code and
//!   releases the readiness wait
//!
//! ## Example
//!
//! ```ignore
//! use feed_coordinator::{Collaborators, Coordinator, CoordinatorConfig, LocalTransport};
//!
//! let transport = LocalTransport::new();
//! let coordinator = Coordinator::new(CoordinatorConfig::load("settings.json")?, parts);
//!
//! let outcome = coordinator.evaluate();
//! if outcome.ready() {
//!     // render
//! }
//!
//! // Or re-evaluate on every change until the input channel closes
//! coordinator.run(&inputs, &transport.events(), |outcome| host.update(outcome.status()))?;
//! ```

pub mod catalog;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod feeds;
pub mod filter;
pub mod migration;
pub mod mirror;
pub mod readiness;
pub mod replica;
pub mod session;
pub mod types;

// Re-exports
pub use catalog::FeedCatalog;
pub use config::{ChatConfig, CoordinatorConfig, FeedConfig, SettingsKeys, TypingIndicatorConfig};
pub use coordinator::{Collaborators, Coordinator, Invalidation, PassOutcome, SubscriptionStatus};
pub use error::{CoordinatorError, FeedError, Result};
pub use feeds::{
    ErrorSink, FeedControl, FeedDescriptor, FeedEvent, FeedHandle, FeedId, FeedKey, FeedParams,
    FeedState, FeedTransport, LocalTransport, StopReason,
};
pub use filter::{chat_enabled, include, include_with_chat, MemorySettings, SettingsLookup};
pub use migration::{
    migrate, ActiveShapeSource, ActiveTextShape, MigrationFeed, MigrationState, MigrationSummary,
};
pub use mirror::{LocalMirror, MemoryMirror};
pub use readiness::{aggregate, all_ready, ErrorEscalation, SUBSCRIPTION_ERROR_LOG_CODE};
pub use replica::{ChatRoomQuery, MemoryReplica, Replica};
pub use session::{IdentityProvider, SessionFlags, SessionIdentity};
pub use types::*;
