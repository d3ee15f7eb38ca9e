//! The coordinator: builds the active feed set and folds it into one
//! readiness signal.
//!
//! Every evaluation pass is a full rebuild. Feeds are requested again on
//! each pass; the transport reuses live feeds with equal keys and may
//! release the ones no longer requested. Passes are serialized, so the
//! migration step never interleaves with another pass.

use crate::catalog::FeedCatalog;
use crate::config::CoordinatorConfig;
use crate::error::{CoordinatorError, Result};
use crate::feeds::{ErrorSink, FeedDescriptor, FeedEvent, FeedHandle, FeedKey, FeedTransport};
use crate::filter::{chat_enabled, SettingsLookup};
use crate::migration::{ActiveShapeSource, MigrationFeed, MigrationState};
use crate::mirror::LocalMirror;
use crate::readiness::{aggregate, ErrorEscalation};
use crate::replica::{ChatRoomQuery, Replica};
use crate::session::{IdentityProvider, SessionFlags};
use crate::types::{ActorId, Identity, Role};
use crossbeam_channel::{select, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;

/// Why the coordinator should run another pass.
#[derive(Clone, Debug)]
pub enum Invalidation {
    /// Session credentials changed.
    Identity,
    /// A per-actor setting changed.
    Settings,
    /// The current actor's record was replicated or updated.
    ActorRecord,
    /// A feed failure was escalated with this code.
    Error(String),
    /// A transport lifecycle event.
    Feed(FeedEvent),
}

/// Result of one evaluation pass.
#[derive(Clone, Debug)]
pub enum PassOutcome {
    /// At least one active feed is still loading.
    Pending { handles: Vec<FeedHandle> },
    /// Every active feed is ready.
    Ready { handles: Vec<FeedHandle> },
    /// A feed failure was escalated; the host should stop waiting.
    Failed { code: String },
}

impl PassOutcome {
    /// The aggregate readiness signal. True for `Failed` as well.
    pub fn ready(&self) -> bool {
        !matches!(self, PassOutcome::Pending { .. })
    }

    pub fn handles(&self) -> &[FeedHandle] {
        match self {
            PassOutcome::Pending { handles } | PassOutcome::Ready { handles } => handles.as_slice(),
            PassOutcome::Failed { .. } => &[],
        }
    }

    pub fn error_code(&self) -> Option<&str> {
        match self {
            PassOutcome::Failed { code } => Some(code.as_str()),
            _ => None,
        }
    }

    /// View in the shape the host consumes.
    pub fn status(&self) -> SubscriptionStatus {
        SubscriptionStatus {
            ready: self.ready(),
            active_handles: self.handles().to_vec(),
        }
    }
}

/// Host-facing output of a pass.
#[derive(Clone, Debug)]
pub struct SubscriptionStatus {
    pub ready: bool,
    pub active_handles: Vec<FeedHandle>,
}

/// External collaborators the coordinator reads from and writes to.
#[derive(Clone)]
pub struct Collaborators {
    pub transport: Arc<dyn FeedTransport>,
    pub replica: Arc<dyn Replica>,
    pub settings: Arc<dyn SettingsLookup>,
    pub identity: Arc<dyn IdentityProvider>,
    pub shapes: Arc<dyn ActiveShapeSource>,
    pub mirror: Arc<dyn LocalMirror>,
    pub session: Arc<SessionFlags>,
}

/// Orchestrates the feeds of one session.
pub struct Coordinator {
    config: CoordinatorConfig,
    catalog: FeedCatalog,
    parts: Collaborators,
    sink: Arc<dyn ErrorSink>,
    /// Also serializes passes.
    migration: Mutex<MigrationFeed>,
}

impl Coordinator {
    pub fn new(config: CoordinatorConfig, parts: Collaborators) -> Self {
        let catalog = FeedCatalog::from_config(&config);
        let sink: Arc<dyn ErrorSink> = Arc::new(ErrorEscalation::new(Arc::clone(&parts.session)));
        let migration = Mutex::new(MigrationFeed::new(config.feeds.migration.clone()));

        Self {
            config,
            catalog,
            parts,
            sink,
            migration,
        }
    }

    /// Send `Invalidation::Error` to `notify` whenever a feed failure is
    /// escalated.
    pub fn with_error_notifier(mut self, notify: Sender<Invalidation>) -> Self {
        let escalation = ErrorEscalation::new(Arc::clone(&self.parts.session)).with_notifier(notify);
        self.sink = Arc::new(escalation);
        self
    }

    pub fn session(&self) -> &Arc<SessionFlags> {
        &self.parts.session
    }

    /// The sink handed to every feed.
    pub fn error_sink(&self) -> Arc<dyn ErrorSink> {
        Arc::clone(&self.sink)
    }

    pub fn migration_state(&self) -> MigrationState {
        self.migration.lock().state()
    }

    /// Run one evaluation pass.
    pub fn evaluate(&self) -> PassOutcome {
        let mut migration = self.migration.lock();
        let transport = self.parts.transport.as_ref();

        transport.begin_pass();
        if let Some(code) = self.parts.session.error_code() {
            // Nothing is requested, so the transport can release every feed.
            transport.end_pass();
            return self.failed(code);
        }

        let identity = self.parts.identity.identity();
        tracing::debug!(
            meeting = %identity.meeting_id,
            actor = %identity.actor_id,
            "evaluating feeds"
        );

        // Resolved once per pass.
        let chat = chat_enabled(&self.config, self.parts.settings.as_ref());
        let mut handles = self.catalog.start(transport, &self.config, chat, &self.sink);

        let role = self.resolve_role(&identity.actor_id);
        handles.extend(self.start_role_feeds(role.as_ref()));

        if chat {
            handles.push(self.start_chat_feed(&identity));
        }

        if let Some(handle) = migration.request(transport, &self.sink) {
            handles.push(handle);
        }
        let migrated = migration.poll(
            self.parts.shapes.as_ref(),
            self.parts.replica.as_ref(),
            self.parts.mirror.as_ref(),
        );
        if migrated.is_some() {
            handles.retain(|h| !h.is_stopped());
        }

        transport.end_pass();

        // A failure may have been escalated while feeds were starting.
        if let Some(code) = self.parts.session.error_code() {
            return self.failed(code);
        }

        if aggregate(&handles, &self.parts.session) {
            self.latch_ready();
            tracing::debug!(feeds = handles.len(), "all feeds ready");
            PassOutcome::Ready { handles }
        } else {
            PassOutcome::Pending { handles }
        }
    }

    /// Evaluate once, then again on every invalidation until `inputs`
    /// disconnects. Every outcome is handed to `on_pass`.
    pub fn run<F>(
        &self,
        inputs: &Receiver<Invalidation>,
        feed_events: &Receiver<FeedEvent>,
        mut on_pass: F,
    ) -> Result<()>
    where
        F: FnMut(&PassOutcome),
    {
        on_pass(&self.evaluate());

        loop {
            let rerun = select! {
                recv(inputs) -> msg => match msg {
                    Ok(Invalidation::Feed(event)) => Self::triggers_pass(&event),
                    Ok(reason) => {
                        tracing::debug!(?reason, "inputs changed");
                        true
                    }
                    Err(_) => return Ok(()),
                },
                recv(feed_events) -> msg => match msg {
                    Ok(event) => Self::triggers_pass(&event),
                    Err(_) => return Err(CoordinatorError::Disconnected),
                },
            };

            if rerun {
                on_pass(&self.evaluate());
            }
        }
    }

    /// Our own stops and releases must not cause further passes.
    fn triggers_pass(event: &FeedEvent) -> bool {
        !matches!(event, FeedEvent::Stopped { .. })
    }

    fn failed(&self, code: String) -> PassOutcome {
        self.latch_ready();
        PassOutcome::Failed { code }
    }

    fn latch_ready(&self) {
        if self.parts.session.mark_subscriptions_ready() {
            tracing::info!("subscriptions ready");
        }
    }

    fn resolve_role(&self, actor_id: &ActorId) -> Option<Role> {
        self.parts.replica.find_actor(actor_id)?.role
    }

    /// Role-dependent feeds; none until the role is known.
    fn start_role_feeds(&self, role: Option<&Role>) -> Vec<FeedHandle> {
        let Some(role) = role else {
            tracing::trace!("actor role not replicated yet");
            return Vec::new();
        };

        self.config
            .feeds
            .role_feeds
            .iter()
            .map(|name| {
                let key = FeedKey::with_role(name.as_str(), role.clone());
                self.parts
                    .transport
                    .subscribe(FeedDescriptor::new(key, Arc::clone(&self.sink)))
            })
            .collect()
    }

    fn start_chat_feed(&self, identity: &Identity) -> FeedHandle {
        let query = ChatRoomQuery {
            meeting_id: identity.meeting_id.clone(),
            public_access: self.config.chat.type_public.clone(),
            excluded_chat_id: self.config.chat.public_group_id.clone(),
            member: identity.actor_id.clone(),
        };
        let chat_ids = self
            .parts
            .replica
            .find_chat_rooms(&query)
            .into_iter()
            .map(|room| room.chat_id)
            .collect();

        let key = FeedKey::with_chat_ids(self.config.feeds.chat_messages.as_str(), chat_ids);
        self.parts
            .transport
            .subscribe(FeedDescriptor::new(key, Arc::clone(&self.sink)))
    }
}
