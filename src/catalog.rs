//! The fixed catalog of parameterless feeds.

use crate::config::CoordinatorConfig;
use crate::feeds::{ErrorSink, FeedDescriptor, FeedHandle, FeedKey, FeedTransport};
use crate::filter::include_with_chat;
use std::sync::Arc;

/// Ordered list of feed names, started on every pass.
#[derive(Clone, Debug)]
pub struct FeedCatalog {
    names: Vec<String>,
}

impl FeedCatalog {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn from_config(config: &CoordinatorConfig) -> Self {
        Self::new(config.feeds.catalog.clone())
    }

    /// Start every included feed and collect the handles, in catalog order.
    ///
    /// `chat` is the chat setting resolved once for the pass.
    pub fn start(
        &self,
        transport: &dyn FeedTransport,
        config: &CoordinatorConfig,
        chat: bool,
        sink: &Arc<dyn ErrorSink>,
    ) -> Vec<FeedHandle> {
        self.names
            .iter()
            .filter_map(|name| {
                if !include_with_chat(name, config, chat) {
                    tracing::trace!(feed = %name, "feed excluded by configuration");
                    return None;
                }
                let descriptor = FeedDescriptor::new(FeedKey::named(name.as_str()), Arc::clone(sink));
                Some(transport.subscribe(descriptor))
            })
            .collect()
    }
}
