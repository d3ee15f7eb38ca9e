//! Conditional inclusion of feeds driven by configuration and settings.

use crate::config::CoordinatorConfig;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Point-in-time read of persisted per-actor preferences.
pub trait SettingsLookup: Send + Sync {
    /// Boolean setting, or `default` when unset.
    fn get_bool(&self, key: &str, default: bool) -> bool;
}

/// Settings kept in memory.
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: RwLock<HashMap<String, bool>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: impl Into<String>, value: bool) {
        self.values.write().insert(key.into(), value);
    }
}

impl SettingsLookup for MemorySettings {
    fn get_bool(&self, key: &str, default: bool) -> bool {
        self.values.read().get(key).copied().unwrap_or(default)
    }
}

/// Whether chat is enabled for the current actor.
pub fn chat_enabled(config: &CoordinatorConfig, settings: &dyn SettingsLookup) -> bool {
    settings.get_bool(&config.settings.enable_chat_key, config.chat.enabled)
}

/// Decide whether the feed `name` should be started.
///
/// A name is excluded when it carries the typing marker while the typing
/// indicator is off, or the chat marker while chat is off. Names matching
/// neither are always included.
pub fn include(name: &str, config: &CoordinatorConfig, settings: &dyn SettingsLookup) -> bool {
    include_with_chat(name, config, chat_enabled(config, settings))
}

/// [`include`] with the chat setting already resolved.
pub fn include_with_chat(name: &str, config: &CoordinatorConfig, chat: bool) -> bool {
    let typing_off =
        !config.chat.typing_indicator.enabled && name.contains(&config.feeds.typing_marker);
    if typing_off {
        return false;
    }

    !(name.contains(&config.feeds.chat_marker) && !chat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn config(typing: bool, chat: bool) -> CoordinatorConfig {
        let mut config = CoordinatorConfig::default();
        config.chat.typing_indicator.enabled = typing;
        config.chat.enabled = chat;
        config
    }

    #[test]
    fn test_typing_disabled() {
        let settings = MemorySettings::new();
        let config = config(false, true);

        assert!(!include("users-typing", &config, &settings));
        assert!(include("users", &config, &settings));
    }

    #[test]
    fn test_chat_disabled_by_setting_override() {
        let settings = MemorySettings::new();
        settings.set("bbb_enable_chat", false);
        let config = config(true, true);

        assert!(!include("group-chat", &config, &settings));
        assert!(include("polls", &config, &settings));
        assert!(!chat_enabled(&config, &settings));
    }

    #[test]
    fn test_setting_can_enable_chat() {
        let settings = MemorySettings::new();
        settings.set("bbb_enable_chat", true);
        let config = config(true, false);

        assert!(include("group-chat", &config, &settings));
    }

    #[test]
    fn test_name_matching_both_markers() {
        let settings = MemorySettings::new();

        assert!(!include("chat-typing", &config(false, true), &settings));
        assert!(!include("chat-typing", &config(true, false), &settings));
        assert!(include("chat-typing", &config(true, true), &settings));
    }

    #[test]
    fn test_resolved_chat_ignores_settings() {
        let config = config(true, true);

        assert!(!include_with_chat("group-chat", &config, false));
        assert!(include_with_chat("group-chat-msg", &config, true));
        assert!(include_with_chat("polls", &config, false));
    }

    proptest! {
        #[test]
        fn include_is_pure_function_of_inputs(
            name in "[a-z-]{0,16}",
            typing in any::<bool>(),
            chat_default in any::<bool>(),
            chat_override in proptest::option::of(any::<bool>()),
        ) {
            let settings = MemorySettings::new();
            if let Some(value) = chat_override {
                settings.set("bbb_enable_chat", value);
            }
            let config = config(typing, chat_default);
            let chat = chat_override.unwrap_or(chat_default);

            let expected = !((!typing && name.contains("typing")) || (!chat && name.contains("chat")));
            prop_assert_eq!(include(&name, &config, &settings), expected);
            prop_assert_eq!(include(&name, &config, &settings), include(&name, &config, &settings));
        }
    }
}
