//! Coordinator configuration.
//!
//! Loaded once per process from the host's public settings document and
//! never re-read; changes to it do not trigger re-evaluation.

use crate::error::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Feed names started unconditionally (subject to the conditional filter).
pub const DEFAULT_CATALOG: &[&str] = &[
    "users",
    "meetings",
    "polls",
    "presentations",
    "slides",
    "slide-positions",
    "captions",
    "voiceUsers",
    "whiteboard-multi-user",
    "screenshare",
    "group-chat",
    "presentation-pods",
    "users-settings",
    "guestUser",
    "users-infos",
    "note",
    "meeting-time-remaining",
    "network-information",
    "local-settings",
    "users-typing",
    "record-meetings",
    "video-streams",
    "connection-status",
    "voice-call-states",
];

/// Feeds re-requested with the actor's role once it is known.
pub const DEFAULT_ROLE_FEEDS: &[&str] = &["meetings", "users", "breakouts"];

/// Top-level configuration.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    pub chat: ChatConfig,
    pub feeds: FeedConfig,
    pub settings: SettingsKeys,
}

impl CoordinatorConfig {
    /// Parse configuration from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }
}

/// Chat section of the public settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Default for chat availability; a per-actor setting may override it.
    pub enabled: bool,

    /// Id of the well-known public room, which is excluded from the
    /// public-room branch of the chat query.
    #[serde(alias = "publicGroupId")]
    pub public_group_id: String,

    /// Access tag marking a room as public.
    #[serde(alias = "typePublic")]
    pub type_public: String,

    #[serde(alias = "typingIndicator")]
    pub typing_indicator: TypingIndicatorConfig,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            public_group_id: "MAIN-PUBLIC-GROUP-CHAT".to_string(),
            type_public: "PUBLIC_ACCESS".to_string(),
            typing_indicator: TypingIndicatorConfig::default(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct TypingIndicatorConfig {
    pub enabled: bool,
}

impl Default for TypingIndicatorConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Names of the feeds the coordinator starts.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Ordered catalog of parameterless feeds.
    pub catalog: Vec<String>,

    /// Feeds started with the actor's role as parameter.
    pub role_feeds: Vec<String>,

    /// Feed carrying messages for the visible chat rooms.
    pub chat_messages: String,

    /// Feed used once to seed the local annotation mirror.
    pub migration: String,

    /// Substring marking a feed as belonging to the typing indicator.
    pub typing_marker: String,

    /// Substring marking a feed as belonging to chat.
    pub chat_marker: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            catalog: DEFAULT_CATALOG.iter().map(|s| s.to_string()).collect(),
            role_feeds: DEFAULT_ROLE_FEEDS.iter().map(|s| s.to_string()).collect(),
            chat_messages: "group-chat-msg".to_string(),
            migration: "annotations".to_string(),
            typing_marker: "typing".to_string(),
            chat_marker: "chat".to_string(),
        }
    }
}

/// Keys looked up in the per-actor settings store.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SettingsKeys {
    pub enable_chat_key: String,
}

impl Default for SettingsKeys {
    fn default() -> Self {
        Self {
            enable_chat_key: "bbb_enable_chat".to_string(),
        }
    }
}
