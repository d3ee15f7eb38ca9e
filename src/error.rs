//! Error types for the feed coordinator.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Main error type for coordinator operations.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Duplicate record: {0}")]
    DuplicateRecord(String),

    #[error("Feed not found: {0}")]
    FeedNotFound(String),

    #[error("Event channel disconnected")]
    Disconnected,
}

impl From<serde_json::Error> for CoordinatorError {
    fn from(e: serde_json::Error) -> Self {
        CoordinatorError::Config(e.to_string())
    }
}

/// Result type for coordinator operations.
pub type Result<T> = std::result::Result<T, CoordinatorError>;

/// Failure payload reported by the transport for a single feed.
///
/// `error` carries the code that gets escalated into the session's error slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedError {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl FeedError {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            error: code.into(),
            reason: None,
            details: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            Some(reason) => write!(f, "[{}] {}", self.error, reason),
            None => write!(f, "[{}]", self.error),
        }
    }
}
