//! Core types shared by the coordinator and its collaborators.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of the meeting the current session belongs to.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MeetingId(pub String);

impl fmt::Debug for MeetingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MeetingId({})", self.0)
    }
}

impl fmt::Display for MeetingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of an actor (a user) inside a meeting.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId(pub String);

impl fmt::Debug for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActorId({})", self.0)
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role attribute of an actor, e.g. `MODERATOR` or `VIEWER`.
///
/// Kept opaque: the coordinator only forwards it as a feed parameter.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(pub String);

impl Role {
    pub fn new(role: impl Into<String>) -> Self {
        Role(role.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Credentials of the current session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub meeting_id: MeetingId,
    pub actor_id: ActorId,
}

impl Identity {
    pub fn new(meeting_id: impl Into<String>, actor_id: impl Into<String>) -> Self {
        Self {
            meeting_id: MeetingId(meeting_id.into()),
            actor_id: ActorId(actor_id.into()),
        }
    }
}

/// Replicated user record; only the fields the coordinator reads.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActorRecord {
    pub int_id: ActorId,
    pub meeting_id: MeetingId,
    /// Absent until the users feed has replicated the role.
    #[serde(default)]
    pub role: Option<Role>,
}

/// Replicated chat room metadata.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatRoom {
    pub chat_id: String,
    pub meeting_id: MeetingId,
    /// Access type tag, compared against the configured public type.
    pub access: String,
    #[serde(default)]
    pub users: Vec<ActorId>,
}

/// A whiteboard annotation record.
///
/// Only `id` is interpreted; every other field is carried through untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: String,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl Annotation {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: serde_json::Map::new(),
        }
    }

    /// Add a payload field.
    pub fn with_field(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }
}
