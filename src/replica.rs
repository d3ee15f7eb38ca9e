//! Point-in-time reads against locally replicated collections.

use crate::types::{ActorId, ActorRecord, Annotation, ChatRoom, MeetingId};
use parking_lot::RwLock;

/// Chat rooms visible to an actor: public rooms of the meeting other than
/// the well-known public room, plus every room of the meeting the actor
/// is a member of.
#[derive(Clone, Debug)]
pub struct ChatRoomQuery {
    pub meeting_id: MeetingId,
    pub public_access: String,
    pub excluded_chat_id: String,
    pub member: ActorId,
}

impl ChatRoomQuery {
    pub fn matches(&self, room: &ChatRoom) -> bool {
        if room.meeting_id != self.meeting_id {
            return false;
        }

        let other_public =
            room.access == self.public_access && room.chat_id != self.excluded_chat_id;
        other_public || room.users.contains(&self.member)
    }
}

/// Synchronous queries over replicated data.
pub trait Replica: Send + Sync {
    /// The actor record for `actor_id`, if replicated.
    fn find_actor(&self, actor_id: &ActorId) -> Option<ActorRecord>;

    /// Rooms matching `query`, in collection order.
    fn find_chat_rooms(&self, query: &ChatRoomQuery) -> Vec<ChatRoom>;

    /// Non-reactive snapshot of the remote annotations, without the one
    /// whose id equals `excluded`.
    fn annotations_except(&self, excluded: Option<&str>) -> Vec<Annotation>;
}

/// Replica held in memory. Writers are whatever feeds the embedder wires up.
#[derive(Debug, Default)]
pub struct MemoryReplica {
    actors: RwLock<Vec<ActorRecord>>,
    chat_rooms: RwLock<Vec<ChatRoom>>,
    annotations: RwLock<Vec<Annotation>>,
}

impl MemoryReplica {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an actor record.
    pub fn upsert_actor(&self, record: ActorRecord) {
        let mut actors = self.actors.write();
        match actors.iter_mut().find(|a| a.int_id == record.int_id) {
            Some(existing) => *existing = record,
            None => actors.push(record),
        }
    }

    /// Insert or replace a chat room.
    pub fn upsert_chat_room(&self, room: ChatRoom) {
        let mut rooms = self.chat_rooms.write();
        match rooms.iter_mut().find(|r| r.chat_id == room.chat_id) {
            Some(existing) => *existing = room,
            None => rooms.push(room),
        }
    }

    /// Insert or replace a remote annotation.
    pub fn upsert_annotation(&self, annotation: Annotation) {
        let mut annotations = self.annotations.write();
        match annotations.iter_mut().find(|a| a.id == annotation.id) {
            Some(existing) => *existing = annotation,
            None => annotations.push(annotation),
        }
    }

    pub fn remove_annotation(&self, id: &str) -> bool {
        let mut annotations = self.annotations.write();
        let before = annotations.len();
        annotations.retain(|a| a.id != id);
        annotations.len() != before
    }
}

impl Replica for MemoryReplica {
    fn find_actor(&self, actor_id: &ActorId) -> Option<ActorRecord> {
        self.actors
            .read()
            .iter()
            .find(|a| &a.int_id == actor_id)
            .cloned()
    }

    fn find_chat_rooms(&self, query: &ChatRoomQuery) -> Vec<ChatRoom> {
        self.chat_rooms
            .read()
            .iter()
            .filter(|room| query.matches(room))
            .cloned()
            .collect()
    }

    fn annotations_except(&self, excluded: Option<&str>) -> Vec<Annotation> {
        self.annotations
            .read()
            .iter()
            .filter(|a| Some(a.id.as_str()) != excluded)
            .cloned()
            .collect()
    }
}
