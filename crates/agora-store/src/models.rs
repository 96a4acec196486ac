//! Row types mapping directly to SQLite rows. Distinct from the agora-types
//! API models so the store layer stays independent of rendering concerns.

use agora_types::models::MessagePayload;
use agora_types::{GroupId, GroupMessageId, GroupRoomId, MessageId, RoomId, UserId};
use chrono::{DateTime, Utc};

#[derive(Debug)]
pub struct RoomRow {
    pub id: RoomId,
    /// Smaller participant id; canonical order is enforced on every write.
    pub user1_id: UserId,
    /// Larger participant id.
    pub user2_id: UserId,
    pub created_time: DateTime<Utc>,
    pub updated_time: DateTime<Utc>,
}

impl RoomRow {
    pub fn contains(&self, user: UserId) -> bool {
        self.user1_id == user || self.user2_id == user
    }

    /// The stored participant that is not `user`, or `None` when `user`
    /// is not a participant of this room.
    pub fn other_participant(&self, user: UserId) -> Option<UserId> {
        if user == self.user1_id {
            Some(self.user2_id)
        } else if user == self.user2_id {
            Some(self.user1_id)
        } else {
            None
        }
    }
}

#[derive(Debug)]
pub struct MessageRow {
    pub id: MessageId,
    pub room_id: RoomId,
    pub sender_id: UserId,
    /// Per-room ordering key assigned at append time. The sole ordering and
    /// read-comparison key; creation timestamps may collide.
    pub seq: i64,
    pub payload: MessagePayload,
    pub created_time: DateTime<Utc>,
}

pub struct ReadStatusRow {
    pub room_id: RoomId,
    pub user_id: UserId,
    pub last_read_seq: Option<i64>,
    pub last_read_time: DateTime<Utc>,
}

pub struct GroupRoomRow {
    pub id: GroupRoomId,
    pub group_id: GroupId,
    pub name: String,
    pub admin_only: bool,
}

#[derive(Debug)]
pub struct GroupMessageRow {
    pub id: GroupMessageId,
    pub room_id: GroupRoomId,
    pub sender_id: UserId,
    pub body: String,
    pub reply_to: Option<GroupMessageId>,
    pub read_count: u32,
    pub created_time: DateTime<Utc>,
}
