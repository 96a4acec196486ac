use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{GroupMessageId, GroupRoomId, MessageId, MessagePayload, RoomId, UserId};

// -- Direct chat --

/// One entry in the caller's room list: who the conversation is with, a
/// preview of the latest message, and how much of it is still unread.
#[derive(Debug, Clone, Serialize)]
pub struct RoomSummary {
    pub id: RoomId,
    pub other_user_id: UserId,
    pub other_username: String,
    pub other_nickname: Option<String>,
    pub other_profile_image_url: Option<String>,
    pub last_message: Option<String>,
    pub last_message_time: Option<DateTime<Utc>>,
    pub unread_count: u32,
    pub updated_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DirectMessageView {
    pub id: MessageId,
    pub room_id: RoomId,
    pub sender_id: UserId,
    pub username: String,
    pub nickname: Option<String>,
    pub profile_image_url: Option<String>,
    #[serde(flatten)]
    pub payload: MessagePayload,
    pub seq: i64,
    pub created_time: DateTime<Utc>,
    /// Read from the *caller's* perspective: own messages are always read,
    /// others are read iff their seq is at or below the caller's pointer.
    pub is_read: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessagePage {
    pub messages: Vec<DirectMessageView>,
    pub total_elements: u64,
    pub total_pages: u64,
}

// -- Group chat --

/// Summary of the message a group message replies to.
#[derive(Debug, Clone, Serialize)]
pub struct ReplySummary {
    pub id: GroupMessageId,
    pub message: String,
    pub username: String,
    pub nickname: Option<String>,
    pub display_name: Option<String>,
    pub profile_image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupMessageView {
    pub id: GroupMessageId,
    pub room_id: GroupRoomId,
    pub sender_id: UserId,
    pub message: String,
    pub username: String,
    pub nickname: Option<String>,
    /// Per-group alias, distinct from the global nickname. Omitted when the
    /// membership lookup fails or no alias is set.
    pub display_name: Option<String>,
    pub profile_image_url: Option<String>,
    pub is_admin: bool,
    pub created_time: DateTime<Utc>,
    pub read_count: u32,
    pub reply_to_message_id: Option<GroupMessageId>,
    pub reply_to_message: Option<ReplySummary>,
}
