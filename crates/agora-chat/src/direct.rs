//! Direct (1:1) messaging orchestration.

use std::sync::Arc;

use agora_store::models::{MessageRow, RoomRow};
use agora_store::Database;
use agora_types::api::{DirectMessageView, MessagePage, RoomSummary};
use agora_types::models::MessagePayload;
use agora_types::{ChatError, RoomId, UserId};
use chrono::Utc;
use tracing::warn;

use crate::collaborators::{NotificationSink, ProfileLookup};

pub struct ChatService {
    db: Arc<Database>,
    profiles: Arc<dyn ProfileLookup>,
    notifications: Arc<dyn NotificationSink>,
}

impl ChatService {
    pub fn new(
        db: Arc<Database>,
        profiles: Arc<dyn ProfileLookup>,
        notifications: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            db,
            profiles,
            notifications,
        }
    }

    /// Open (or lazily create) the caller's room with `other` and render its
    /// summary. Self-chat is rejected; `other` must resolve to a profile.
    pub fn open_room(&self, caller: UserId, other: UserId) -> Result<RoomSummary, ChatError> {
        if caller == other {
            return Err(ChatError::invalid_argument(
                "cannot open a chat room with yourself",
            ));
        }
        // resolve before creating, so a typo'd user id never mints a room
        self.profiles.profile(other)?;

        let room = self.db.get_or_create_room(caller, other, Utc::now())?;
        self.room_summary(&room, caller)
    }

    /// The caller's room list, most recently active first. A room whose
    /// summary cannot be rendered is skipped, never the whole listing.
    pub fn my_rooms(&self, caller: UserId) -> Result<Vec<RoomSummary>, ChatError> {
        let rooms = self.db.rooms_for(caller)?;
        let mut summaries = Vec::with_capacity(rooms.len());
        for room in rooms {
            match self.room_summary(&room, caller) {
                Ok(summary) => summaries.push(summary),
                Err(err) => {
                    warn!(room = %room.id, error = %err, "Skipping unrenderable room");
                }
            }
        }
        Ok(summaries)
    }

    /// One page of messages, newest first. Fetching advances the caller's
    /// read pointer to the newest sequence on the page, and every returned
    /// message carries a read flag from the caller's perspective.
    pub fn messages(
        &self,
        caller: UserId,
        room_id: RoomId,
        page: u32,
        size: u32,
    ) -> Result<MessagePage, ChatError> {
        let room = self.require_participant(caller, room_id)?;

        let paged = self.db.message_page(room.id, page, size)?;
        if let Some(newest) = paged.rows.iter().map(|m| m.seq).max() {
            self.db.advance_read(room.id, caller, newest, Utc::now())?;
        }

        let pointer = self.db.last_read_seq(room.id, caller)?;
        let messages = paged
            .rows
            .iter()
            .map(|m| self.render_message(m, caller, pointer))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(MessagePage {
            messages,
            total_elements: paged.total_elements,
            total_pages: paged.total_pages,
        })
    }

    /// Validate, persist and render one message. The sender's own pointer
    /// advances to the new message; the recipient's never moves here.
    pub fn send(
        &self,
        caller: UserId,
        room_id: RoomId,
        payload: MessagePayload,
    ) -> Result<DirectMessageView, ChatError> {
        let room = self.require_participant(caller, room_id)?;

        let now = Utc::now();
        let saved = self.db.append_message(room.id, caller, &payload, now)?;
        self.db.advance_read(room.id, caller, saved.seq, now)?;
        self.db.touch_room(room.id, now)?;

        let view = self.render_message(&saved, caller, Some(saved.seq))?;
        self.notifications.direct_message_sent(room.id, &view);
        Ok(view)
    }

    /// Room lookup plus participant check. Non-participants get the same
    /// `NotFound` as a missing room, so membership is not discoverable.
    fn require_participant(&self, caller: UserId, room_id: RoomId) -> Result<RoomRow, ChatError> {
        let room = self
            .db
            .room(room_id)?
            .ok_or(ChatError::NotFound("chat room"))?;
        if !room.contains(caller) {
            return Err(ChatError::NotFound("chat room"));
        }
        Ok(room)
    }

    fn room_summary(&self, room: &RoomRow, caller: UserId) -> Result<RoomSummary, ChatError> {
        let other_id = room
            .other_participant(caller)
            .ok_or(ChatError::NotFound("chat room"))?;
        let other = self.profiles.profile(other_id)?;

        let latest = self.db.latest_message(room.id)?;
        let pointer = self.db.last_read_seq(room.id, caller)?;
        let unread_count = self.db.count_unread(room.id, caller, pointer)?;

        Ok(RoomSummary {
            id: room.id,
            other_user_id: other.id,
            other_username: other.username,
            other_nickname: other.nickname,
            other_profile_image_url: other.profile_image_url,
            last_message: latest
                .as_ref()
                .and_then(|m| m.payload.preview().map(str::to_owned)),
            last_message_time: latest.as_ref().map(|m| m.created_time),
            unread_count,
            updated_time: room.updated_time,
        })
    }

    fn render_message(
        &self,
        message: &MessageRow,
        caller: UserId,
        pointer: Option<i64>,
    ) -> Result<DirectMessageView, ChatError> {
        let sender = self.profiles.profile(message.sender_id)?;
        let is_read = message.sender_id == caller || pointer.is_some_and(|p| message.seq <= p);

        Ok(DirectMessageView {
            id: message.id,
            room_id: message.room_id,
            sender_id: sender.id,
            username: sender.username,
            nickname: sender.nickname,
            profile_image_url: sender.profile_image_url,
            payload: message.payload.clone(),
            seq: message.seq,
            created_time: message.created_time,
            is_read,
        })
    }
}
