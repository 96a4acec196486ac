//! Group messaging orchestration: role-gated rooms, reply threading, and
//! read-receipt aggregation.

use std::sync::Arc;

use agora_store::models::GroupMessageRow;
use agora_store::Database;
use agora_types::api::{GroupMessageView, ReplySummary};
use agora_types::{ChatError, GroupId, GroupMessageId, GroupRoomId, UserId};
use chrono::Utc;
use tracing::warn;

use crate::collaborators::{GroupMembershipService, NotificationSink, ProfileLookup};

pub struct GroupChatService {
    db: Arc<Database>,
    profiles: Arc<dyn ProfileLookup>,
    membership: Arc<dyn GroupMembershipService>,
    notifications: Arc<dyn NotificationSink>,
}

impl GroupChatService {
    pub fn new(
        db: Arc<Database>,
        profiles: Arc<dyn ProfileLookup>,
        membership: Arc<dyn GroupMembershipService>,
        notifications: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            db,
            profiles,
            membership,
            notifications,
        }
    }

    /// Persist one group message and render it with reply and admin
    /// annotations. Members only; admin rooms additionally require admin
    /// capability; a reply target must live in the same room.
    pub fn send(
        &self,
        caller: UserId,
        group: GroupId,
        room_id: GroupRoomId,
        body: &str,
        reply_to: Option<GroupMessageId>,
    ) -> Result<GroupMessageView, ChatError> {
        let room = self
            .db
            .group_room(room_id)?
            .filter(|r| r.group_id == group)
            .ok_or(ChatError::NotFound("chat room"))?;

        if !self.membership.is_member(group, caller)? {
            return Err(ChatError::Forbidden(
                "only group members can send messages",
            ));
        }
        if room.admin_only && !self.membership.is_admin(group, caller)? {
            return Err(ChatError::Forbidden(
                "only group admins can post in an admin room",
            ));
        }

        let saved = self
            .db
            .insert_group_message(room.id, caller, body, reply_to, Utc::now())?;

        let view = self.render(&saved, group)?;
        self.notifications.group_message_sent(room.id, &view);
        Ok(view)
    }

    /// Idempotent read receipt: at most one marker per (message, user), and
    /// the counter moves only when the marker is new.
    pub fn mark_read(&self, caller: UserId, message: GroupMessageId) -> Result<(), ChatError> {
        self.db
            .mark_group_message_read(message, caller, Utc::now())?;
        Ok(())
    }

    pub fn read_count(&self, message: GroupMessageId) -> Result<u32, ChatError> {
        self.db.group_read_count(message)
    }

    fn render(
        &self,
        message: &GroupMessageRow,
        group: GroupId,
    ) -> Result<GroupMessageView, ChatError> {
        let sender = self.profiles.profile(message.sender_id)?;
        let is_admin = self.admin_set(group).contains(&message.sender_id);
        let display_name = self.display_name_or_none(group, message.sender_id);
        let reply_to_message = message.reply_to.and_then(|id| self.reply_summary(id, group));

        Ok(GroupMessageView {
            id: message.id,
            room_id: message.room_id,
            sender_id: sender.id,
            message: message.body.clone(),
            username: sender.username,
            nickname: sender.nickname,
            display_name,
            profile_image_url: sender.profile_image_url,
            is_admin,
            created_time: message.created_time,
            read_count: message.read_count,
            reply_to_message_id: message.reply_to,
            reply_to_message,
        })
    }

    /// The owner is always admin; further admins come from the membership
    /// records. A failed membership lookup degrades to the owner-only set
    /// instead of failing the render.
    fn admin_set(&self, group: GroupId) -> Vec<UserId> {
        let mut admins = match self.membership.owner(group) {
            Ok(owner) => vec![owner],
            Err(err) => {
                warn!(%group, error = %err, "Owner lookup failed");
                Vec::new()
            }
        };
        match self.membership.admin_ids(group) {
            Ok(ids) => {
                for id in ids {
                    if !admins.contains(&id) {
                        admins.push(id);
                    }
                }
            }
            Err(err) => {
                warn!(%group, error = %err, "Admin list lookup failed; using owner-only admin set");
            }
        }
        admins
    }

    fn display_name_or_none(&self, group: GroupId, user: UserId) -> Option<String> {
        match self.membership.display_name(group, user) {
            Ok(name) => name,
            Err(err) => {
                warn!(%group, %user, error = %err, "Display-name lookup failed");
                None
            }
        }
    }

    /// Replied-to message summary. Auxiliary by contract: any failure here
    /// degrades to omitting the summary rather than failing the send.
    fn reply_summary(&self, id: GroupMessageId, group: GroupId) -> Option<ReplySummary> {
        let row = match self.db.group_message(id) {
            Ok(Some(row)) => row,
            Ok(None) => return None,
            Err(err) => {
                warn!(message = %id, error = %err, "Reply lookup failed");
                return None;
            }
        };
        let profile = match self.profiles.profile(row.sender_id) {
            Ok(profile) => profile,
            Err(err) => {
                warn!(message = %id, error = %err, "Reply sender lookup failed");
                return None;
            }
        };
        Some(ReplySummary {
            id: row.id,
            message: row.body,
            username: profile.username,
            nickname: profile.nickname,
            display_name: self.display_name_or_none(group, row.sender_id),
            profile_image_url: profile.profile_image_url,
        })
    }
}
