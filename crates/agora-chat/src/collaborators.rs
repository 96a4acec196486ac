//! Seams to the rest of the platform. The chat core consumes these; it never
//! implements them. Tests stub them, the real backend wires them to its user,
//! group and notification subsystems.

use agora_types::api::{DirectMessageView, GroupMessageView};
use agora_types::models::UserProfile;
use agora_types::{ChatError, GroupId, GroupRoomId, RoomId, UserId};

/// Resolves the authenticated caller of the current request. Used by the
/// transport layer to produce the explicit caller id every service operation
/// takes; fails with [`ChatError::Unauthorized`] when no identity is present.
pub trait IdentityProvider: Send + Sync {
    fn current_user(&self) -> Result<UserId, ChatError>;
}

/// Resolves a user id to public profile fields for rendering.
pub trait ProfileLookup: Send + Sync {
    fn profile(&self, user: UserId) -> Result<UserProfile, ChatError>;
}

/// Answers membership and capability questions for a group.
pub trait GroupMembershipService: Send + Sync {
    fn is_member(&self, group: GroupId, user: UserId) -> Result<bool, ChatError>;

    fn is_admin(&self, group: GroupId, user: UserId) -> Result<bool, ChatError>;

    /// The group owner.
    fn owner(&self, group: GroupId) -> Result<UserId, ChatError>;

    /// Members holding admin capability, not necessarily including the owner.
    fn admin_ids(&self, group: GroupId) -> Result<Vec<UserId>, ChatError>;

    /// Per-group alias, distinct from the user's global nickname.
    fn display_name(&self, group: GroupId, user: UserId) -> Result<Option<String>, ChatError>;
}

/// Told about every successful send. Dispatch (push, WebSocket fan-out) is
/// the implementor's concern; the chat core never waits on it.
pub trait NotificationSink: Send + Sync {
    fn direct_message_sent(&self, room: RoomId, message: &DirectMessageView);

    fn group_message_sent(&self, room: GroupRoomId, message: &GroupMessageView);
}

/// Sink that drops every notification.
pub struct NoNotifications;

impl NotificationSink for NoNotifications {
    fn direct_message_sent(&self, _room: RoomId, _message: &DirectMessageView) {}

    fn group_message_sent(&self, _room: GroupRoomId, _message: &GroupMessageView) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Anonymous;

    impl IdentityProvider for Anonymous {
        fn current_user(&self) -> Result<UserId, ChatError> {
            Err(ChatError::Unauthorized)
        }
    }

    #[test]
    fn missing_identity_is_unauthorized() {
        let provider: &dyn IdentityProvider = &Anonymous;
        assert!(matches!(
            provider.current_user().unwrap_err(),
            ChatError::Unauthorized
        ));
    }
}
