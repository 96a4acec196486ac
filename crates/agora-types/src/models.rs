use serde::{Deserialize, Serialize};

use crate::error::ChatError;

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

id_type!(UserId);
id_type!(
    /// A direct (1:1) chat room.
    RoomId
);
id_type!(
    /// A message inside a direct room.
    MessageId
);
id_type!(GroupId);
id_type!(GroupRoomId);
id_type!(GroupMessageId);

/// Public profile fields resolved through the profile-lookup collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub nickname: Option<String>,
    pub profile_image_url: Option<String>,
}

/// Typed payload of a direct message. A message is exactly one of these
/// kinds; the kind-specific fields are required, never nullable columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "message_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessagePayload {
    Text {
        message: String,
    },
    Image {
        file_url: String,
    },
    File {
        file_url: String,
        file_name: String,
        file_size: i64,
    },
}

impl MessagePayload {
    pub fn kind(&self) -> &'static str {
        match self {
            MessagePayload::Text { .. } => "TEXT",
            MessagePayload::Image { .. } => "IMAGE",
            MessagePayload::File { .. } => "FILE",
        }
    }

    /// Body text shown in room-list previews. Only TEXT messages have one.
    pub fn preview(&self) -> Option<&str> {
        match self {
            MessagePayload::Text { message } => Some(message),
            _ => None,
        }
    }

    /// Kind-specific field validation, run before any payload is persisted.
    /// The error names the first missing or invalid field.
    pub fn validate(&self) -> Result<(), ChatError> {
        match self {
            MessagePayload::Text { message } => {
                if message.trim().is_empty() {
                    return Err(ChatError::Validation { field: "message" });
                }
            }
            MessagePayload::Image { file_url } => {
                if file_url.trim().is_empty() {
                    return Err(ChatError::Validation { field: "file_url" });
                }
            }
            MessagePayload::File {
                file_url,
                file_name,
                file_size,
            } => {
                if file_url.trim().is_empty() {
                    return Err(ChatError::Validation { field: "file_url" });
                }
                if file_name.trim().is_empty() {
                    return Err(ChatError::Validation { field: "file_name" });
                }
                if *file_size <= 0 {
                    return Err(ChatError::Validation { field: "file_size" });
                }
            }
        }
        Ok(())
    }
}
