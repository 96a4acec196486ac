pub mod api;
pub mod error;
pub mod models;

pub use error::ChatError;
pub use models::{GroupId, GroupMessageId, GroupRoomId, MessageId, RoomId, UserId};
