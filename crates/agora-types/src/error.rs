use thiserror::Error;

/// Failure taxonomy shared by the store and service layers. The transport
/// layer maps these onto status codes; nothing here is process-fatal.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The entity does not exist, or the caller is not allowed to know
    /// whether it exists (direct-room membership is not discoverable).
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("authentication required")]
    Unauthorized,

    /// Authenticated but lacking room/group/admin capability.
    #[error("{0}")]
    Forbidden(&'static str),

    /// A payload field is missing or invalid, or a reply target lives in
    /// another room.
    #[error("invalid field: {field}")]
    Validation { field: &'static str },

    #[error("{0}")]
    InvalidArgument(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl ChatError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        ChatError::InvalidArgument(msg.into())
    }
}
