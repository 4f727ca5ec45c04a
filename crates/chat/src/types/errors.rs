//! Error taxonomy for chat operations.
//!
//! Validation failures are detected before any mutation; storage failures
//! surface as-is so the caller decides whether to retry.

use campus_database::StoreError;
use thiserror::Error;

/// Result type alias for chat operations
pub type ChatResult<T> = Result<T, ChatError>;

/// Main error type for the chat subsystem
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("storage failure: {0}")]
    Store(String),
}

impl ChatError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }
}

impl From<StoreError> for ChatError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UserNotFound => ChatError::NotFound("user not found".to_string()),
            StoreError::ConversationNotFound => {
                ChatError::NotFound("conversation not found".to_string())
            }
            StoreError::MessageNotFound => ChatError::NotFound("message not found".to_string()),
            StoreError::InvalidContent => ChatError::BadRequest(
                "message carries neither text content nor a media reference".to_string(),
            ),
            StoreError::Duplicate(message) => ChatError::Conflict(message),
            StoreError::DatabaseError(message) => ChatError::Store(message),
        }
    }
}
