//! Error types for the storage layer

use thiserror::Error;

/// Errors surfaced by the conversation directory and message store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("user not found")]
    UserNotFound,

    #[error("conversation not found")]
    ConversationNotFound,

    #[error("message not found")]
    MessageNotFound,

    #[error("message carries neither text content nor a media reference")]
    InvalidContent,

    #[error("duplicate record: {0}")]
    Duplicate(String),

    #[error("database error: {0}")]
    DatabaseError(String),
}
