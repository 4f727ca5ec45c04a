//! Input validation helpers.

use crate::types::{ChatError, ChatResult};

const MAX_ID_LENGTH: usize = 64;
const MAX_CONTENT_LENGTH: usize = 100_000;

/// Validate that a supplied identity reference is well formed.
///
/// Public ids are cuid-style: non-empty, ascii alphanumeric, bounded length.
pub fn well_formed_id(id: &str) -> ChatResult<()> {
    if id.trim().is_empty() {
        return Err(ChatError::bad_request("identifier cannot be empty"));
    }

    if id.len() > MAX_ID_LENGTH || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ChatError::bad_request("invalid identifier format"));
    }

    Ok(())
}

/// Validate text message content
pub fn message_content(content: &str) -> ChatResult<()> {
    if content.trim().is_empty() {
        return Err(ChatError::bad_request("message content cannot be empty"));
    }

    if content.len() > MAX_CONTENT_LENGTH {
        return Err(ChatError::bad_request(
            "message content too long (max 100,000 characters)",
        ));
    }

    Ok(())
}
