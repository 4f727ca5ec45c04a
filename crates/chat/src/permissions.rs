//! Message modification capability check.

use campus_database::{MessageWithSender, User};

use crate::types::{ChatError, ChatResult};

/// A caller may modify a message when they sent it or hold the admin role.
pub fn can_modify(caller: &User, message: &MessageWithSender) -> bool {
    caller.id == message.sender_id || caller.role.is_privileged()
}

/// Enforce [`can_modify`], mapping failure to `Forbidden`
pub fn ensure_can_modify(caller: &User, message: &MessageWithSender) -> ChatResult<()> {
    if can_modify(caller, message) {
        Ok(())
    } else {
        Err(ChatError::forbidden(
            "only the sender or an admin may modify this message",
        ))
    }
}
