//! Conversation entity definitions

use serde::{Deserialize, Serialize};

use super::message::MessageWithSender;
use super::user::UserSummary;

/// Conversation row as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    #[serde(skip_serializing, default)]
    pub id: i64,
    pub public_id: String,
    pub name: Option<String>,
    pub is_group: bool,
    #[serde(skip_serializing, default)]
    pub admin_id: Option<i64>,
    #[serde(skip_serializing, default)]
    pub latest_message_id: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

/// Conversation with participants and latest message resolved for display
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationWithDetails {
    pub public_id: String,
    pub name: Option<String>,
    pub is_group: bool,
    pub participants: Vec<UserSummary>,
    pub latest_message: Option<MessageWithSender>,
    pub created_at: String,
    pub updated_at: String,
}

/// Canonical uniqueness key for a direct conversation between two users.
///
/// The pair is unordered: `direct_key(a, b) == direct_key(b, a)`.
pub fn direct_key(user_a: i64, user_b: i64) -> String {
    let (low, high) = if user_a <= user_b {
        (user_a, user_b)
    } else {
        (user_b, user_a)
    };
    format!("{}:{}", low, high)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_key_is_order_independent() {
        assert_eq!(direct_key(1, 2), "1:2");
        assert_eq!(direct_key(2, 1), "1:2");
        assert_eq!(direct_key(7, 7), "7:7");
    }
}
