//! Notification seam between the chat service and the realtime transport.
//!
//! The service persists first and notifies second; the notifier must never
//! block on durable storage. Delivery is best-effort — a notification with no
//! live recipients is not an error.

use campus_database::{MessageWithSender, UserSummary};
use serde::{Deserialize, Serialize};

/// A freshly stored message together with the participant set of its
/// conversation, ready for fan-out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageBroadcast {
    pub message: MessageWithSender,
    pub participants: Vec<UserSummary>,
}

/// Sink for store-derived realtime events
pub trait ChatNotifier: Send + Sync {
    /// A message was appended and the latest-message pointer updated
    fn message_created(&self, broadcast: &MessageBroadcast);

    /// Unread messages of a conversation transitioned to read
    fn messages_seen(&self, conversation_public_id: &str);
}

/// Notifier that drops every event; for tools and tests that do not carry a
/// realtime transport
#[derive(Debug, Default)]
pub struct NullNotifier;

impl ChatNotifier for NullNotifier {
    fn message_created(&self, _broadcast: &MessageBroadcast) {}

    fn messages_seen(&self, _conversation_public_id: &str) {}
}
