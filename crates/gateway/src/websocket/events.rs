//! Push-channel wire protocol.
//!
//! Events are JSON objects tagged by a `type` field. Client events only ever
//! touch room membership or trigger broadcasts; the durable stores are
//! mutated exclusively through the REST surface.

use campus_chat::MessageBroadcast;
use campus_database::MessageWithSender;
use serde::{Deserialize, Serialize};

/// Events received from a push client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    /// Present a user identity; joins the identity-room for direct delivery
    Identify { user_id: String },
    /// Join an arbitrary room, usually a conversation id
    JoinRoom { room_id: String },
    /// Leave a previously joined room
    LeaveRoom { room_id: String },
    /// Started typing in a room
    Typing { room_id: String },
    /// Stopped typing in a room
    StopTyping { room_id: String },
    /// Relay a stored message to the other participants (multi-device sync)
    NewMessage { message: MessageBroadcast },
    /// Relay a read receipt for a conversation
    MessageSeen { conversation_id: String },
}

/// Events delivered to push clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// Acknowledges a successful identify
    Connected,
    /// Another member of the room is typing
    Typing { room_id: String },
    /// Another member of the room stopped typing
    StopTyping { room_id: String },
    /// A message was appended to a conversation the user participates in
    NewMessage { message: MessageWithSender },
    /// Messages of a conversation were marked read
    MessageSeen { conversation_id: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_events_deserialize_from_tagged_json() {
        let event: ClientEvent =
            serde_json::from_str(r#"{"type":"identify","userId":"user1"}"#).unwrap();
        assert!(matches!(event, ClientEvent::Identify { user_id } if user_id == "user1"));

        let event: ClientEvent =
            serde_json::from_str(r#"{"type":"joinRoom","roomId":"conv1"}"#).unwrap();
        assert!(matches!(event, ClientEvent::JoinRoom { room_id } if room_id == "conv1"));

        let event: ClientEvent =
            serde_json::from_str(r#"{"type":"messageSeen","conversationId":"conv1"}"#).unwrap();
        assert!(
            matches!(event, ClientEvent::MessageSeen { conversation_id } if conversation_id == "conv1")
        );
    }

    #[test]
    fn server_events_serialize_with_type_tag() {
        let json = serde_json::to_string(&ServerEvent::Connected).unwrap();
        assert_eq!(json, r#"{"type":"connected"}"#);

        let json = serde_json::to_string(&ServerEvent::Typing {
            room_id: "conv1".to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"typing","roomId":"conv1"}"#);
    }
}
