//! Realtime fan-out hub.
//!
//! The hub owns all room membership state: a map from room identifier (a user
//! public id for direct delivery, or a conversation public id for room-wide
//! broadcast) to the set of live connections joined to it. No other component
//! reads or writes this state; the hub is constructed once at process start
//! and injected wherever broadcasting is needed.
//!
//! Operations are synchronous and never touch durable storage. Events are
//! enqueued into per-connection channels under the lock in arrival order, so
//! delivery order within a room matches processing order.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use campus_chat::{ChatNotifier, MessageBroadcast};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use super::events::ServerEvent;

/// Handle for a live push connection
pub type ConnectionId = u64;

struct Connection {
    sender: UnboundedSender<ServerEvent>,
    identity: Option<String>,
    rooms: HashSet<String>,
}

#[derive(Default)]
struct HubState {
    rooms: HashMap<String, HashSet<ConnectionId>>,
    connections: HashMap<ConnectionId, Connection>,
}

/// Room-based broadcast hub for the push channel
#[derive(Default)]
pub struct RoomHub {
    state: RwLock<HubState>,
    next_id: AtomicU64,
}

impl RoomHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a live connection; the returned handle addresses it until
    /// [`RoomHub::disconnect`].
    pub fn register(&self, sender: UnboundedSender<ServerEvent>) -> ConnectionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;

        let mut state = self.state.write().expect("hub lock poisoned");
        state.connections.insert(
            id,
            Connection {
                sender,
                identity: None,
                rooms: HashSet::new(),
            },
        );

        debug!(connection = id, "push connection registered");
        id
    }

    /// Present a user identity for a connection.
    ///
    /// Joins the identity-room, enabling direct delivery, and acknowledges
    /// with `connected`. A missing or empty identity, or one that does not
    /// match the authenticated user, is rejected and logged; the connection
    /// stays un-identified.
    pub fn identify(&self, connection: ConnectionId, user_id: &str, authenticated_id: &str) {
        if user_id.trim().is_empty() {
            warn!(connection, "identify with empty user identity rejected");
            return;
        }

        if user_id != authenticated_id {
            warn!(
                connection,
                claimed = user_id,
                "identify with foreign user identity rejected"
            );
            return;
        }

        self.join_room(connection, user_id);

        let mut state = self.state.write().expect("hub lock poisoned");
        if let Some(conn) = state.connections.get_mut(&connection) {
            conn.identity = Some(user_id.to_string());
            let _ = conn.sender.send(ServerEvent::Connected);
        }

        debug!(connection, user = user_id, "push connection identified");
    }

    /// Join a room; repeat joins are no-ops
    pub fn join_room(&self, connection: ConnectionId, room_id: &str) {
        if room_id.trim().is_empty() {
            return;
        }

        let mut state = self.state.write().expect("hub lock poisoned");
        if !state.connections.contains_key(&connection) {
            return;
        }

        state
            .rooms
            .entry(room_id.to_string())
            .or_default()
            .insert(connection);
        if let Some(conn) = state.connections.get_mut(&connection) {
            conn.rooms.insert(room_id.to_string());
        }
    }

    /// Leave a room; leaving a room the connection never joined is a no-op
    pub fn leave_room(&self, connection: ConnectionId, room_id: &str) {
        let mut state = self.state.write().expect("hub lock poisoned");

        let emptied = match state.rooms.get_mut(room_id) {
            Some(members) => {
                members.remove(&connection);
                members.is_empty()
            }
            None => false,
        };
        if emptied {
            state.rooms.remove(room_id);
        }

        if let Some(conn) = state.connections.get_mut(&connection) {
            conn.rooms.remove(room_id);
        }
    }

    /// Release every room membership of a closed connection
    pub fn disconnect(&self, connection: ConnectionId) {
        let mut state = self.state.write().expect("hub lock poisoned");

        if let Some(conn) = state.connections.remove(&connection) {
            for room in conn.rooms {
                let emptied = match state.rooms.get_mut(&room) {
                    Some(members) => {
                        members.remove(&connection);
                        members.is_empty()
                    }
                    None => false,
                };
                if emptied {
                    state.rooms.remove(&room);
                }
            }
            debug!(
                connection,
                identity = conn.identity.as_deref().unwrap_or("-"),
                "push connection disconnected"
            );
        }
    }

    /// Notify the other members of a room that someone is (or stopped) typing
    pub fn broadcast_typing(&self, room_id: &str, from: ConnectionId, is_typing: bool) {
        let event = if is_typing {
            ServerEvent::Typing {
                room_id: room_id.to_string(),
            }
        } else {
            ServerEvent::StopTyping {
                room_id: room_id.to_string(),
            }
        };

        self.send_to_room(room_id, &event, Some(from));
    }

    /// Deliver a stored message to every participant's identity-room except
    /// the sender's, then echo it to the sender for multi-device sync.
    ///
    /// A payload without participants indicates an unpopulated reference and
    /// is dropped with a log line; delivery is best-effort either way.
    pub fn notify_new_message(&self, broadcast: &MessageBroadcast) {
        if broadcast.participants.is_empty() {
            warn!(
                message = %broadcast.message.public_id,
                "new-message fan-out dropped: participants not resolved"
            );
            return;
        }

        let sender_id = &broadcast.message.sender.public_id;
        let event = ServerEvent::NewMessage {
            message: broadcast.message.clone(),
        };

        for participant in &broadcast.participants {
            if &participant.public_id == sender_id {
                continue;
            }
            self.send_to_room(&participant.public_id, &event, None);
        }

        // Echo to the sender's own identity-room; other devices of the same
        // account stay in sync. Not an unread-count trigger.
        self.send_to_room(sender_id, &event, None);
    }

    /// Broadcast a read receipt to every member of the conversation room
    pub fn notify_messages_seen(&self, conversation_id: &str) {
        let event = ServerEvent::MessageSeen {
            conversation_id: conversation_id.to_string(),
        };
        self.send_to_room(conversation_id, &event, None);
    }

    fn send_to_room(&self, room_id: &str, event: &ServerEvent, exclude: Option<ConnectionId>) {
        let state = self.state.read().expect("hub lock poisoned");

        let Some(members) = state.rooms.get(room_id) else {
            return;
        };

        for member in members {
            if exclude == Some(*member) {
                continue;
            }
            if let Some(conn) = state.connections.get(member) {
                // A closed receiver just means the connection is tearing
                // down; its disconnect will clean the membership up.
                let _ = conn.sender.send(event.clone());
            }
        }
    }

    #[cfg(test)]
    fn room_size(&self, room_id: &str) -> usize {
        self.state
            .read()
            .expect("hub lock poisoned")
            .rooms
            .get(room_id)
            .map(|members| members.len())
            .unwrap_or(0)
    }
}

impl ChatNotifier for RoomHub {
    fn message_created(&self, broadcast: &MessageBroadcast) {
        self.notify_new_message(broadcast);
    }

    fn messages_seen(&self, conversation_public_id: &str) {
        self.notify_messages_seen(conversation_public_id);
    }
}
