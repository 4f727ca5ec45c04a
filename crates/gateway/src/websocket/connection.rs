//! Push-channel connection handling.
//!
//! A connection authenticates at upgrade time; failures refuse the upgrade
//! instead of emitting a structured error. After the upgrade the socket is
//! split: inbound frames become [`ClientEvent`]s handled synchronously
//! against the hub, outbound events drain from the connection's channel.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use campus_database::User;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::events::ClientEvent;
use super::hub::ConnectionId;
use crate::state::GatewayState;

#[derive(Debug, Deserialize)]
pub struct WebSocketQuery {
    token: Option<String>,
}

/// Upgrade handler for `GET /ws`
#[utoipa::path(
    get,
    path = "/ws",
    tag = "Push",
    params(("token" = Option<String>, Query, description = "Bearer session token")),
    responses(
        (status = 101, description = "Connection upgraded"),
        (status = 401, description = "Authentication failed; upgrade refused")
    )
)]
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<GatewayState>,
    Query(query): Query<WebSocketQuery>,
) -> Response {
    let Some(token) = query.token else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    match state.authenticator().authenticate_token(&token).await {
        Ok(user) => ws.on_upgrade(move |socket| handle_socket(socket, state, user)),
        Err(error) => {
            warn!(?error, "push connection upgrade refused");
            StatusCode::UNAUTHORIZED.into_response()
        }
    }
}

async fn handle_socket(socket: WebSocket, state: GatewayState, user: User) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let connection = state.hub().register(tx);

    debug!(connection, user = %user.public_id, "push connection established");

    let outbound = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(text) => {
                    if ws_tx.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(error) => warn!(?error, "failed to serialize push event"),
            }
        }
    });

    while let Some(Ok(message)) = ws_rx.next().await {
        match message {
            Message::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(event) => handle_client_event(event, connection, &state, &user),
                Err(error) => {
                    warn!(connection, ?error, "dropping malformed push event");
                }
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    state.hub().disconnect(connection);
    outbound.abort();

    debug!(connection, user = %user.public_id, "push connection closed");
}

fn handle_client_event(
    event: ClientEvent,
    connection: ConnectionId,
    state: &GatewayState,
    user: &User,
) {
    let hub = state.hub();

    match event {
        ClientEvent::Identify { user_id } => {
            hub.identify(connection, &user_id, &user.public_id);
        }
        ClientEvent::JoinRoom { room_id } => hub.join_room(connection, &room_id),
        ClientEvent::LeaveRoom { room_id } => hub.leave_room(connection, &room_id),
        ClientEvent::Typing { room_id } => hub.broadcast_typing(&room_id, connection, true),
        ClientEvent::StopTyping { room_id } => hub.broadcast_typing(&room_id, connection, false),
        ClientEvent::NewMessage { message } => hub.notify_new_message(&message),
        ClientEvent::MessageSeen { conversation_id } => {
            hub.notify_messages_seen(&conversation_id);
        }
    }
}
