//! Conversation routes: access, listing, sending, reading, read receipts

use axum::{
    extract::{Multipart, Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use campus_chat::OutboundMessage;
use campus_database::{ConversationWithDetails, MessageKind, MessageWithSender};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::state::GatewayState;
use crate::util::require_bearer;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccessConversationRequest {
    /// Public id of the other participant
    pub other_user_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadResponse {
    pub modified_count: u64,
}

/// Access or create the one-on-one conversation with another user
#[utoipa::path(
    post,
    path = "/api/conversations",
    tag = "Conversations",
    security(("bearerAuth" = [])),
    request_body = AccessConversationRequest,
    responses(
        (status = 200, description = "Existing conversation returned"),
        (status = 201, description = "Conversation created"),
        (status = 400, description = "Missing or invalid user id", body = crate::error::ErrorResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn access_conversation(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Json(payload): Json<AccessConversationRequest>,
) -> Result<(StatusCode, Json<ConversationWithDetails>), ApiError> {
    let token = require_bearer(&headers)?;
    let user = state.authenticate(&token).await?;

    let access = state
        .chat_service()
        .access_conversation(&user, payload.other_user_id.as_deref())
        .await?;

    let status = if access.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((status, Json(access.conversation)))
}

/// List the caller's conversations, most recently updated first
#[utoipa::path(
    get,
    path = "/api/conversations",
    tag = "Conversations",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Conversations with participants and latest message"),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_conversations(
    State(state): State<GatewayState>,
    headers: HeaderMap,
) -> Result<Json<Vec<ConversationWithDetails>>, ApiError> {
    let token = require_bearer(&headers)?;
    let user = state.authenticate(&token).await?;

    let conversations = state.chat_service().list_conversations(&user).await?;
    Ok(Json(conversations))
}

/// Send a message, optionally with a media attachment.
///
/// Multipart fields: `conversationId`, `content`, `type`, and an optional
/// `media` file. An explicit `type` wins over the kind derived from the
/// attachment's MIME type.
#[utoipa::path(
    post,
    path = "/api/conversations/message",
    tag = "Conversations",
    security(("bearerAuth" = [])),
    responses(
        (status = 201, description = "Message stored and fanned out"),
        (status = 400, description = "Missing conversation id or content", body = crate::error::ErrorResponse),
        (status = 403, description = "Sender is not a participant", body = crate::error::ErrorResponse),
        (status = 404, description = "Conversation not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn send_message(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<MessageWithSender>), ApiError> {
    let token = require_bearer(&headers)?;
    let user = state.authenticate(&token).await?;

    let mut conversation_id = None;
    let mut content = None;
    let mut explicit_kind = None;
    let mut media_kind = None;
    let mut media_url = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("invalid multipart payload: {e}")))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("conversationId") => {
                conversation_id = Some(read_text(field).await?);
            }
            Some("content") => {
                content = Some(read_text(field).await?);
            }
            Some("type") => {
                let value = read_text(field).await?;
                explicit_kind = Some(MessageKind::from(value.as_str()));
            }
            Some("media") => {
                let mime = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("failed to read attachment: {e}")))?;

                media_kind = Some(MessageKind::from_mime(&mime));
                media_url = Some(state.media().store(data, &mime).await?);
            }
            _ => {}
        }
    }

    let message = state
        .chat_service()
        .send(
            &user,
            OutboundMessage {
                conversation_id,
                kind: explicit_kind.or(media_kind),
                content,
                media_url,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(message)))
}

/// List all messages of a conversation in creation order
#[utoipa::path(
    get,
    path = "/api/conversations/{conversation_id}",
    tag = "Conversations",
    security(("bearerAuth" = [])),
    params(("conversation_id" = String, Path, description = "Conversation public id")),
    responses(
        (status = 200, description = "Messages with sender display attributes"),
        (status = 403, description = "Caller is not a participant", body = crate::error::ErrorResponse),
        (status = 404, description = "Conversation not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_messages(
    State(state): State<GatewayState>,
    Path(conversation_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Vec<MessageWithSender>>, ApiError> {
    let token = require_bearer(&headers)?;
    let user = state.authenticate(&token).await?;

    let messages = state
        .chat_service()
        .list_messages(&user, &conversation_id)
        .await?;
    Ok(Json(messages))
}

/// Mark every unread message of a conversation as read
#[utoipa::path(
    put,
    path = "/api/conversations/{conversation_id}/mark-read",
    tag = "Conversations",
    security(("bearerAuth" = [])),
    params(("conversation_id" = String, Path, description = "Conversation public id")),
    responses(
        (status = 200, description = "Count of messages transitioned", body = MarkReadResponse),
        (status = 403, description = "Caller is not a participant", body = crate::error::ErrorResponse),
        (status = 404, description = "Conversation not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn mark_read(
    State(state): State<GatewayState>,
    Path(conversation_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<MarkReadResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let user = state.authenticate(&token).await?;

    let modified_count = state
        .chat_service()
        .mark_read(&user, &conversation_id)
        .await?;
    Ok(Json(MarkReadResponse { modified_count }))
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::bad_request(format!("invalid multipart field: {e}")))
}
