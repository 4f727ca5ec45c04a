//! Message routes: update and delete

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use campus_database::{MessageKind, MessagePatch, MessageWithSender};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::state::GatewayState;
use crate::util::require_bearer;

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateMessageRequest {
    /// Replacement text content
    pub content: Option<String>,
    /// Replacement media URL
    pub media: Option<String>,
    /// Replacement payload kind
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteMessageResponse {
    pub message: String,
}

/// Update a message's content variant; sender or admin only
#[utoipa::path(
    put,
    path = "/api/messages/{message_id}",
    tag = "Messages",
    security(("bearerAuth" = [])),
    params(("message_id" = String, Path, description = "Message public id")),
    request_body = UpdateMessageRequest,
    responses(
        (status = 200, description = "Updated message"),
        (status = 400, description = "Patch would leave the message empty", body = crate::error::ErrorResponse),
        (status = 403, description = "Caller may not modify this message", body = crate::error::ErrorResponse),
        (status = 404, description = "Message not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_message(
    State(state): State<GatewayState>,
    Path(message_id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<UpdateMessageRequest>,
) -> Result<Json<MessageWithSender>, ApiError> {
    let token = require_bearer(&headers)?;
    let user = state.authenticate(&token).await?;

    let patch = MessagePatch {
        content: payload.content,
        media_url: payload.media,
        kind: payload.kind.as_deref().map(MessageKind::from),
    };

    let message = state
        .chat_service()
        .update_message(&user, &message_id, patch)
        .await?;
    Ok(Json(message))
}

/// Delete a message; sender or admin only
#[utoipa::path(
    delete,
    path = "/api/messages/{message_id}",
    tag = "Messages",
    security(("bearerAuth" = [])),
    params(("message_id" = String, Path, description = "Message public id")),
    responses(
        (status = 200, description = "Message deleted", body = DeleteMessageResponse),
        (status = 403, description = "Caller may not modify this message", body = crate::error::ErrorResponse),
        (status = 404, description = "Message not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_message(
    State(state): State<GatewayState>,
    Path(message_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<DeleteMessageResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let user = state.authenticate(&token).await?;

    state
        .chat_service()
        .delete_message(&user, &message_id)
        .await?;

    Ok(Json(DeleteMessageResponse {
        message: "Message deleted successfully".to_string(),
    }))
}
