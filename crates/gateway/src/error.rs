//! HTTP error mapping for the gateway layer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use campus_chat::{ChatError, MediaError};
use campus_identity::AuthError;
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

/// Structured error body returned by every failing route
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<ChatError> for ApiError {
    fn from(value: ChatError) -> Self {
        let status = match &value {
            ChatError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ChatError::NotFound(_) => StatusCode::NOT_FOUND,
            ChatError::Forbidden(_) => StatusCode::FORBIDDEN,
            ChatError::Conflict(_) => StatusCode::CONFLICT,
            ChatError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = ?value, "chat storage failure");
        }

        Self::new(status, value.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(value: AuthError) -> Self {
        let status = match value {
            AuthError::SessionNotFound
            | AuthError::SessionExpired
            | AuthError::InvalidSession
            | AuthError::UserNotFound => StatusCode::UNAUTHORIZED,
            AuthError::Database(_) | AuthError::Store(_) => {
                error!(error = ?value, "auth storage failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, value.to_string())
    }
}

impl From<MediaError> for ApiError {
    fn from(value: MediaError) -> Self {
        error!(error = ?value, "media store failure");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, value.to_string())
    }
}
