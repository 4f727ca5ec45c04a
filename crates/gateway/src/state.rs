//! Shared application state for the gateway

use std::sync::Arc;

use campus_chat::{ChatService, MediaStore};
use campus_database::User;
use campus_identity::Authenticator;
use sqlx::SqlitePool;

use crate::error::ApiError;
use crate::websocket::RoomHub;

/// Shared state handed to every route handler.
///
/// The fan-out hub is constructed exactly once here and injected into the
/// chat service as its notifier; nothing else owns room state.
#[derive(Clone)]
pub struct GatewayState {
    pool: SqlitePool,
    authenticator: Authenticator,
    hub: Arc<RoomHub>,
    chat_service: Arc<ChatService>,
    media: Arc<dyn MediaStore>,
}

impl GatewayState {
    pub fn new(pool: SqlitePool, authenticator: Authenticator, media: Arc<dyn MediaStore>) -> Self {
        let hub = Arc::new(RoomHub::new());
        let chat_service = Arc::new(ChatService::new(pool.clone(), hub.clone()));

        Self {
            pool,
            authenticator,
            hub,
            chat_service,
            media,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    pub fn hub(&self) -> &Arc<RoomHub> {
        &self.hub
    }

    pub fn chat_service(&self) -> &ChatService {
        &self.chat_service
    }

    pub fn media(&self) -> &Arc<dyn MediaStore> {
        &self.media
    }

    /// Resolve the calling user from a bearer token
    pub async fn authenticate(&self, token: &str) -> Result<User, ApiError> {
        self.authenticator
            .authenticate_token(token)
            .await
            .map_err(ApiError::from)
    }
}
