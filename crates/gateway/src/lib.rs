//! # Campus Gateway Crate
//!
//! Transport layer of the chat backend: the REST routes, the push-channel
//! WebSocket endpoint, and the fan-out hub that owns room membership state.

use axum::{
    http::Method,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod docs;
pub mod error;
pub mod rest;
pub mod state;
pub mod util;
pub mod websocket;

pub use error::{ApiError, ErrorResponse};
pub use state::GatewayState;
pub use websocket::{ClientEvent, RoomHub, ServerEvent};

/// Assemble the full application router
pub fn build_router(state: GatewayState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(rest::health::health_check))
        .route(
            "/api/conversations",
            post(rest::conversations::access_conversation)
                .get(rest::conversations::list_conversations),
        )
        .route(
            "/api/conversations/message",
            post(rest::conversations::send_message),
        )
        .route(
            "/api/conversations/:conversation_id",
            get(rest::conversations::list_messages),
        )
        .route(
            "/api/conversations/:conversation_id/mark-read",
            put(rest::conversations::mark_read),
        )
        .route(
            "/api/messages/:message_id",
            put(rest::messages::update_message).delete(rest::messages::delete_message),
        )
        .route("/ws", get(websocket::connection::websocket_handler))
        .merge(SwaggerUi::new("/api/docs").url("/api/docs/openapi.json", docs::ApiDoc::openapi()))
        .with_state(state)
        .layer(cors)
}
