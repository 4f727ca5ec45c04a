//! OpenAPI document for the REST surface

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::rest::health::health_check,
        crate::rest::conversations::access_conversation,
        crate::rest::conversations::list_conversations,
        crate::rest::conversations::send_message,
        crate::rest::conversations::list_messages,
        crate::rest::conversations::mark_read,
        crate::rest::messages::update_message,
        crate::rest::messages::delete_message,
        crate::websocket::connection::websocket_handler
    ),
    components(
        schemas(
            crate::error::ErrorResponse,
            crate::rest::health::HealthResponse,
            crate::rest::conversations::AccessConversationRequest,
            crate::rest::conversations::MarkReadResponse,
            crate::rest::messages::UpdateMessageRequest,
            crate::rest::messages::DeleteMessageResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Conversations", description = "Conversation access and messaging"),
        (name = "Messages", description = "Message mutation"),
        (name = "Push", description = "Realtime push channel"),
        (name = "Health", description = "Service liveness")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearerAuth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}
